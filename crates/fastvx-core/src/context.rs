//! Reference in-process engine.
//!
//! Every object lives in a per-kind generational registry. Images own their pixels
//! through an `Rc<RefCell<Plane>>`; a region-of-interest view clones that
//! `Rc` and records its window, so writes through the view land in the
//! parent and the storage outlives whichever of the two is released first.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
#[cfg(feature = "tracing")]
use tracing::{debug, instrument, warn};

use crate::detect::find_fast_corners_u8;
use crate::engine::VisionEngine;
use crate::error::{Error, Result, Status};
use crate::handle::{ArrayHandle, ImageHandle, Reference, Registry, ScalarHandle};
use crate::plane::Plane;
use crate::types::{
    Accessor, ArrayInfo, ImageFormat, ImageInfo, ItemType, KeyPoint, PixelValue, Rect,
    ScalarType, ScalarValue,
};
use crate::FastParams;

/// Session limits of the reference engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Maximum number of simultaneously live objects. Must be at least 1.
    pub max_references: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_references: 4096,
        }
    }
}

struct ImageObject {
    plane: Rc<RefCell<Plane>>,
    /// Absolute window into `plane`; the full plane for a parent image.
    window: Rect,
    format: ImageFormat,
    is_roi: bool,
}

struct ArrayObject {
    item_type: ItemType,
    capacity: usize,
    items: Vec<KeyPoint>,
}

#[derive(Default)]
struct Objects {
    images: Registry<ImageObject>,
    scalars: Registry<ScalarValue>,
    arrays: Registry<ArrayObject>,
}

impl Objects {
    fn live(&self) -> usize {
        self.images.len() + self.scalars.len() + self.arrays.len()
    }
}

/// One session of the reference engine.
pub struct Context {
    config: ContextConfig,
    objects: RefCell<Objects>,
}

impl Context {
    /// Open a session with default limits.
    pub fn new() -> Result<Self> {
        Self::create_context(&ContextConfig::default())
    }

    /// Number of objects created in this session and not yet released.
    pub fn live_references(&self) -> usize {
        self.objects.borrow().live()
    }

    /// Append items to a keypoint array without exceeding its capacity.
    pub fn add_array_items(&self, array: ArrayHandle, items: &[KeyPoint]) -> Result<()> {
        let mut objects = self.objects.borrow_mut();
        let arr = objects.arrays.get_mut(array.0)?;
        if arr.items.len() + items.len() > arr.capacity {
            return Err(Error::new(
                Status::InvalidParameters,
                format!(
                    "adding {} items to {array} holding {}/{}",
                    items.len(),
                    arr.items.len(),
                    arr.capacity
                ),
            ));
        }
        arr.items.extend_from_slice(items);
        Ok(())
    }

    pub fn query_scalar(&self, scalar: ScalarHandle) -> Result<ScalarType> {
        let objects = self.objects.borrow();
        Ok(objects.scalars.get(scalar.0)?.scalar_type())
    }

    fn ensure_room(&self, objects: &Objects) -> Result<()> {
        if objects.live() >= self.config.max_references {
            return Err(Error::new(
                Status::NoResources,
                format!(
                    "context already holds {} of {} references",
                    objects.live(),
                    self.config.max_references
                ),
            ));
        }
        Ok(())
    }
}

impl VisionEngine for Context {
    type Config = ContextConfig;

    fn create_context(config: &ContextConfig) -> Result<Self> {
        if config.max_references == 0 {
            return Err(Error::new(
                Status::InvalidParameters,
                "context must allow at least one reference",
            ));
        }
        #[cfg(feature = "tracing")]
        debug!(max_references = config.max_references, "context created");
        Ok(Self {
            config: config.clone(),
            objects: RefCell::new(Objects::default()),
        })
    }

    fn create_image(&self, width: u32, height: u32, format: ImageFormat) -> Result<ImageHandle> {
        let mut objects = self.objects.borrow_mut();
        self.ensure_room(&objects)?;
        let plane = match format {
            ImageFormat::U8 => Plane::new(width as usize, height as usize)?,
        };
        let slot = objects.images.insert(ImageObject {
            plane: Rc::new(RefCell::new(plane)),
            window: Rect::new(0, 0, width, height),
            format,
            is_roi: false,
        })?;
        let handle = ImageHandle(slot);
        #[cfg(feature = "tracing")]
        debug!(%handle, width, height, "image created");
        Ok(handle)
    }

    fn create_image_from_roi(&self, image: ImageHandle, rect: Rect) -> Result<ImageHandle> {
        let mut objects = self.objects.borrow_mut();
        self.ensure_room(&objects)?;
        let parent = objects.images.get(image.0)?;
        let (pw, ph) = (parent.window.width(), parent.window.height());
        if rect.is_empty() || !rect.fits_within(pw, ph) {
            return Err(Error::new(
                Status::InvalidParameters,
                format!(
                    "roi ({}, {})-({}, {}) does not fit {image} of {pw}x{ph}",
                    rect.start_x, rect.start_y, rect.end_x, rect.end_y
                ),
            ));
        }

        let window = Rect::new(
            parent.window.start_x + rect.start_x,
            parent.window.start_y + rect.start_y,
            parent.window.start_x + rect.end_x,
            parent.window.start_y + rect.end_y,
        );
        let view = ImageObject {
            plane: Rc::clone(&parent.plane),
            window,
            format: parent.format,
            is_roi: true,
        };
        let handle = ImageHandle(objects.images.insert(view)?);
        #[cfg(feature = "tracing")]
        debug!(%handle, parent = %image, ?window, "roi created");
        Ok(handle)
    }

    fn set_image_pixel_values(&self, image: ImageHandle, value: PixelValue) -> Result<()> {
        let objects = self.objects.borrow();
        let img = objects.images.get(image.0)?;
        let PixelValue::U8(v) = value;
        let mut plane = img.plane.borrow_mut();
        plane.as_view_mut().subview_mut(img.window)?.fill(v);
        Ok(())
    }

    fn create_scalar(&self, value: ScalarValue) -> Result<ScalarHandle> {
        let mut objects = self.objects.borrow_mut();
        self.ensure_room(&objects)?;
        Ok(ScalarHandle(objects.scalars.insert(value)?))
    }

    fn copy_scalar(
        &self,
        scalar: ScalarHandle,
        local: &mut ScalarValue,
        accessor: Accessor,
    ) -> Result<()> {
        let mut objects = self.objects.borrow_mut();
        let value = objects.scalars.get_mut(scalar.0)?;
        if value.scalar_type() != local.scalar_type() {
            return Err(Error::new(
                Status::InvalidType,
                format!(
                    "{scalar} holds {:?}, local holds {:?}",
                    value.scalar_type(),
                    local.scalar_type()
                ),
            ));
        }
        match accessor {
            Accessor::ReadOnly => *local = *value,
            Accessor::WriteOnly => *value = *local,
        }
        Ok(())
    }

    fn create_array(&self, item_type: ItemType, capacity: usize) -> Result<ArrayHandle> {
        if capacity == 0 {
            return Err(Error::new(
                Status::InvalidParameters,
                "array capacity must be at least 1",
            ));
        }
        let mut items = Vec::new();
        items
            .try_reserve_exact(capacity)
            .map_err(|_| Error::new(Status::NoMemory, format!("reserving {capacity} items")))?;

        let mut objects = self.objects.borrow_mut();
        self.ensure_room(&objects)?;
        let handle = ArrayHandle(objects.arrays.insert(ArrayObject {
            item_type,
            capacity,
            items,
        })?);
        #[cfg(feature = "tracing")]
        debug!(%handle, capacity, "array created");
        Ok(handle)
    }

    fn copy_array_range(
        &self,
        array: ArrayHandle,
        start: usize,
        end: usize,
        local: &mut [KeyPoint],
        accessor: Accessor,
    ) -> Result<()> {
        let mut objects = self.objects.borrow_mut();
        let arr = objects.arrays.get_mut(array.0)?;
        if start > end || end > arr.items.len() {
            return Err(Error::new(
                Status::InvalidParameters,
                format!(
                    "range {start}..{end} outside {array} holding {} items",
                    arr.items.len()
                ),
            ));
        }
        let n = end - start;
        if local.len() < n {
            return Err(Error::new(
                Status::InvalidParameters,
                format!("local buffer of {} items cannot hold {n}", local.len()),
            ));
        }
        match accessor {
            Accessor::ReadOnly => local[..n].copy_from_slice(&arr.items[start..end]),
            Accessor::WriteOnly => arr.items[start..end].copy_from_slice(&local[..n]),
        }
        Ok(())
    }

    fn copy_image_patch(
        &self,
        image: ImageHandle,
        rect: Rect,
        local: &mut [u8],
        accessor: Accessor,
    ) -> Result<()> {
        let objects = self.objects.borrow();
        let img = objects.images.get(image.0)?;
        let (w, h) = (rect.width() as usize, rect.height() as usize);
        if local.len() < w * h {
            return Err(Error::new(
                Status::InvalidParameters,
                format!("local buffer of {} bytes cannot hold {w}x{h}", local.len()),
            ));
        }
        if rect.is_empty() || !rect.fits_within(img.window.width(), img.window.height()) {
            return Err(Error::new(
                Status::InvalidParameters,
                format!("patch {rect:?} outside {image}"),
            ));
        }
        let abs = Rect::new(
            img.window.start_x + rect.start_x,
            img.window.start_y + rect.start_y,
            img.window.start_x + rect.end_x,
            img.window.start_y + rect.end_y,
        );

        match accessor {
            Accessor::ReadOnly => {
                let plane = img.plane.borrow();
                let view = plane.as_view().subview(abs)?;
                for (y, dst) in local.chunks_exact_mut(w).take(h).enumerate() {
                    dst.copy_from_slice(view.row(y));
                }
            }
            Accessor::WriteOnly => {
                let mut plane = img.plane.borrow_mut();
                let mut full = plane.as_view_mut();
                let mut view = full.subview_mut(abs)?;
                for (y, src) in local.chunks_exact(w).take(h).enumerate() {
                    view.row_mut(y).copy_from_slice(src);
                }
            }
        }
        Ok(())
    }

    fn query_image(&self, image: ImageHandle) -> Result<ImageInfo> {
        let objects = self.objects.borrow();
        let img = objects.images.get(image.0)?;
        Ok(ImageInfo {
            width: img.window.width(),
            height: img.window.height(),
            format: img.format,
            is_roi: img.is_roi,
        })
    }

    fn query_array(&self, array: ArrayHandle) -> Result<ArrayInfo> {
        let objects = self.objects.borrow();
        let arr = objects.arrays.get(array.0)?;
        Ok(ArrayInfo {
            item_type: arr.item_type,
            capacity: arr.capacity,
            num_items: arr.items.len(),
        })
    }

    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    fn fast_corners(
        &self,
        image: ImageHandle,
        strength_thresh: ScalarHandle,
        nonmax_suppression: bool,
        corners: ArrayHandle,
        num_corners: Option<ScalarHandle>,
    ) -> Result<()> {
        let mut objects = self.objects.borrow_mut();
        let objects = &mut *objects;

        let threshold = objects
            .scalars
            .get(strength_thresh.0)?
            .as_f32()
            .ok_or_else(|| {
                Error::new(
                    Status::InvalidType,
                    format!("{strength_thresh} must hold a float32 threshold"),
                )
            })?;
        if let Some(num) = num_corners {
            if objects.scalars.get(num.0)?.as_size().is_none() {
                return Err(Error::new(
                    Status::InvalidType,
                    format!("{num} must hold a size"),
                ));
            }
        }
        // validate the output before running so a failure leaves it untouched
        objects.arrays.get(corners.0)?;

        let params = FastParams {
            threshold,
            nonmax_suppression,
        };
        let found = {
            let img = objects.images.get(image.0)?;
            let plane = img.plane.borrow();
            let view = plane.as_view().subview(img.window)?;
            find_fast_corners_u8(&view, &params)?
        };

        let arr = objects.arrays.get_mut(corners.0)?;
        let stored = found.len().min(arr.capacity);
        if stored < found.len() {
            #[cfg(feature = "tracing")]
            warn!(
                found = found.len(),
                capacity = arr.capacity,
                "corner array full, dropping the remainder"
            );
        }
        arr.items.clear();
        arr.items.extend_from_slice(&found[..stored]);

        if let Some(num) = num_corners {
            *objects.scalars.get_mut(num.0)? = ScalarValue::Size(stored);
        }
        #[cfg(feature = "tracing")]
        debug!(stored, "fast corners done");
        Ok(())
    }

    fn status(&self, reference: Reference) -> Status {
        let objects = self.objects.borrow();
        let live = match reference {
            Reference::Image(h) => objects.images.contains(h.0),
            Reference::Scalar(h) => objects.scalars.contains(h.0),
            Reference::Array(h) => objects.arrays.contains(h.0),
        };
        if live {
            Status::Success
        } else {
            Status::InvalidReference
        }
    }

    fn release(&self, reference: Reference) -> Result<()> {
        let mut objects = self.objects.borrow_mut();
        match reference {
            Reference::Image(h) => drop(objects.images.remove(h.0)?),
            Reference::Scalar(h) => drop(objects.scalars.remove(h.0)?),
            Reference::Array(h) => drop(objects.arrays.remove(h.0)?),
        }
        #[cfg(feature = "tracing")]
        debug!(%reference, "released");
        Ok(())
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        #[cfg(feature = "tracing")]
        debug!(
            live = self.objects.get_mut().live(),
            "context released"
        );
    }
}

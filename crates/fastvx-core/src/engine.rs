//! The engine interface the example driver is written against.

use crate::error::{Result, Status};
use crate::handle::{ArrayHandle, ImageHandle, Reference, ScalarHandle};
use crate::types::{
    Accessor, ArrayInfo, ImageFormat, ImageInfo, ItemType, KeyPoint, PixelValue, Rect,
    ScalarValue,
};

/// Lifecycle and algorithm entry points of a vision engine session.
///
/// A value of the implementing type *is* the session: creating it opens the
/// session and dropping it releases the session together with every object
/// still alive in it. All calls are blocking and run to completion.
///
/// Methods take `&self` so that [`Scoped`] guards can hold a shared borrow
/// of the engine while further calls are made.
pub trait VisionEngine: Sized {
    type Config: Default;

    fn create_context(config: &Self::Config) -> Result<Self>;

    /// Release the session. Equivalent to dropping it.
    fn release_context(self) {
        drop(self);
    }

    fn create_image(&self, width: u32, height: u32, format: ImageFormat) -> Result<ImageHandle>;

    /// Create a view of `rect` (in `image` coordinates) that shares `image`'s
    /// pixels. Releasing the view never invalidates the parent.
    fn create_image_from_roi(&self, image: ImageHandle, rect: Rect) -> Result<ImageHandle>;

    fn set_image_pixel_values(&self, image: ImageHandle, value: PixelValue) -> Result<()>;

    fn create_scalar(&self, value: ScalarValue) -> Result<ScalarHandle>;

    /// Move a value between the scalar object and `local`. Both must hold the
    /// same scalar type.
    fn copy_scalar(
        &self,
        scalar: ScalarHandle,
        local: &mut ScalarValue,
        accessor: Accessor,
    ) -> Result<()>;

    fn create_array(&self, item_type: ItemType, capacity: usize) -> Result<ArrayHandle>;

    /// Copy items `start..end` between the array and `local[..end - start]`.
    fn copy_array_range(
        &self,
        array: ArrayHandle,
        start: usize,
        end: usize,
        local: &mut [KeyPoint],
        accessor: Accessor,
    ) -> Result<()>;

    /// Copy pixels of `rect` (in `image` coordinates) between the image and a
    /// tightly packed row-major `local` buffer.
    fn copy_image_patch(
        &self,
        image: ImageHandle,
        rect: Rect,
        local: &mut [u8],
        accessor: Accessor,
    ) -> Result<()>;

    fn query_image(&self, image: ImageHandle) -> Result<ImageInfo>;

    fn query_array(&self, array: ArrayHandle) -> Result<ArrayInfo>;

    /// Immediate-mode FAST-9. Overwrites `corners` and, when given, stores
    /// the number of keypoints written into the `num_corners` size scalar.
    fn fast_corners(
        &self,
        image: ImageHandle,
        strength_thresh: ScalarHandle,
        nonmax_suppression: bool,
        corners: ArrayHandle,
        num_corners: Option<ScalarHandle>,
    ) -> Result<()>;

    /// `Success` for a live object, `InvalidReference` otherwise.
    fn status(&self, reference: Reference) -> Status;

    fn release(&self, reference: Reference) -> Result<()>;

    /// Tie `handle` to a guard that releases it when dropped.
    fn scoped<H>(&self, handle: H) -> Scoped<'_, Self, H>
    where
        H: Copy + Into<Reference>,
    {
        Scoped::new(self, handle)
    }
}

/// Releases an engine object exactly once: explicitly via [`Scoped::release`]
/// or implicitly on drop. [`Scoped::into_inner`] hands ownership back.
pub struct Scoped<'e, E: VisionEngine, H: Copy + Into<Reference>> {
    engine: &'e E,
    handle: H,
    armed: bool,
}

impl<'e, E: VisionEngine, H: Copy + Into<Reference>> Scoped<'e, E, H> {
    pub fn new(engine: &'e E, handle: H) -> Self {
        Self {
            engine,
            handle,
            armed: true,
        }
    }

    pub fn handle(&self) -> H {
        self.handle
    }

    pub fn release(mut self) -> Result<()> {
        self.armed = false;
        self.engine.release(self.handle.into())
    }

    /// Disarm the guard; the caller becomes responsible for releasing.
    pub fn into_inner(mut self) -> H {
        self.armed = false;
        self.handle
    }
}

impl<E: VisionEngine, H: Copy + Into<Reference>> Drop for Scoped<'_, E, H> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        let reference: Reference = self.handle.into();
        if let Err(_err) = self.engine.release(reference) {
            #[cfg(feature = "tracing")]
            tracing::warn!(%reference, error = %_err, "release on drop failed");
        }
    }
}

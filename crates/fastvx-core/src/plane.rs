//! Pixel storage shared by images and their region-of-interest views.
//!
//! A [`Plane`] owns a contiguous row-major `u8` buffer. Views borrow it with an
//! element stride that may exceed their width, so a subview addresses a window
//! of the parent's rows without copying.

use crate::error::{Error, Result, Status};
use crate::types::Rect;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Plane {
    /// Allocate a zeroed plane. Allocation failure is reported, not aborted on.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::new(
                Status::InvalidDimension,
                format!("plane {width}x{height} has no pixels"),
            ));
        }
        let len = width.checked_mul(height).ok_or_else(|| {
            Error::new(Status::InvalidDimension, "plane size overflows usize")
        })?;

        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| Error::new(Status::NoMemory, format!("allocating {len} pixels")))?;
        data.resize(len, 0);

        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_vec(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        let expected = width.checked_mul(height).ok_or_else(|| {
            Error::new(Status::InvalidDimension, "plane size overflows usize")
        })?;
        if data.len() != expected {
            return Err(Error::new(
                Status::InvalidDimension,
                format!("size mismatch: expected {expected}, got {}", data.len()),
            ));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn as_view(&self) -> PlaneView<'_> {
        PlaneView {
            width: self.width,
            height: self.height,
            stride: self.width,
            data: &self.data,
        }
    }

    pub fn as_view_mut(&mut self) -> PlaneViewMut<'_> {
        PlaneViewMut {
            width: self.width,
            height: self.height,
            stride: self.width,
            data: &mut self.data,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PlaneView<'a> {
    width: usize,
    height: usize,
    stride: usize,
    data: &'a [u8],
}

impl<'a> PlaneView<'a> {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn row(&self, y: usize) -> &'a [u8] {
        assert!(y < self.height, "row index out of bounds");
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.stride + x).copied()
    }

    /// Pixel at a signed offset from `(x, y)`; the caller keeps it in bounds.
    #[inline]
    pub(crate) fn at_offset(&self, x: usize, y: usize, dx: i32, dy: i32) -> u8 {
        let xx = (x as i64 + dx as i64) as usize;
        let yy = (y as i64 + dy as i64) as usize;
        self.data[yy * self.stride + xx]
    }

    pub fn subview(&self, rect: Rect) -> Result<PlaneView<'a>> {
        let start = window_start(self.width, self.height, self.stride, rect)?;
        let (width, height) = (rect.width() as usize, rect.height() as usize);
        let min_len = min_required_len(width, height, self.stride);
        let tail = &self.data[start..];
        if tail.len() < min_len {
            return Err(out_of_bounds(rect));
        }
        Ok(PlaneView {
            width,
            height,
            stride: self.stride,
            data: tail,
        })
    }

    pub fn is_contiguous(&self) -> bool {
        self.stride == self.width
    }
}

#[derive(Debug)]
pub struct PlaneViewMut<'a> {
    width: usize,
    height: usize,
    stride: usize,
    data: &'a mut [u8],
}

impl<'a> PlaneViewMut<'a> {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        assert!(y < self.height, "row index out of bounds");
        let start = y * self.stride;
        &mut self.data[start..start + self.width]
    }

    /// Set every pixel of the view, leaving the parent's other pixels alone.
    pub fn fill(&mut self, value: u8) {
        for y in 0..self.height {
            self.row_mut(y).fill(value);
        }
    }

    pub fn subview_mut(&mut self, rect: Rect) -> Result<PlaneViewMut<'_>> {
        let start = window_start(self.width, self.height, self.stride, rect)?;
        let (width, height) = (rect.width() as usize, rect.height() as usize);
        let min_len = min_required_len(width, height, self.stride);
        let (_, tail) = self.data.split_at_mut(start);
        if tail.len() < min_len {
            return Err(out_of_bounds(rect));
        }
        Ok(PlaneViewMut {
            width,
            height,
            stride: self.stride,
            data: tail,
        })
    }

    pub fn as_view(&self) -> PlaneView<'_> {
        PlaneView {
            width: self.width,
            height: self.height,
            stride: self.stride,
            data: self.data,
        }
    }
}

fn window_start(width: usize, height: usize, stride: usize, rect: Rect) -> Result<usize> {
    if rect.is_empty() || !rect.fits_within(width as u32, height as u32) {
        return Err(out_of_bounds(rect));
    }
    (rect.start_y as usize)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(rect.start_x as usize))
        .ok_or_else(|| out_of_bounds(rect))
}

fn min_required_len(width: usize, height: usize, stride: usize) -> usize {
    (height - 1) * stride + width
}

fn out_of_bounds(rect: Rect) -> Error {
    Error::new(
        Status::InvalidParameters,
        format!(
            "window ({}, {})-({}, {}) is outside the plane",
            rect.start_x, rect.start_y, rect.end_x, rect.end_y
        ),
    )
}

//! A small immediate-mode vision engine with a FAST-9 corner detector.
//!
//! # Overview
//!
//! Callers talk to the engine only through the [`VisionEngine`] trait and the
//! opaque handles it hands out ([`ImageHandle`], [`ScalarHandle`],
//! [`ArrayHandle`]). The crate ships one implementation, [`Context`], which
//! keeps every object in a generational registry so a released handle is
//! rejected rather than silently reused.
//!
//! - [`context`] – the reference engine: images, region-of-interest views
//!   aliasing their parent's pixels, typed scalars, keypoint arrays.
//! - [`response`] – dense FAST-9 strength map on 8-bit views.
//! - [`detect`] – thresholding and 3×3 non-maximum suppression on that map.
//! - [`engine`] – the engine trait and [`Scoped`] release guards.
//!
//! # Features
//!
//! - `rayon` – computes the strength map rows in parallel. Results are
//!   identical to the single-threaded path.
//! - `tracing` – emits spans and events for object lifecycle and detection.
//! - `image` – conversions between engine images and `image::GrayImage`.

pub mod context;
pub mod detect;
pub mod engine;
mod error;
mod handle;
#[cfg(feature = "image")]
pub mod image;
pub mod plane;
pub mod response;
pub mod ring;
mod types;

pub use crate::context::{Context, ContextConfig};
pub use crate::engine::{Scoped, VisionEngine};
pub use crate::error::{Error, Result, Status};
pub use crate::handle::{ArrayHandle, ImageHandle, Reference, ScalarHandle};
pub use crate::types::{
    Accessor, ArrayInfo, ImageFormat, ImageInfo, ItemType, KeyPoint, PixelValue, Rect,
    ScalarType, ScalarValue,
};

/// Parameters of a single FAST-9 invocation.
#[derive(Clone, Debug)]
pub struct FastParams {
    /// Minimum contrast between the centre and a contiguous arc, in `[0, 256)`.
    pub threshold: f32,
    /// Keep only local maxima of the strength map in a 3×3 window.
    pub nonmax_suppression: bool,
}

impl Default for FastParams {
    fn default() -> Self {
        Self {
            threshold: 20.0,
            nonmax_suppression: true,
        }
    }
}

/// Dense response map in row-major layout.
#[derive(Clone, Debug)]
pub struct ResponseMap {
    pub w: usize,
    pub h: usize,
    pub data: Vec<f32>,
}

impl ResponseMap {
    /// Response value at an integer coordinate.
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.w + x]
    }
}

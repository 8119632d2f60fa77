//! Immediate-mode FAST corners example over a [`VisionEngine`].
//!
//! [`driver`] holds the example itself and is generic over the engine;
//! [`app`] adds configuration, logging and the JSON/PNG outputs used by the
//! `fastvx` binary.

pub mod app;
pub mod driver;

pub use fastvx_core::{Context, ContextConfig, KeyPoint, Rect, VisionEngine};

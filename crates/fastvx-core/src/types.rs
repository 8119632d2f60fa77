//! Plain value types exchanged between the engine and its callers.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle with exclusive end bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub start_x: u32,
    pub start_y: u32,
    pub end_x: u32,
    pub end_y: u32,
}

impl Rect {
    pub fn new(start_x: u32, start_y: u32, end_x: u32, end_y: u32) -> Self {
        Self {
            start_x,
            start_y,
            end_x,
            end_y,
        }
    }

    pub fn width(&self) -> u32 {
        self.end_x.saturating_sub(self.start_x)
    }

    pub fn height(&self) -> u32 {
        self.end_y.saturating_sub(self.start_y)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// True when the rectangle lies inside a `width` x `height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.start_x <= self.end_x
            && self.start_y <= self.end_y
            && self.end_x <= width
            && self.end_y <= height
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.start_x && x < self.end_x && y >= self.start_y && y < self.end_y
    }
}

/// Pixel layouts understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// Single channel, 8 bits per pixel.
    U8,
}

/// A single pixel value used to fill an image or view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelValue {
    U8(u8),
}

/// Type tag of a scalar object, fixed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Float32,
    Size,
    Bool,
}

/// Value held by a scalar object or by its local mirror.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarValue {
    Float32(f32),
    Size(usize),
    Bool(bool),
}

impl ScalarValue {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Self::Float32(_) => ScalarType::Float32,
            Self::Size(_) => ScalarType::Size,
            Self::Bool(_) => ScalarType::Bool,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Self::Float32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_size(&self) -> Option<usize> {
        match *self {
            Self::Size(v) => Some(v),
            _ => None,
        }
    }
}

/// Element types an array object can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    KeyPoint,
}

/// Direction of a copy between engine-owned and caller-owned memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
    /// Engine object is read; caller memory is written.
    ReadOnly,
    /// Caller memory is read; engine object is written.
    WriteOnly,
}

/// Geometry of an image or view as seen through its own handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    /// True for a region-of-interest view.
    pub is_roi: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayInfo {
    pub item_type: ItemType,
    pub capacity: usize,
    pub num_items: usize,
}

/// Keypoint record produced by feature detectors.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KeyPoint {
    pub x: i32,
    pub y: i32,
    /// Detector response; for FAST, the largest threshold at which the point
    /// is still a corner.
    pub strength: f32,
    pub scale: f32,
    pub orientation: f32,
    /// 1 when the point is valid, 0 when a tracker lost it.
    pub tracking_status: i32,
    pub error: f32,
}

impl KeyPoint {
    pub fn detected(x: i32, y: i32, strength: f32) -> Self {
        Self {
            x,
            y,
            strength,
            scale: 0.0,
            orientation: 0.0,
            tracking_status: 1,
            error: 0.0,
        }
    }
}

//! FAST-9 corner extraction on top of the dense strength map.
use crate::error::{Error, Result, Status};
use crate::plane::PlaneView;
use crate::response::fast_response_u8;
use crate::ring::RADIUS;
use crate::types::KeyPoint;
use crate::{FastParams, ResponseMap};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Detect FAST-9 corners in an 8-bit view.
///
/// Keypoints are reported in raster order, in the view's own coordinates.
pub fn find_fast_corners_u8(img: &PlaneView<'_>, params: &FastParams) -> Result<Vec<KeyPoint>> {
    params.validate()?;
    let resp = fast_response_u8(img);
    Ok(detect_corners_from_response(&resp, params))
}

/// Threshold and (optionally) suppress an existing strength map.
///
/// A pixel is a corner when its strength is strictly above the threshold.
/// Suppression keeps a corner only if it is strictly stronger than each
/// corner neighbour that precedes it in raster order and at least as strong
/// as each one that follows, so a plateau of equal strengths keeps its
/// first pixel instead of vanishing.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(resp, params), fields(w = resp.w, h = resp.h))
)]
pub fn detect_corners_from_response(resp: &ResponseMap, params: &FastParams) -> Vec<KeyPoint> {
    let w = resp.w;
    let h = resp.h;
    let mut corners = Vec::new();

    if w <= 2 * RADIUS || h <= 2 * RADIUS {
        return corners;
    }

    let thr = params.threshold;
    for y in RADIUS..(h - RADIUS) {
        for x in RADIUS..(w - RADIUS) {
            let v = resp.at(x, y);
            if v <= thr {
                continue;
            }
            if params.nonmax_suppression && !is_local_max(resp, x, y, thr, v) {
                continue;
            }
            corners.push(KeyPoint::detected(x as i32, y as i32, v));
        }
    }

    corners
}

fn is_local_max(resp: &ResponseMap, x: usize, y: usize, thr: f32, v: f32) -> bool {
    for dy in -1i32..=1 {
        for dx in -1i32..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            // x, y are at least RADIUS from the border, so the window fits
            let xx = (x as i32 + dx) as usize;
            let yy = (y as i32 + dy) as usize;
            let vv = resp.at(xx, yy);
            if vv <= thr {
                continue;
            }
            let earlier = dy < 0 || (dy == 0 && dx < 0);
            if (earlier && vv >= v) || (!earlier && vv > v) {
                return false;
            }
        }
    }
    true
}

impl FastParams {
    /// Thresholds must lie in `[0, 256)`; NaN is rejected.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..256.0).contains(&self.threshold) {
            return Err(Error::new(
                Status::InvalidParameters,
                format!("strength threshold {} outside [0, 256)", self.threshold),
            ));
        }
        Ok(())
    }
}

use crate::plane::PlaneView;
use crate::ring::{ARC_LENGTH, CIRCLE3, RADIUS};
use crate::ResponseMap;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Dense FAST-9 strength map of an 8-bit view.
///
/// Each interior pixel holds the largest threshold at which it still passes
/// the segment test; pixels within [`RADIUS`] of the border hold 0.
pub fn fast_response_u8(img: &PlaneView<'_>) -> ResponseMap {
    let w = img.width();
    let h = img.height();
    let mut data = vec![0.0f32; w * h];

    // only evaluate where the full circle fits
    if w <= 2 * RADIUS || h <= 2 * RADIUS {
        return ResponseMap { w, h, data };
    }

    let fill_row = |y: usize, row: &mut [f32]| {
        if y < RADIUS || y >= h - RADIUS {
            return;
        }
        for (x, out) in row.iter_mut().enumerate().take(w - RADIUS).skip(RADIUS) {
            *out = strength_at_u8(img, x, y);
        }
    };

    #[cfg(feature = "rayon")]
    data.par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, row)| fill_row(y, row));

    #[cfg(not(feature = "rayon"))]
    data.chunks_mut(w)
        .enumerate()
        .for_each(|(y, row)| fill_row(y, row));

    ResponseMap { w, h, data }
}

#[inline]
fn strength_at_u8(img: &PlaneView<'_>, x: usize, y: usize) -> f32 {
    let c = img.at_offset(x, y, 0, 0) as i16;

    let mut brighter = [0i16; 16];
    let mut darker = [0i16; 16];
    for (k, &(dx, dy)) in CIRCLE3.iter().enumerate() {
        let p = img.at_offset(x, y, dx, dy) as i16;
        brighter[k] = p - c;
        darker[k] = c - p;
    }

    best_arc_contrast(&brighter)
        .max(best_arc_contrast(&darker))
        .max(0) as f32
}

/// Max over all wrapped arcs of [`ARC_LENGTH`] samples of the arc's minimum.
#[inline]
fn best_arc_contrast(diff: &[i16; 16]) -> i16 {
    let mut best = i16::MIN;
    for start in 0..16 {
        let mut arc_min = i16::MAX;
        for k in 0..ARC_LENGTH {
            arc_min = arc_min.min(diff[(start + k) % 16]);
        }
        best = best.max(arc_min);
    }
    best
}

//! `image::GrayImage` interop for engine images.
//!
//! These go through the public [`VisionEngine`] calls only, so they work for
//! any engine, not just the reference [`Context`](crate::Context).

use ::image::GrayImage;

use crate::engine::VisionEngine;
use crate::error::{Error, Result, Status};
use crate::handle::ImageHandle;
use crate::types::{Accessor, ImageFormat, Rect};

/// Copy an engine image (or view) out into a `GrayImage`.
pub fn to_gray_image<E: VisionEngine>(engine: &E, image: ImageHandle) -> Result<GrayImage> {
    let info = engine.query_image(image)?;
    let mut px = vec![0u8; info.width as usize * info.height as usize];
    engine.copy_image_patch(
        image,
        Rect::new(0, 0, info.width, info.height),
        &mut px,
        Accessor::ReadOnly,
    )?;
    GrayImage::from_raw(info.width, info.height, px)
        .ok_or_else(|| Error::new(Status::Failure, "pixel buffer does not match image size"))
}

/// Create a U8 engine image holding a copy of `img`.
///
/// The new image is released again if the upload fails.
pub fn create_image_from_gray<E: VisionEngine>(engine: &E, img: &GrayImage) -> Result<ImageHandle> {
    let (w, h) = img.dimensions();
    let image = engine.scoped(engine.create_image(w, h, ImageFormat::U8)?);
    let mut px = img.as_raw().clone();
    engine.copy_image_patch(
        image.handle(),
        Rect::new(0, 0, w, h),
        &mut px,
        Accessor::WriteOnly,
    )?;
    Ok(image.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Context, PixelValue};
    use ::image::Luma;

    #[test]
    fn gray_image_round_trips_through_engine() {
        let ctx = Context::new().expect("context");
        let mut img = GrayImage::from_pixel(12, 7, Luma([5u8]));
        img.put_pixel(3, 4, Luma([200]));

        let handle = create_image_from_gray(&ctx, &img).expect("upload");
        let back = to_gray_image(&ctx, handle).expect("download");
        assert_eq!(back, img);
    }

    #[test]
    fn view_exports_only_its_window() {
        let ctx = Context::new().expect("context");
        let parent = ctx.create_image(10, 10, ImageFormat::U8).expect("image");
        ctx.set_image_pixel_values(parent, PixelValue::U8(1))
            .expect("fill");
        let view = ctx
            .create_image_from_roi(parent, Rect::new(4, 2, 7, 3))
            .expect("roi");

        let out = to_gray_image(&ctx, view).expect("download");
        assert_eq!(out.dimensions(), (3, 1));
        assert!(out.pixels().all(|p| p[0] == 1));
    }
}

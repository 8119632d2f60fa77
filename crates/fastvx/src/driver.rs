//! The example program proper: paint a rectangle, run FAST twice, print the
//! keypoints.
//!
//! Every step is generic over [`VisionEngine`] and every engine object is held
//! by a [`Scoped`] guard, so each is released exactly once whichever step
//! fails. Step failures carry the messages below as their outermost context.

use std::io::Write;

use anyhow::{Context, Result};
use fastvx_core::image::to_gray_image;
use fastvx_core::{
    Accessor, ArrayHandle, ImageFormat, ImageHandle, ItemType, KeyPoint, PixelValue,
    ScalarHandle, ScalarValue, Scoped, VisionEngine,
};
use image::GrayImage;
use tracing::{debug, info, instrument};

use crate::app::ExampleConfig;

pub const CREATE_CONTEXT_FAILED: &str = "Could not create a vx_context";
pub const CREATE_IMAGE_FAILED: &str = "Could not create image";
pub const CREATE_PARAMS_FAILED: &str = "Could not create parameters for FastCorners";
pub const FAST_CORNERS_FAILED: &str = "Fast Corners function failed";
pub const COPY_SCALAR_FAILED: &str = "vxCopyScalar failed";
pub const COPY_ARRAY_FAILED: &str = "vxCopyArrayRange failed";
pub const EXPORT_IMAGE_FAILED: &str = "Could not read back input image";

/// Keypoints reported by one detector run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub nonmax_suppression: bool,
    pub corners: Vec<KeyPoint>,
}

/// Everything the example produced.
#[derive(Debug, Clone)]
pub struct Report {
    /// Suppressed run first, unsuppressed second.
    pub runs: Vec<RunReport>,
    /// Copy of the input image, taken only when a PNG was requested.
    pub input: Option<GrayImage>,
}

/// Open a session with `engine_config`, run the example in it and close it.
pub fn run_example<E: VisionEngine>(
    engine_config: &E::Config,
    cfg: &ExampleConfig,
    out: &mut impl Write,
) -> Result<Report> {
    let engine = E::create_context(engine_config).context(CREATE_CONTEXT_FAILED)?;
    let report = run_in_session(&engine, cfg, out);
    engine.release_context();
    report
}

/// Run the example inside an already open session. Nothing created here
/// outlives the call.
pub fn run_in_session<E: VisionEngine>(
    engine: &E,
    cfg: &ExampleConfig,
    out: &mut impl Write,
) -> Result<Report> {
    let image = engine.scoped(build_input_image(engine, cfg).context(CREATE_IMAGE_FAILED)?);
    let params = FastParameters::allocate(engine, cfg).context(CREATE_PARAMS_FAILED)?;
    let mut local = alloc_local_buffer(cfg.capacity).context(CREATE_PARAMS_FAILED)?;

    for run in &params.runs {
        engine
            .fast_corners(
                image.handle(),
                params.thresh.handle(),
                run.nonmax_suppression,
                run.corners.handle(),
                Some(run.num_corners.handle()),
            )
            .context(FAST_CORNERS_FAILED)?;
    }

    let mut runs = Vec::with_capacity(params.runs.len());
    for run in &params.runs {
        let corners = report_run(engine, run, &mut local, out)?;
        runs.push(RunReport {
            nonmax_suppression: run.nonmax_suppression,
            corners,
        });
    }

    let input = match cfg.output_png {
        Some(_) => Some(to_gray_image(engine, image.handle()).context(EXPORT_IMAGE_FAILED)?),
        None => None,
    };
    Ok(Report { runs, input })
}

/// Create the input image: background everywhere, foreground inside
/// `cfg.rect`, painted through a view that is released before returning.
///
/// On failure both the view and the image are released.
#[instrument(level = "debug", skip_all, fields(width = cfg.width, height = cfg.height))]
pub fn build_input_image<E: VisionEngine>(
    engine: &E,
    cfg: &ExampleConfig,
) -> fastvx_core::Result<ImageHandle> {
    let image = engine.scoped(engine.create_image(cfg.width, cfg.height, ImageFormat::U8)?);
    let roi = engine.scoped(engine.create_image_from_roi(image.handle(), cfg.rect)?);
    engine.set_image_pixel_values(image.handle(), PixelValue::U8(cfg.background))?;
    engine.set_image_pixel_values(roi.handle(), PixelValue::U8(cfg.foreground))?;
    roi.release()?;
    Ok(image.into_inner())
}

struct RunObjects<'e, E: VisionEngine> {
    nonmax_suppression: bool,
    corners: Scoped<'e, E, ArrayHandle>,
    num_corners: Scoped<'e, E, ScalarHandle>,
}

/// Threshold plus one output array and counter per detector run.
struct FastParameters<'e, E: VisionEngine> {
    thresh: Scoped<'e, E, ScalarHandle>,
    runs: Vec<RunObjects<'e, E>>,
}

impl<'e, E: VisionEngine> FastParameters<'e, E> {
    fn allocate(engine: &'e E, cfg: &ExampleConfig) -> fastvx_core::Result<Self> {
        let thresh = engine.scoped(engine.create_scalar(ScalarValue::Float32(cfg.strength_thresh))?);
        let mut runs = Vec::with_capacity(2);
        for nonmax_suppression in [true, false] {
            runs.push(RunObjects {
                nonmax_suppression,
                corners: engine.scoped(engine.create_array(ItemType::KeyPoint, cfg.capacity)?),
                num_corners: engine.scoped(engine.create_scalar(ScalarValue::Size(0))?),
            });
        }
        Ok(Self { thresh, runs })
    }
}

fn alloc_local_buffer(capacity: usize) -> Result<Vec<KeyPoint>> {
    let mut local = Vec::new();
    local
        .try_reserve_exact(capacity)
        .with_context(|| format!("reserving {capacity} keypoints"))?;
    local.resize(capacity, KeyPoint::default());
    Ok(local)
}

fn report_run<E: VisionEngine>(
    engine: &E,
    run: &RunObjects<'_, E>,
    local: &mut [KeyPoint],
    out: &mut impl Write,
) -> Result<Vec<KeyPoint>> {
    let mut count = ScalarValue::Size(0);
    engine
        .copy_scalar(run.num_corners.handle(), &mut count, Accessor::ReadOnly)
        .context(COPY_SCALAR_FAILED)?;
    let n = count.as_size().context(COPY_SCALAR_FAILED)?;

    let suffix = if run.nonmax_suppression {
        "with"
    } else {
        "without"
    };
    writeln!(out, "Found {n} corners {suffix} non-max suppression")?;
    info!(count = n, nonmax = run.nonmax_suppression, "corners found");

    if n > local.len() {
        let err = anyhow::anyhow!("count {n} exceeds local buffer of {}", local.len());
        return Err(err.context(COPY_ARRAY_FAILED));
    }
    engine
        .copy_array_range(run.corners.handle(), 0, n, local, Accessor::ReadOnly)
        .context(COPY_ARRAY_FAILED)?;
    for (i, kp) in local[..n].iter().enumerate() {
        writeln!(out, "Entry {i:3}: x = {}, y = {}", kp.x, kp.y)?;
    }
    debug!(copied = n, "keypoints copied");
    Ok(local[..n].to_vec())
}

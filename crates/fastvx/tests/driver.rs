use std::cell::Cell;

use fastvx::app::ExampleConfig;
use fastvx::driver::{
    build_input_image, run_example, run_in_session, COPY_ARRAY_FAILED, COPY_SCALAR_FAILED,
    CREATE_CONTEXT_FAILED, CREATE_IMAGE_FAILED, CREATE_PARAMS_FAILED, FAST_CORNERS_FAILED,
};
use fastvx_core::image::to_gray_image;
use fastvx_core::{
    Accessor, ArrayHandle, ArrayInfo, Context, ContextConfig, Error, ImageFormat, ImageHandle,
    ImageInfo, ItemType, KeyPoint, PixelValue, Rect, Reference, Result, ScalarHandle,
    ScalarValue, Status, VisionEngine,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    CreateImage,
    CreateRoi,
    SetPixels,
    CreateScalar,
    CreateArray,
    FastCorners,
    CopyScalar,
    CopyArray,
}

#[derive(Default)]
struct FaultyConfig {
    fail_session: bool,
    /// Fail the call of `Op` made after this many successful ones.
    fault: Option<(Op, usize)>,
}

/// Reference engine that fails one chosen call and counts bad releases.
struct Faulty {
    inner: Context,
    fault: Option<(Op, usize)>,
    seen: Cell<usize>,
    bad_releases: Cell<usize>,
}

impl Faulty {
    fn new(fault: Option<(Op, usize)>) -> Self {
        Self::create_context(&FaultyConfig {
            fail_session: false,
            fault,
        })
        .expect("session")
    }

    fn check(&self, op: Op) -> Result<()> {
        match self.fault {
            Some((target, after)) if target == op => {
                let n = self.seen.get();
                self.seen.set(n + 1);
                if n == after {
                    return Err(Error::new(Status::Failure, format!("injected {op:?}")));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl VisionEngine for Faulty {
    type Config = FaultyConfig;

    fn create_context(config: &FaultyConfig) -> Result<Self> {
        if config.fail_session {
            return Err(Error::new(Status::NoResources, "injected session failure"));
        }
        Ok(Self {
            inner: Context::create_context(&ContextConfig::default())?,
            fault: config.fault,
            seen: Cell::new(0),
            bad_releases: Cell::new(0),
        })
    }

    fn create_image(&self, width: u32, height: u32, format: ImageFormat) -> Result<ImageHandle> {
        self.check(Op::CreateImage)?;
        self.inner.create_image(width, height, format)
    }

    fn create_image_from_roi(&self, image: ImageHandle, rect: Rect) -> Result<ImageHandle> {
        self.check(Op::CreateRoi)?;
        self.inner.create_image_from_roi(image, rect)
    }

    fn set_image_pixel_values(&self, image: ImageHandle, value: PixelValue) -> Result<()> {
        self.check(Op::SetPixels)?;
        self.inner.set_image_pixel_values(image, value)
    }

    fn create_scalar(&self, value: ScalarValue) -> Result<ScalarHandle> {
        self.check(Op::CreateScalar)?;
        self.inner.create_scalar(value)
    }

    fn copy_scalar(
        &self,
        scalar: ScalarHandle,
        local: &mut ScalarValue,
        accessor: Accessor,
    ) -> Result<()> {
        self.check(Op::CopyScalar)?;
        self.inner.copy_scalar(scalar, local, accessor)
    }

    fn create_array(&self, item_type: ItemType, capacity: usize) -> Result<ArrayHandle> {
        self.check(Op::CreateArray)?;
        self.inner.create_array(item_type, capacity)
    }

    fn copy_array_range(
        &self,
        array: ArrayHandle,
        start: usize,
        end: usize,
        local: &mut [KeyPoint],
        accessor: Accessor,
    ) -> Result<()> {
        self.check(Op::CopyArray)?;
        self.inner
            .copy_array_range(array, start, end, local, accessor)
    }

    fn copy_image_patch(
        &self,
        image: ImageHandle,
        rect: Rect,
        local: &mut [u8],
        accessor: Accessor,
    ) -> Result<()> {
        self.inner.copy_image_patch(image, rect, local, accessor)
    }

    fn query_image(&self, image: ImageHandle) -> Result<ImageInfo> {
        self.inner.query_image(image)
    }

    fn query_array(&self, array: ArrayHandle) -> Result<ArrayInfo> {
        self.inner.query_array(array)
    }

    fn fast_corners(
        &self,
        image: ImageHandle,
        strength_thresh: ScalarHandle,
        nonmax_suppression: bool,
        corners: ArrayHandle,
        num_corners: Option<ScalarHandle>,
    ) -> Result<()> {
        self.check(Op::FastCorners)?;
        self.inner.fast_corners(
            image,
            strength_thresh,
            nonmax_suppression,
            corners,
            num_corners,
        )
    }

    fn status(&self, reference: Reference) -> Status {
        self.inner.status(reference)
    }

    fn release(&self, reference: Reference) -> Result<()> {
        let res = self.inner.release(reference);
        if res.is_err() {
            self.bad_releases.set(self.bad_releases.get() + 1);
        }
        res
    }
}

fn output_lines(out: &[u8]) -> Vec<String> {
    String::from_utf8(out.to_vec())
        .expect("utf8 output")
        .lines()
        .map(str::to_owned)
        .collect()
}

#[test]
fn default_run_prints_both_reports() {
    let mut out = Vec::new();
    let report = run_example::<Context>(
        &ContextConfig::default(),
        &ExampleConfig::default(),
        &mut out,
    )
    .expect("example runs");

    let lines = output_lines(&out);
    assert_eq!(
        &lines[..5],
        [
            "Found 4 corners with non-max suppression",
            "Entry   0: x = 20, y = 40",
            "Entry   1: x = 77, y = 40",
            "Entry   2: x = 20, y = 57",
            "Entry   3: x = 79, y = 57",
        ]
    );
    assert_eq!(lines[5], "Found 24 corners without non-max suppression");
    assert_eq!(lines.len(), 1 + 4 + 1 + 24);
    assert!(lines[6..].iter().all(|l| l.starts_with("Entry ")));

    assert_eq!(report.runs.len(), 2);
    assert!(report.runs[0].nonmax_suppression);
    assert!(!report.runs[1].nonmax_suppression);
    assert!(report.input.is_none());
}

#[test]
fn suppressed_count_never_exceeds_unsuppressed() {
    for thresh in [0.0, 10.0, 60.0, 128.0, 200.0, 254.0] {
        let cfg = ExampleConfig {
            strength_thresh: thresh,
            capacity: 400,
            ..ExampleConfig::default()
        };
        let report = run_example::<Context>(&cfg.engine, &cfg, &mut std::io::sink())
            .expect("example runs");
        let (kept, all) = (&report.runs[0].corners, &report.runs[1].corners);
        assert!(kept.len() <= all.len(), "threshold {thresh}");
        assert!(kept.iter().all(|k| all.contains(k)), "threshold {thresh}");
    }
}

#[test]
fn reported_count_matches_stored_records_when_array_is_small() {
    let cfg = ExampleConfig {
        capacity: 10,
        ..ExampleConfig::default()
    };
    let mut out = Vec::new();
    let report = run_example::<Context>(&cfg.engine, &cfg, &mut out).expect("example runs");

    assert_eq!(report.runs[0].corners.len(), 4);
    assert_eq!(report.runs[1].corners.len(), 10);
    let lines = output_lines(&out);
    assert!(lines.contains(&"Found 10 corners without non-max suppression".to_owned()));
}

#[test]
fn input_image_is_rectangle_on_background() {
    let ctx = Context::new().expect("context");
    let cfg = ExampleConfig::default();
    let image = build_input_image(&ctx, &cfg).expect("image");
    assert_eq!(ctx.live_references(), 1);

    let info = ctx.query_image(image).expect("info");
    assert!(!info.is_roi);
    let gray = to_gray_image(&ctx, image).expect("pixels");
    for (x, y, p) in gray.enumerate_pixels() {
        let expected = if cfg.rect.contains(x, y) { 255 } else { 0 };
        assert_eq!(p[0], expected, "pixel ({x}, {y})");
    }
}

#[test]
fn png_request_captures_the_input() {
    let cfg = ExampleConfig {
        output_png: Some("unused.png".into()),
        ..ExampleConfig::default()
    };
    let report = run_example::<Context>(&cfg.engine, &cfg, &mut std::io::sink())
        .expect("example runs");
    let input = report.input.expect("captured input");
    assert_eq!(input.dimensions(), (100, 100));
    assert_eq!(input.get_pixel(20, 40)[0], 255);
    assert_eq!(input.get_pixel(19, 40)[0], 0);
}

#[test]
fn session_failure_reports_a_single_message() {
    let mut out = Vec::new();
    let cfg = FaultyConfig {
        fail_session: true,
        fault: None,
    };
    let err = run_example::<Faulty>(&cfg, &ExampleConfig::default(), &mut out)
        .expect_err("session fails");
    assert_eq!(err.to_string(), CREATE_CONTEXT_FAILED);
    assert!(out.is_empty());
}

#[test]
fn every_failure_point_cleans_up_exactly_once() {
    let cases = [
        (Op::CreateImage, 0, CREATE_IMAGE_FAILED),
        (Op::CreateRoi, 0, CREATE_IMAGE_FAILED),
        (Op::SetPixels, 0, CREATE_IMAGE_FAILED),
        (Op::SetPixels, 1, CREATE_IMAGE_FAILED),
        (Op::CreateScalar, 0, CREATE_PARAMS_FAILED),
        (Op::CreateScalar, 2, CREATE_PARAMS_FAILED),
        (Op::CreateArray, 1, CREATE_PARAMS_FAILED),
        (Op::FastCorners, 0, FAST_CORNERS_FAILED),
        (Op::FastCorners, 1, FAST_CORNERS_FAILED),
        (Op::CopyScalar, 0, COPY_SCALAR_FAILED),
        (Op::CopyScalar, 1, COPY_SCALAR_FAILED),
        (Op::CopyArray, 0, COPY_ARRAY_FAILED),
        (Op::CopyArray, 1, COPY_ARRAY_FAILED),
    ];
    for (op, after, message) in cases {
        let engine = Faulty::new(Some((op, after)));
        let err = run_in_session(&engine, &ExampleConfig::default(), &mut std::io::sink())
            .expect_err("injected failure");
        assert_eq!(err.to_string(), message, "{op:?} #{after}");
        assert_eq!(engine.inner.live_references(), 0, "{op:?} #{after} leaked");
        assert_eq!(engine.bad_releases.get(), 0, "{op:?} #{after} double release");
    }
}

#[test]
fn failure_after_first_report_keeps_its_output() {
    let engine = Faulty::new(Some((Op::CopyScalar, 1)));
    let mut out = Vec::new();
    run_in_session(&engine, &ExampleConfig::default(), &mut out).expect_err("second copy fails");

    let lines = output_lines(&out);
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "Found 4 corners with non-max suppression");
}

#[test]
fn successful_run_releases_everything() {
    let engine = Faulty::new(None);
    run_in_session(&engine, &ExampleConfig::default(), &mut std::io::sink())
        .expect("example runs");
    assert_eq!(engine.inner.live_references(), 0);
    assert_eq!(engine.bad_releases.get(), 0);
}

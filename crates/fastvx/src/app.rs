//! Application-level helpers shared by the CLI and the tests.
//!
//! Configuration loading, logging setup and the optional JSON/PNG outputs
//! wrapped around [`crate::driver`].

use anyhow::{Context, Result};
use fastvx_core::{ContextConfig, KeyPoint, Rect};
use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::Write, path::Path, path::PathBuf};
use tracing_subscriber::EnvFilter;

use crate::driver::Report;

/// Inputs of the example. Every field may be omitted from a JSON config.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExampleConfig {
    pub width: u32,
    pub height: u32,
    /// Painted through a region-of-interest view; end bounds exclusive.
    pub rect: Rect,
    pub background: u8,
    pub foreground: u8,
    pub strength_thresh: f32,
    /// Capacity of each keypoint array and of the local copy buffer.
    pub capacity: usize,
    pub log_level: Option<String>,
    pub output_json: Option<PathBuf>,
    pub output_png: Option<PathBuf>,
    pub engine: ContextConfig,
}

impl Default for ExampleConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
            rect: Rect::new(20, 40, 80, 60),
            background: 0,
            foreground: 255,
            strength_thresh: 128.0,
            capacity: 100,
            log_level: None,
            output_json: None,
            output_png: None,
            engine: ContextConfig::default(),
        }
    }
}

impl ExampleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            anyhow::bail!("capacity must be >= 1");
        }
        if self.rect.is_empty() || !self.rect.fits_within(self.width, self.height) {
            anyhow::bail!(
                "rect ({}, {})-({}, {}) must be non-empty and inside the {}x{} image",
                self.rect.start_x,
                self.rect.start_y,
                self.rect.end_x,
                self.rect.end_y,
                self.width,
                self.height
            );
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<ExampleConfig> {
    let file = File::open(path).with_context(|| format!("opening config {}", path.display()))?;
    let cfg: ExampleConfig = serde_json::from_reader(file)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}

/// Install a stderr `fmt` subscriber. `level` takes `EnvFilter` syntax;
/// without it `RUST_LOG` is consulted, then `warn`.
pub fn init_tracing(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log level '{directives}'"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RunDump {
    pub nonmax_suppression: bool,
    pub num_corners: usize,
    pub corners: Vec<KeyPoint>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct DetectionDump {
    pub width: u32,
    pub height: u32,
    pub rect: Rect,
    pub strength_thresh: f32,
    pub capacity: usize,
    pub runs: Vec<RunDump>,
}

impl DetectionDump {
    pub fn new(cfg: &ExampleConfig, report: &Report) -> Self {
        Self {
            width: cfg.width,
            height: cfg.height,
            rect: cfg.rect,
            strength_thresh: cfg.strength_thresh,
            capacity: cfg.capacity,
            runs: report
                .runs
                .iter()
                .map(|run| RunDump {
                    nonmax_suppression: run.nonmax_suppression,
                    num_corners: run.corners.len(),
                    corners: run.corners.clone(),
                })
                .collect(),
        }
    }
}

/// Write whichever of the JSON dump and the PNG visualization `cfg` asks for.
pub fn write_outputs(cfg: &ExampleConfig, report: &Report) -> Result<()> {
    if let Some(path) = &cfg.output_json {
        write_json(path, &DetectionDump::new(cfg, report))
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), "saved JSON dump");
    }
    if let Some(path) = &cfg.output_png {
        let mut vis = report
            .input
            .clone()
            .context("input image was not captured")?;
        // suppressed run only
        if let Some(run) = report.runs.iter().find(|r| r.nonmax_suppression) {
            draw_corners(&mut vis, run.corners.iter().map(|k| (k.x, k.y)), 128);
        }
        vis.save(path)
            .with_context(|| format!("saving visualization {}", path.display()))?;
        tracing::info!(path = %path.display(), "saved visualization");
    }
    Ok(())
}

/// Draw a 3×3 square of `value` around every corner, clipped to the image.
pub fn draw_corners(vis: &mut GrayImage, corners: impl Iterator<Item = (i32, i32)>, value: u8) {
    for (x, y) in corners {
        for dy in -1..=1 {
            for dx in -1..=1 {
                let xx = x + dx;
                let yy = y + dy;
                if xx >= 0 && yy >= 0 && xx < vis.width() as i32 && yy < vis.height() as i32 {
                    vis.put_pixel(xx as u32, yy as u32, Luma([value]));
                }
            }
        }
    }
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let mut json_file = File::create(path)?;
    serde_json::to_writer_pretty(&mut json_file, value)?;
    json_file.write_all(b"\n")?;
    Ok(())
}

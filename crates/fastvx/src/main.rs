use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use fastvx::app::{init_tracing, load_config, write_outputs, ExampleConfig};
use fastvx::driver::run_example;
use fastvx::Context;

#[derive(Parser, Debug)]
#[command(
    name = "fastvx",
    about = "Paint a white rectangle, then count its FAST corners with and without non-max suppression"
)]
struct Args {
    /// JSON config; omitted fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter for stderr, e.g. `debug` or `fastvx_core=trace`
    #[arg(long)]
    log_level: Option<String>,

    /// Dump both runs as JSON
    #[arg(long = "json")]
    output_json: Option<PathBuf>,

    /// Save the input image with the suppressed corners marked
    #[arg(long = "png")]
    output_png: Option<PathBuf>,
}

fn run(args: Args) -> Result<()> {
    let mut cfg = match &args.config {
        Some(path) => load_config(path)?,
        None => ExampleConfig::default(),
    };
    if args.log_level.is_some() {
        cfg.log_level = args.log_level;
    }
    if args.output_json.is_some() {
        cfg.output_json = args.output_json;
    }
    if args.output_png.is_some() {
        cfg.output_png = args.output_png;
    }
    init_tracing(cfg.log_level.as_deref())?;
    cfg.validate()?;

    let stdout = std::io::stdout();
    let report = run_example::<Context>(&cfg.engine, &cfg, &mut stdout.lock())?;
    write_outputs(&cfg, &report)
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!("{err:#}");
            println!("ERROR! ");
            println!("{err}");
            ExitCode::from(1)
        }
    }
}

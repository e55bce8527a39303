//! Report command: JSON summary of an image and its luminance.

use anyhow::{Context as _, Result};
use lumen_ops::report::{write_json, ImageReport};
use lumen_ops::Context;
use std::time::Instant;

use crate::ReportArgs;

/// Runs the report command.
pub fn run(args: ReportArgs, ctx: &Context) -> Result<()> {
    tracing::info!("lumen [report]: {} -> {}", args.input.display(), args.output.display());
    let (image, _) = super::load_image(ctx, &args.input, args.icc_in.as_deref())?;

    let start = Instant::now();
    let report = ImageReport::new(ctx, &args.input, &image).context("Failed to build report")?;
    tracing::debug!(elapsed = start.elapsed().as_secs_f64(), "report built");

    write_json(&args.output, &report).with_context(|| format!("Failed to save: {}", args.output.display()))
}

//! Convert command.
//!
//! Reads, optionally crops / resizes / applies a HALD CLUT, decides the
//! destination profile and converts.

use anyhow::{Context as _, Result};
use lumen_ops::convert::{self, ConvertOutput};
use lumen_ops::Context;
use std::time::Instant;
use tracing::{debug, info};

use crate::ConvertArgs;

/// Runs the convert command.
pub fn run(args: ConvertArgs, ctx: &Context) -> Result<()> {
    let overall = Instant::now();
    let mut params = super::conversion_params(&args.profile)?;
    params.format = args.format.clone();
    params.icc_out = args.icc_out.clone();
    params.quality = args.quality;
    params.rate = args.rate;
    params.hald = args.hald.clone();
    params.rect = args.rect.as_deref().map(super::parse_rect).transpose()?;
    params.resize = args.resize.as_deref().map(super::parse_resize).transpose()?;

    let format = convert::output_format(ctx, &args.output, params.format.as_deref())?;
    info!("lumen [convert]: {} -> {}", args.input.display(), args.output.display());

    let start = Instant::now();
    let (image, input_format) = super::load_image(ctx, &args.input, args.icc_in.as_deref())?;
    debug!(format = input_format, elapsed = start.elapsed().as_secs_f64(), "read");

    let image = convert::prepare_source(ctx, image, &params).context("Failed to prepare source image")?;
    let output = convert::convert(ctx, &image, &params, format).context("Conversion failed")?;
    if let ConvertOutput::Image(out) = &output {
        debug!(width = out.width(), height = out.height(), depth = out.depth(), "converted");
    }

    let start = Instant::now();
    output
        .write(ctx, &args.output, format, &params)
        .with_context(|| format!("Failed to save: {}", args.output.display()))?;
    debug!(elapsed = start.elapsed().as_secs_f64(), "written");

    info!("Conversion complete ({:.3} sec).", overall.elapsed().as_secs_f64());
    Ok(())
}

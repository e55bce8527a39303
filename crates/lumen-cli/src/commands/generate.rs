//! Generate command: solid color images and identity HALD CLUTs.

use anyhow::{Context as _, Result};
use lumen_ops::convert;
use lumen_ops::Context;

use crate::GenerateArgs;

/// Runs the generate command.
pub fn run(args: GenerateArgs, ctx: &Context) -> Result<()> {
    let mut params = super::conversion_params(&args.profile)?;
    params.format = args.format.clone();
    params.icc_out = args.icc_out.clone();
    params.quality = args.quality;

    let format = convert::output_format(ctx, &args.output, params.format.as_deref())?;
    tracing::info!("lumen [generate]: {} -> {}", args.image, args.output.display());

    let output = convert::generate(ctx, &args.image, &params, format)
        .with_context(|| format!("Failed to generate '{}'", args.image))?;
    output
        .write(ctx, &args.output, format, &params)
        .with_context(|| format!("Failed to save: {}", args.output.display()))
}

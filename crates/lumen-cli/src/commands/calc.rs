//! Calc command: one color through the conversion flow, printed as JSON.

use anyhow::{Context as _, Result};
use lumen_icc::Profile;
use lumen_ops::{report, Context, Image};

use crate::CalcArgs;

/// Runs the calc command.
pub fn run(args: CalcArgs, ctx: &Context) -> Result<()> {
    let params = super::conversion_params(&args.profile)?;
    let color = Image::parse_color(&args.color)?;
    let source = match &args.icc_in {
        Some(path) => Profile::from_file(path).with_context(|| format!("Failed to load profile: {}", path.display()))?,
        None => Profile::srgb()?,
    };

    let result = report::calc(ctx, color, &source, &params).context("Calculation failed")?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

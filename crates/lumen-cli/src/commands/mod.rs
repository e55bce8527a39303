//! CLI command implementations

pub mod calc;
pub mod convert;
pub mod generate;
pub mod identify;
pub mod modify;
pub mod report;

use anyhow::{Context as _, Result};
use lumen_core::{Rect, Tonemap};
use lumen_icc::Primaries;
use lumen_ops::{Context, ConversionParams, Image, ResizeSpec};
use std::path::Path;

use crate::ProfileArgs;

/// Load image from path, optionally replacing its profile
pub fn load_image(ctx: &Context, path: &Path, icc_in: Option<&Path>) -> Result<(Image, &'static str)> {
    Image::read(ctx, path, icc_in).with_context(|| format!("Failed to load: {}", path.display()))
}

/// Parses an `x,y,w,h` rectangle
pub fn parse_rect(s: &str) -> Result<Rect> {
    s.parse::<Rect>().with_context(|| format!("Invalid rect: {s}"))
}

/// Conversion parameters from the shared destination flags
pub fn conversion_params(args: &ProfileArgs) -> Result<ConversionParams> {
    let primaries = args
        .primaries
        .as_deref()
        .map(|p| p.parse::<Primaries>().with_context(|| format!("Invalid primaries: {p}")))
        .transpose()?;
    let tonemap = args
        .tonemap
        .parse::<Tonemap>()
        .with_context(|| format!("Invalid tonemap: {}", args.tonemap))?;

    Ok(ConversionParams {
        auto_grade: args.auto_grade,
        depth: args.depth,
        copyright: args.copyright.clone(),
        description: args.description.clone(),
        gamma: args.gamma,
        luminance: args.luminance,
        primaries,
        tonemap,
        ..Default::default()
    })
}

/// Parses a `w,h[,filter]` resize
pub fn parse_resize(s: &str) -> Result<ResizeSpec> {
    s.parse::<ResizeSpec>().with_context(|| format!("Invalid resize: {s}"))
}

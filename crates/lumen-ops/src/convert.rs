//! The conversion flow behind `convert` and `generate`.
//!
//! Source preparation (crop, resize, HALD) happens first, then the
//! destination profile is decided from the source profile and the
//! parameters, then pixels are converted. A new destination profile is only
//! synthesized when something about it is custom; otherwise the source
//! profile is reused as is.

use std::path::Path;

use lumen_core::DEFAULT_LUMINANCE;
use lumen_icc::{describe, Curve, CurveKind, Primaries, Profile};
use lumen_io::IoError;
use tracing::{debug, info};

use crate::dump::dump_profile;
use crate::{Context, ConversionParams, Grade, Image, OpsError, OpsResult};

/// Name of the profile-only pseudo format.
pub const ICC_FORMAT: &str = "icc";

/// Gamma of generated images when none is given.
pub const GENERATE_GAMMA: f32 = 2.2;

/// What a conversion produced.
#[derive(Debug)]
pub enum ConvertOutput {
    /// Converted pixels with their profile
    Image(Image),
    /// Only a profile (the `icc` output format)
    Profile(Profile),
}

impl ConvertOutput {
    /// Writes the result. Profiles go through the `icc` codec.
    pub fn write(&self, ctx: &Context, path: &Path, format: &str, params: &ConversionParams) -> OpsResult<()> {
        match self {
            ConvertOutput::Image(image) => {
                info!("Writing {} [q:{}, rate:{}]: {}", format, params.quality, params.rate, path.display());
                image.write(ctx, path, format, &params.write_params())
            }
            ConvertOutput::Profile(profile) => {
                info!("Writing ICC: {}", path.display());
                lumen_io::write_atomic(path, profile.to_bytes())?;
                Ok(())
            }
        }
    }
}

/// The destination side of a conversion.
#[derive(Debug)]
pub struct Destination {
    /// Profile to convert into
    pub profile: Profile,
    /// Output bits per channel
    pub depth: u32,
    /// Set when the luminance and gamma came from the grader
    pub grade: Option<Grade>,
}

/// Resolves the output format: explicit name first, then the path extension.
///
/// Formats that cannot be written are rejected here, before any work.
pub fn output_format(ctx: &Context, path: &Path, requested: Option<&str>) -> OpsResult<&'static str> {
    let codec = match requested {
        Some(name) => ctx
            .formats
            .get(name)
            .ok_or_else(|| IoError::UnsupportedFormat(format!("unknown output format '{name}'")))?,
        None => ctx
            .formats
            .by_extension(path)
            .ok_or_else(|| IoError::UnsupportedFormat(format!("unknown output file format: {}", path.display())))?,
    };
    if !codec.can_write() {
        return Err(IoError::UnsupportedOperation(format!("{} files cannot be written", codec.name())).into());
    }
    Ok(codec.name())
}

/// Crops, resizes and applies the HALD CLUT named in `params`, in that order.
pub fn prepare_source(ctx: &Context, mut image: Image, params: &ConversionParams) -> OpsResult<Image> {
    if let Some(rect) = params.rect {
        image = image.crop(rect)?;
        info!("Cropped to {}x{}", image.width(), image.height());
    }
    if let Some(resize) = params.resize {
        let (w, h) = resize.dims(image.width(), image.height())?;
        info!("Resizing {}x{} -> {}x{} ({})", image.width(), image.height(), w, h, resize.filter);
        image = image.resize(ctx, w, h, resize.filter)?;
    }
    if let Some(path) = &params.hald {
        info!("Applying HALD CLUT: {}", path.display());
        let (hald, _) = Image::read(ctx, path, None)?;
        image = image.apply_hald(ctx, &hald)?;
    }
    Ok(image)
}

/// Output depth for `format`, forced into what the codec can store.
fn output_depth(ctx: &Context, format: &str, requested: u32) -> OpsResult<u32> {
    let depth = ctx.formats.best_depth(format, requested)?;
    if depth != requested {
        info!("Forcing output to {depth}-bit ({format} limitations)");
    }
    Ok(depth)
}

fn synthesize(primaries: &Primaries, gamma: f32, luminance: u32, params: &ConversionParams) -> OpsResult<Profile> {
    if primaries.to_array().iter().any(|&v| v <= 0.0) {
        return Err(OpsError::InvalidParameter(
            "can't create destination profile, destination primaries are invalid".into(),
        ));
    }
    let curve = Curve::gamma(gamma);
    let description = params
        .description
        .clone()
        .unwrap_or_else(|| describe(primaries, &curve, luminance));
    info!("Creating new destination ICC profile: \"{description}\"");
    let mut profile = Profile::synthesize(primaries, &curve, Some(luminance), Some(&description))?;
    if let Some(copyright) = &params.copyright {
        info!("Setting copyright: \"{copyright}\"");
        profile.set_copyright(copyright)?;
    }
    Ok(profile)
}

/// Decides the destination profile and depth for converting `src` to `format`.
pub fn destination(ctx: &Context, src: &Image, params: &ConversionParams, format: &str) -> OpsResult<Destination> {
    let info = src.profile().query()?;
    let src_luminance = info.luminance;
    let primaries = params.primaries.unwrap_or(info.primaries);

    let requested = if params.depth == 0 { src.depth() } else { params.depth };
    let depth = if format == ICC_FORMAT { requested } else { output_depth(ctx, format, requested)? };

    let custom = params.primaries.is_some()
        || params.gamma > 0.0
        || params.auto_grade
        || (params.luminance != 0 && params.luminance != src_luminance)
        || params.description.is_some()
        || params.copyright.is_some();

    if !custom {
        info!("Using source ICC profile: \"{}\"", src.profile().description());
        return Ok(Destination { profile: src.profile().try_clone()?, depth, grade: None });
    }

    let mut luminance = if params.luminance != 0 { params.luminance } else { src_luminance };
    let mut gamma = if params.gamma > 0.0 {
        params.gamma
    } else if info.curve.kind == CurveKind::Gamma {
        info.curve.gamma
    } else {
        0.0
    };

    let mut grade = None;
    if params.auto_grade {
        let g = src.color_grade_for(ctx, &primaries, depth)?;
        info!("Auto-graded: {} nits, gamma {}", g.luminance, g.gamma);
        luminance = g.luminance;
        gamma = g.gamma;
        grade = Some(g);
    }

    if luminance == 0 || gamma <= 0.0 {
        return Err(OpsError::InvalidParameter(format!(
            "can't create destination profile, luminance({luminance}) and/or gamma({gamma}) values are invalid"
        )));
    }
    let profile = synthesize(&primaries, gamma, luminance, params)?;
    Ok(Destination { profile, depth, grade })
}

/// Replaces the embedded profile with the `icc_out` file, leaving pixels alone.
fn override_output_profile(image: &mut Image, params: &ConversionParams) -> OpsResult<()> {
    if let Some(path) = &params.icc_out {
        info!("Overriding output profile: {}", path.display());
        image.set_profile(Profile::from_file(path)?);
    }
    Ok(())
}

/// Runs the destination decision and the pixel conversion.
///
/// `src` is expected to be prepared already (see [`prepare_source`]).
pub fn convert(ctx: &Context, src: &Image, params: &ConversionParams, format: &str) -> OpsResult<ConvertOutput> {
    let dst = destination(ctx, src, params, format)?;
    if format == ICC_FORMAT {
        dump_profile(&dst.profile, false);
        return Ok(ConvertOutput::Profile(dst.profile));
    }
    let mut image = src.convert(ctx, dst.depth, &dst.profile, params.tonemap)?;
    override_output_profile(&mut image, params)?;
    Ok(ConvertOutput::Image(image))
}

/// Profile for generated images: BT.709, gamma 2.2, 100 nits unless overridden.
pub fn generate_profile(params: &ConversionParams) -> OpsResult<Profile> {
    let primaries = params.primaries.unwrap_or(Primaries::BT709);
    let gamma = if params.gamma > 0.0 { params.gamma } else { GENERATE_GAMMA };
    let luminance = if params.luminance != 0 { params.luminance } else { DEFAULT_LUMINANCE };
    synthesize(&primaries, gamma, luminance, params)
}

/// Builds an image from a description: `hald:N` or `WxH[,COLOR]`.
///
/// Colors are given in the encoded values of the generated profile.
pub fn generate(ctx: &Context, image_string: &str, params: &ConversionParams, format: &str) -> OpsResult<ConvertOutput> {
    let profile = generate_profile(params)?;
    if format == ICC_FORMAT {
        dump_profile(&profile, false);
        return Ok(ConvertOutput::Profile(profile));
    }
    let requested = if params.depth == 0 { 8 } else { params.depth };
    let depth = output_depth(ctx, format, requested)?;

    let spec = image_string.trim();
    let mut image = if let Some(level) = spec.strip_prefix("hald:") {
        let level: u32 = level
            .trim()
            .parse()
            .map_err(|_| OpsError::InvalidInput(format!("bad HALD level in '{spec}'")))?;
        Image::hald_identity(level, depth, Some(&profile))?
    } else {
        let (dims, color) = match spec.split_once(',') {
            Some((dims, color)) => (dims, Some(color)),
            None => (spec, None),
        };
        let (w, h) = dims
            .split_once('x')
            .and_then(|(w, h)| Some((w.trim().parse::<u32>().ok()?, h.trim().parse::<u32>().ok()?)))
            .ok_or_else(|| OpsError::InvalidInput(format!("bad image string '{spec}', expected WxH[,COLOR] or hald:N")))?;
        let mut image = Image::create(w, h, depth, Some(&profile))?;
        if let Some(color) = color {
            image.fill(Image::parse_color(color)?);
        }
        image
    };
    debug!(width = image.width(), height = image.height(), depth, "generated");
    override_output_profile(&mut image, params)?;
    Ok(ConvertOutput::Image(image))
}

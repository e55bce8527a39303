//! Serializable reports: `report`, `identify --json` and `calc`.

use std::path::Path;

use glam::Vec3;
use lumen_core::{map_ranges, Rect, Tonemap, DEFAULT_LUMINANCE};
use lumen_icc::{xyz_to_xy, CurveKind, Primaries, Profile, SpecialCurve};
use serde::Serialize;
use tracing::debug;

use crate::convert::{destination, ICC_FORMAT};
use crate::{Context, ConversionParams, Image, OpsResult, Transform};

/// An xy chromaticity.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Chromaticity {
    /// x
    pub x: f32,
    /// y
    pub y: f32,
}

impl From<[f32; 2]> for Chromaticity {
    fn from(v: [f32; 2]) -> Self {
        Self { x: v[0], y: v[1] }
    }
}

/// Primaries as named chromaticities.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct PrimariesReport {
    /// Red
    pub red: Chromaticity,
    /// Green
    pub green: Chromaticity,
    /// Blue
    pub blue: Chromaticity,
    /// White point
    pub white: Chromaticity,
}

impl From<&Primaries> for PrimariesReport {
    fn from(p: &Primaries) -> Self {
        Self {
            red: p.red.into(),
            green: p.green.into(),
            blue: p.blue.into(),
            white: p.white.into(),
        }
    }
}

/// Curve summary.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CurveReport {
    /// `gamma`, `complex` or `unknown`
    #[serde(rename = "type")]
    pub kind: String,
    /// Exponent or estimate
    pub gamma: f32,
    /// Curve output at 1.0
    pub implicit_scale: f32,
}

/// One tag directory entry.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TagReport {
    /// Four-character signature
    pub name: String,
    /// Size in bytes
    pub size: u32,
}

/// Everything `identify` knows about a profile.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileReport {
    /// Profile description
    pub description: String,
    /// Serialized size in bytes
    pub size: usize,
    /// Copyright text, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    /// Chromaticities
    pub primaries: PrimariesReport,
    /// Nominal max luminance in nits
    pub luminance: u32,
    /// Transfer curve
    pub curve: CurveReport,
    /// Luminance times implicit scale
    pub actual_luminance: f32,
    /// Analytic path usable
    pub ccmm: bool,
    /// Primaries when the curve is PQ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pq: Option<PrimariesReport>,
    /// SHA-256 of the profile bytes
    pub signature: String,
    /// Tag directory
    pub tags: Vec<TagReport>,
}

fn curve_name(kind: CurveKind) -> &'static str {
    match kind {
        CurveKind::Gamma => "gamma",
        CurveKind::Complex => "complex",
        CurveKind::Unknown => "unknown",
    }
}

impl ProfileReport {
    /// Queries `profile`; unqueryable profiles are an error.
    pub fn new(profile: &Profile) -> OpsResult<Self> {
        let info = profile.query()?;
        Ok(Self {
            description: profile.description(),
            size: profile.to_bytes().len(),
            copyright: profile.copyright(),
            primaries: (&info.primaries).into(),
            luminance: info.luminance,
            curve: CurveReport {
                kind: curve_name(info.curve.kind).to_string(),
                gamma: info.curve.gamma,
                implicit_scale: info.curve.implicit_scale,
            },
            actual_luminance: info.luminance as f32 * info.curve.implicit_scale,
            ccmm: profile.ccmm_compatible(),
            pq: profile.special_primaries(SpecialCurve::Pq).as_ref().map(Into::into),
            signature: profile.signature_hex(),
            tags: profile
                .tags()?
                .into_iter()
                .map(|t| TagReport { name: t.signature, size: t.size })
                .collect(),
        })
    }
}

/// One pixel of an identify rect.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PixelReport {
    /// Column
    pub x: u32,
    /// Row
    pub y: u32,
    /// Stored values
    pub rgba: [u16; 4],
}

/// `identify --json` output for an image.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IdentifyReport {
    /// Input path
    pub filename: String,
    /// Codec that read the file
    pub format: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Bits per channel
    pub depth: u32,
    /// Embedded (or assumed) profile
    pub profile: ProfileReport,
    /// Pixels of the requested rect
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pixels: Vec<PixelReport>,
}

impl IdentifyReport {
    /// Describes `image`, listing the pixels inside `rect` if given.
    pub fn new(path: &Path, format: &str, image: &Image, rect: Option<Rect>) -> OpsResult<Self> {
        let mut pixels = Vec::new();
        if let Some(rect) = rect {
            let r = rect.adjust(image.width(), image.height())?;
            for y in r.y as u32..(r.y + r.h) as u32 {
                for x in r.x as u32..(r.x + r.w) as u32 {
                    pixels.push(PixelReport { x, y, rgba: image.pixel(x, y)? });
                }
            }
        }
        Ok(Self {
            filename: path.display().to_string(),
            format: format.to_string(),
            width: image.width(),
            height: image.height(),
            depth: image.depth(),
            profile: ProfileReport::new(image.profile())?,
            pixels,
        })
    }
}

/// The profile part of an image report.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IccReport {
    /// Description, `Unknown` when empty
    pub description: String,
    /// rx, ry, gx, gy, bx, by, wx, wy
    pub primaries: [f32; 8],
    /// Max luminance in nits
    pub luminance: u32,
    /// Curve summary
    pub curve: String,
}

/// Per-pixel luminance statistics in nits.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LuminanceSummary {
    /// Darkest pixel
    pub min_nits: f32,
    /// Brightest pixel
    pub max_nits: f32,
    /// Mean over all pixels
    pub average_nits: f32,
    /// Fraction of pixels brighter than SDR reference white
    pub above_sdr: f32,
}

/// `report` output.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImageReport {
    /// Input path
    pub filename: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Profile summary
    pub icc: IccReport,
    /// Luminance statistics
    pub luminance: LuminanceSummary,
}

/// Luminance of every pixel of `image`, summarized.
pub fn luminance_summary(ctx: &Context, image: &Image) -> OpsResult<LuminanceSummary> {
    let info = image.profile().query()?;
    let nits_scale = info.luminance as f32;
    let xf = Transform::new(ctx, image.profile(), image.depth(), image.profile(), image.depth(), Tonemap::Off)?;
    let linear = xf.to_linear(image.samples())?;
    let to_xyz = info.primaries.rgb_to_xyz();
    let weights = Vec3::new(to_xyz.x_axis.y, to_xyz.y_axis.y, to_xyz.z_axis.y);
    let sdr = DEFAULT_LUMINANCE as f32;

    let pixel_count = linear.len() / 4;
    let parts = map_ranges(pixel_count, ctx.tasks(), |range| {
        let mut min = f32::INFINITY;
        let mut max = 0.0f32;
        let mut sum = 0.0f64;
        let mut above = 0usize;
        for px in linear[range.start * 4..range.end * 4].chunks_exact(4) {
            let nits = weights.dot(Vec3::new(px[0], px[1], px[2])).max(0.0) * nits_scale;
            min = min.min(nits);
            max = max.max(nits);
            sum += nits as f64;
            if nits > sdr {
                above += 1;
            }
        }
        (min, max, sum, above)
    });
    let (min, max, sum, above) = parts
        .into_iter()
        .fold((f32::INFINITY, 0.0f32, 0.0f64, 0usize), |(a, b, c, d), (e, f, g, h)| {
            (a.min(e), b.max(f), c + g, d + h)
        });
    let n = pixel_count.max(1);
    Ok(LuminanceSummary {
        min_nits: if min.is_finite() { min } else { 0.0 },
        max_nits: max,
        average_nits: (sum / n as f64) as f32,
        above_sdr: above as f32 / n as f32,
    })
}

impl ImageReport {
    /// Builds the report for `image` read from `path`.
    pub fn new(ctx: &Context, path: &Path, image: &Image) -> OpsResult<Self> {
        let info = image.profile().query()?;
        let description = image.profile().description();
        let luminance = luminance_summary(ctx, image)?;
        debug!(?luminance, "luminance summary");
        Ok(Self {
            filename: path.display().to_string(),
            width: image.width(),
            height: image.height(),
            icc: IccReport {
                description: if description.is_empty() { "Unknown".to_string() } else { description },
                primaries: info.primaries.to_array(),
                luminance: info.luminance,
                curve: info.curve.to_string(),
            },
            luminance,
        })
    }
}

/// Serializes `value` as pretty JSON and writes it atomically.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> OpsResult<()> {
    let text = serde_json::to_string_pretty(value)?;
    lumen_io::write_atomic(path, text.as_bytes())?;
    Ok(())
}

/// One side of a `calc` conversion.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalcSide {
    /// Profile description
    pub profile: String,
    /// Bits per channel
    pub depth: u32,
    /// Stored values
    pub pixel: [u16; 4],
    /// Stored values over the depth maximum
    pub unorm: [f32; 4],
}

/// `calc` output.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalcReport {
    /// The color as stored in the source
    pub input: CalcSide,
    /// Linear RGB at the source primaries, 1.0 = source luminance
    pub linear: [f32; 3],
    /// Absolute XYZ in nits
    #[serde(rename = "XYZ")]
    pub xyz: [f32; 3],
    /// Chromaticity plus Y in nits
    #[serde(rename = "xyY")]
    pub xy_y: [f32; 3],
    /// The converted color
    pub output: CalcSide,
}

fn side(image: &Image) -> CalcSide {
    let pixel = image.raw().pixel(0, 0);
    let max = lumen_core::max_value(image.depth()) as f32;
    CalcSide {
        profile: image.profile().description(),
        depth: image.depth(),
        pixel,
        unorm: pixel.map(|v| v as f32 / max),
    }
}

/// Pushes one color through the conversion flow.
///
/// `color` is in encoded values of `src_profile`. The destination follows
/// the same rules as `convert`; output depth defaults to 16 bits.
pub fn calc(ctx: &Context, color: [f32; 4], src_profile: &Profile, params: &ConversionParams) -> OpsResult<CalcReport> {
    let mut src = Image::create(1, 1, 16, Some(src_profile))?;
    src.fill(color);

    let info = src_profile.query()?;
    let xf = Transform::new(ctx, src_profile, 16, src_profile, 16, Tonemap::Off)?;
    let linear = xf.to_linear(src.samples())?;
    let rgb = Vec3::new(linear[0], linear[1], linear[2]);
    let xyz = info.primaries.rgb_to_xyz() * rgb * info.luminance as f32;
    let xy = xyz_to_xy(xyz).unwrap_or(info.primaries.white);

    let dst = destination(ctx, &src, params, ICC_FORMAT)?;
    let out = src.convert(ctx, dst.depth, &dst.profile, params.tonemap)?;
    Ok(CalcReport {
        input: side(&src),
        linear: rgb.to_array(),
        xyz: xyz.to_array(),
        xy_y: [xy[0], xy[1], xyz.y],
        output: side(&out),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use lumen_icc::{Curve, StockProfile};

    #[test]
    fn profile_report_fields() {
        let p = StockProfile::P3.to_profile().unwrap();
        let r = ProfileReport::new(&p).unwrap();
        assert_eq!(r.curve.kind, "gamma");
        assert_abs_diff_eq!(r.primaries.red.x, 0.680, epsilon = 1e-3);
        assert!(r.ccmm);
        assert!(r.pq.is_none());
        assert!(r.tags.iter().any(|t| t.name == "rXYZ"));

        let json = serde_json::to_value(&r).unwrap();
        assert!(json.get("implicitScale").is_none());
        assert!(json["curve"].get("implicitScale").is_some());
        assert!(json.get("actualLuminance").is_some());
    }

    #[test]
    fn pq_profile_reports_pq() {
        let p = StockProfile::Bt2020Pq.to_profile().unwrap();
        let r = ProfileReport::new(&p).unwrap();
        assert_eq!(r.curve.kind, "complex");
        assert!(r.pq.is_some());
    }

    #[test]
    fn luminance_of_white_and_black() {
        let ctx = Context::new().with_jobs(2);
        let profile = Profile::synthesize(&Primaries::BT709, &Curve::gamma(2.2), Some(300), None).unwrap();
        let mut image = Image::create(2, 1, 8, Some(&profile)).unwrap();
        image.set_pixel(1, 0, [0, 0, 0, 255]).unwrap();
        let s = luminance_summary(&ctx, &image).unwrap();
        assert_abs_diff_eq!(s.max_nits, 300.0, epsilon = 1.0);
        assert_abs_diff_eq!(s.min_nits, 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(s.average_nits, 150.0, epsilon = 1.0);
        assert_abs_diff_eq!(s.above_sdr, 0.5);
    }

    #[test]
    fn image_report_json_shape() {
        let ctx = Context::new();
        let image = Image::create(3, 2, 8, None).unwrap();
        let r = ImageReport::new(&ctx, Path::new("in.png"), &image).unwrap();
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["width"], 3);
        assert_eq!(json["icc"]["primaries"].as_array().unwrap().len(), 8);
        assert_eq!(json["icc"]["luminance"], DEFAULT_LUMINANCE);
        assert!(json["luminance"].get("averageNits").is_some());
    }

    #[test]
    fn json_written_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let image = Image::create(1, 1, 8, None).unwrap();
        let report = IdentifyReport::new(Path::new("x.png"), "png", &image, None).unwrap();
        write_json(&path, &report).unwrap();
        let back: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back["format"], "png");
        assert!(back.get("pixels").is_none());
    }

    #[test]
    fn identify_lists_rect_pixels() {
        let image = Image::create(4, 4, 8, None).unwrap();
        let r = IdentifyReport::new(Path::new("a.png"), "png", &image, Some(Rect::new(3, 3, 5, 5))).unwrap();
        assert_eq!(r.pixels.len(), 1);
        assert_eq!(r.pixels[0].rgba, [255; 4]);
    }

    #[test]
    fn calc_white_in_srgb() {
        let ctx = Context::new();
        let srgb = Profile::srgb().unwrap();
        let r = calc(&ctx, [1.0, 1.0, 1.0, 1.0], &srgb, &ConversionParams::default()).unwrap();
        assert_abs_diff_eq!(r.xy_y[0], 0.3127, epsilon = 2e-3);
        assert_abs_diff_eq!(r.xy_y[1], 0.3290, epsilon = 2e-3);
        assert_abs_diff_eq!(r.xy_y[2], 100.0, epsilon = 0.5);
        assert_eq!(r.output.depth, 16);
        assert!(r.output.pixel.iter().all(|&v| v >= 65534), "{:?}", r.output.pixel);
    }
}

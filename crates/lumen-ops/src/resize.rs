//! Image resampling.
//!
//! [`Filter::Nearest`] copies native samples. Every other filter runs a
//! separable two-pass resample on linear-light floats: horizontal into a
//! temporary buffer, then vertical. Kernels are the usual
//! Mitchell-Netravali family:
//!
//! | Filter | Support | B, C |
//! |--------|---------|------|
//! | Box | 0.5 | - |
//! | Triangle | 1 | - |
//! | CubicBSpline | 2 | 1, 0 |
//! | CatmullRom | 2 | 0, 0.5 |
//! | Mitchell | 2 | 1/3, 1/3 |
//!
//! [`Filter::Auto`] picks Catmull-Rom on axes that grow and Mitchell on
//! axes that shrink.

use std::fmt;
use std::str::FromStr;

use lumen_core::{from_linear_float, run_ranges_in_place, to_linear_float, try_alloc, RawImage, Tonemap};
use tracing::{debug, warn};

use crate::{Context, Image, OpsError, OpsResult, Transform};

/// Resampling filter for resize operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    /// Catmull-Rom when upsampling, Mitchell when downsampling.
    #[default]
    Auto,
    /// Nearest sample, no linearization.
    Nearest,
    /// Box.
    Box,
    /// Tent.
    Triangle,
    /// Cubic B-spline (blurry, no ringing).
    CubicBSpline,
    /// Catmull-Rom (sharp).
    CatmullRom,
    /// Mitchell-Netravali, B = C = 1/3.
    Mitchell,
}

impl Filter {
    /// Support radius of the kernel at scale 1.
    #[inline]
    pub fn support(&self) -> f32 {
        match self {
            Filter::Nearest | Filter::Box => 0.5,
            Filter::Triangle => 1.0,
            Filter::Auto | Filter::CubicBSpline | Filter::CatmullRom | Filter::Mitchell => 2.0,
        }
    }

    /// Kernel value at distance `x`.
    #[inline]
    pub fn weight(&self, x: f32) -> f32 {
        let ax = x.abs();
        match self {
            Filter::Nearest | Filter::Box => {
                if ax <= 0.5 { 1.0 } else { 0.0 }
            }
            Filter::Triangle => (1.0 - ax).max(0.0),
            Filter::CubicBSpline => {
                if ax < 1.0 {
                    (4.0 + ax * ax * (3.0 * ax - 6.0)) / 6.0
                } else if ax < 2.0 {
                    (8.0 + ax * (-12.0 + ax * (6.0 - ax))) / 6.0
                } else {
                    0.0
                }
            }
            Filter::CatmullRom => {
                if ax < 1.0 {
                    1.0 - ax * ax * (2.5 - 1.5 * ax)
                } else if ax < 2.0 {
                    2.0 - ax * (4.0 + ax * (0.5 * ax - 2.5))
                } else {
                    0.0
                }
            }
            Filter::Auto | Filter::Mitchell => {
                if ax < 1.0 {
                    (16.0 + ax * ax * (21.0 * ax - 36.0)) / 18.0
                } else if ax < 2.0 {
                    (32.0 + ax * (-60.0 + ax * (36.0 - 7.0 * ax))) / 18.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Concrete filter for an axis going from `src` to `dst` samples.
    pub fn resolve(self, src: u32, dst: u32) -> Filter {
        match self {
            Filter::Auto if dst > src => Filter::CatmullRom,
            Filter::Auto => Filter::Mitchell,
            other => other,
        }
    }

    /// Name accepted by [`FromStr`].
    pub fn name(&self) -> &'static str {
        match self {
            Filter::Auto => "auto",
            Filter::Nearest => "nearest",
            Filter::Box => "box",
            Filter::Triangle => "triangle",
            Filter::CubicBSpline => "cubic",
            Filter::CatmullRom => "catmullrom",
            Filter::Mitchell => "mitchell",
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Filter {
    type Err = OpsError;

    fn from_str(s: &str) -> OpsResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Filter::Auto),
            "nearest" | "point" => Ok(Filter::Nearest),
            "box" => Ok(Filter::Box),
            "triangle" | "tent" => Ok(Filter::Triangle),
            "cubic" | "bspline" => Ok(Filter::CubicBSpline),
            "catmullrom" | "catrom" => Ok(Filter::CatmullRom),
            "mitchell" => Ok(Filter::Mitchell),
            other => Err(OpsError::InvalidParameter(format!("unknown resize filter '{other}'"))),
        }
    }
}

/// Normalized taps for one output coordinate.
struct Taps {
    start: usize,
    weights: Vec<f32>,
}

fn taps(src_len: usize, dst_len: usize, filter: Filter) -> Vec<Taps> {
    let scale = src_len as f32 / dst_len as f32;
    let stretch = scale.max(1.0);
    let support = filter.support() * stretch;

    (0..dst_len)
        .map(|x| {
            let center = (x as f32 + 0.5) * scale - 0.5;
            let left = ((center - support).floor().max(0.0)) as usize;
            let right = ((center + support).ceil() as usize).min(src_len - 1);
            let mut weights: Vec<f32> = (left..=right)
                .map(|sx| filter.weight((sx as f32 - center) / stretch))
                .collect();
            let sum: f32 = weights.iter().sum();
            if sum.abs() > 1e-8 {
                weights.iter_mut().for_each(|w| *w /= sum);
            } else {
                // Degenerate window: fall back to the closest sample
                let nearest = (center.round().max(0.0) as usize).clamp(left, right);
                weights.iter_mut().for_each(|w| *w = 0.0);
                weights[nearest - left] = 1.0;
            }
            Taps { start: left, weights }
        })
        .collect()
}

/// Resizes RGBA float data with a two-pass separable filter.
///
/// ```rust
/// use lumen_ops::resize::{resize_f32, Filter};
///
/// let src = vec![0.5f32; 16 * 16 * 4];
/// let dst = resize_f32(&src, 16, 16, 32, 8, Filter::Mitchell, 2).unwrap();
/// assert_eq!(dst.len(), 32 * 8 * 4);
/// assert!(dst.iter().all(|v| (v - 0.5).abs() < 1e-5));
/// ```
pub fn resize_f32(
    src: &[f32],
    src_w: u32,
    src_h: u32,
    dst_w: u32,
    dst_h: u32,
    filter: Filter,
    tasks: usize,
) -> OpsResult<Vec<f32>> {
    let (sw, sh, dw, dh) = (src_w as usize, src_h as usize, dst_w as usize, dst_h as usize);
    if src.len() != sw * sh * 4 {
        return Err(lumen_core::Error::SizeMismatch { expected: sw * sh * 4, actual: src.len() }.into());
    }
    if dw == 0 || dh == 0 || sw == 0 || sh == 0 {
        return Err(lumen_core::Error::InvalidDimensions { width: dst_w, height: dst_h }.into());
    }

    let h_taps = taps(sw, dw, filter.resolve(src_w, dst_w));
    let v_taps = taps(sh, dh, filter.resolve(src_h, dst_h));

    // Horizontal: sh rows of dw pixels
    let mut temp = try_alloc(dw * sh * 4, 0.0f32)?;
    run_ranges_in_place(tasks, &mut temp, dw * 4, |rows, out| {
        for (row_off, y) in rows.enumerate() {
            let src_row = &src[y * sw * 4..(y + 1) * sw * 4];
            let dst_row = &mut out[row_off * dw * 4..(row_off + 1) * dw * 4];
            for (x, t) in h_taps.iter().enumerate() {
                let mut acc = [0.0f32; 4];
                for (k, w) in t.weights.iter().enumerate() {
                    let p = &src_row[(t.start + k) * 4..(t.start + k) * 4 + 4];
                    for c in 0..4 {
                        acc[c] += p[c] * w;
                    }
                }
                dst_row[x * 4..x * 4 + 4].copy_from_slice(&acc);
            }
        }
        Ok::<(), OpsError>(())
    })?;

    // Vertical: dh rows of dw pixels
    let mut out = try_alloc(dw * dh * 4, 0.0f32)?;
    run_ranges_in_place(tasks, &mut out, dw * 4, |rows, chunk| {
        for (row_off, y) in rows.enumerate() {
            let t = &v_taps[y];
            let dst_row = &mut chunk[row_off * dw * 4..(row_off + 1) * dw * 4];
            for (k, w) in t.weights.iter().enumerate() {
                let src_row = &temp[(t.start + k) * dw * 4..(t.start + k + 1) * dw * 4];
                for (d, s) in dst_row.iter_mut().zip(src_row) {
                    *d += s * w;
                }
            }
        }
        Ok::<(), OpsError>(())
    })?;
    Ok(out)
}

/// Nearest-sample resize in the native sample domain.
fn resize_nearest(src: &RawImage, width: u32, height: u32) -> OpsResult<RawImage> {
    let mut out = RawImage::new(width, height, src.depth)?;
    let sx = src.width as f64 / width as f64;
    let sy = src.height as f64 / height as f64;
    for y in 0..height {
        let yy = (((y as f64 + 0.5) * sy) as u32).min(src.height - 1);
        for x in 0..width {
            let xx = (((x as f64 + 0.5) * sx) as u32).min(src.width - 1);
            out.set_pixel(x, y, src.pixel(xx, yy));
        }
    }
    Ok(out)
}

pub(crate) fn resize_image(ctx: &Context, image: &Image, width: u32, height: u32, filter: Filter) -> OpsResult<Image> {
    debug!(from_w = image.width(), from_h = image.height(), width, height, %filter, "resizing");
    if filter == Filter::Nearest {
        let raw = resize_nearest(image.raw(), width, height)?;
        return Image::from_parts(raw, image.profile().try_clone()?);
    }

    let depth = image.depth();
    let linearized = Transform::new(ctx, image.profile(), depth, image.profile(), depth, Tonemap::Off)
        .and_then(|xf| xf.to_linear(image.samples()).map(|linear| (xf, linear)));
    let samples = match linearized {
        Ok((xf, linear)) => {
            let resized = resize_f32(&linear, image.width(), image.height(), width, height, filter, ctx.tasks())?;
            xf.from_linear_new(&resized)?
        }
        Err(e) => {
            warn!(error = %e, "cannot linearize, resizing encoded values");
            let unorm = to_linear_float(image.samples(), depth)?;
            let resized = resize_f32(&unorm, image.width(), image.height(), width, height, filter, ctx.tasks())?;
            from_linear_float(&resized, depth)?
        }
    };
    let raw = RawImage::from_samples(width, height, depth, samples)?;
    Image::from_parts(raw, image.profile().try_clone()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use lumen_icc::Profile;

    #[test]
    fn kernel_values() {
        assert_abs_diff_eq!(Filter::Mitchell.weight(0.0), 16.0 / 18.0);
        assert_abs_diff_eq!(Filter::CatmullRom.weight(0.0), 1.0);
        assert_abs_diff_eq!(Filter::CatmullRom.weight(1.0), 0.0);
        assert_abs_diff_eq!(Filter::CubicBSpline.weight(0.0), 4.0 / 6.0);
        assert_abs_diff_eq!(Filter::CubicBSpline.weight(1.0), 1.0 / 6.0);
        assert_abs_diff_eq!(Filter::Triangle.weight(0.5), 0.5);
        assert_eq!(Filter::Box.weight(0.6), 0.0);
        for f in [Filter::CubicBSpline, Filter::CatmullRom, Filter::Mitchell] {
            assert_abs_diff_eq!(f.weight(2.0), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn auto_resolution() {
        assert_eq!(Filter::Auto.resolve(10, 20), Filter::CatmullRom);
        assert_eq!(Filter::Auto.resolve(20, 10), Filter::Mitchell);
        assert_eq!(Filter::Box.resolve(20, 10), Filter::Box);
    }

    #[test]
    fn parse_names() {
        for f in [
            Filter::Auto,
            Filter::Nearest,
            Filter::Box,
            Filter::Triangle,
            Filter::CubicBSpline,
            Filter::CatmullRom,
            Filter::Mitchell,
        ] {
            assert_eq!(f.name().parse::<Filter>().unwrap(), f);
        }
        assert!("lanczos".parse::<Filter>().is_err());
    }

    #[test]
    fn same_size_catmull_rom_is_identity() {
        let src: Vec<f32> = (0..5 * 3 * 4).map(|i| (i % 7) as f32 / 7.0).collect();
        let dst = resize_f32(&src, 5, 3, 5, 3, Filter::CatmullRom, 3).unwrap();
        for (a, b) in src.iter().zip(&dst) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-5);
        }
    }

    #[test]
    fn box_halving_averages() {
        // one row: 0, 1, 0, 1 -> 0.5, 0.5
        let src: Vec<f32> = [0.0f32, 1.0, 0.0, 1.0].iter().flat_map(|&v| [v, v, v, 1.0]).collect();
        let dst = resize_f32(&src, 4, 1, 2, 1, Filter::Box, 1).unwrap();
        assert_abs_diff_eq!(dst[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(dst[4], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(dst[3], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn jobs_do_not_change_result() {
        let src: Vec<f32> = (0..13 * 9 * 4).map(|i| ((i * 31) % 17) as f32 / 17.0).collect();
        let a = resize_f32(&src, 13, 9, 29, 4, Filter::Auto, 1).unwrap();
        let b = resize_f32(&src, 13, 9, 29, 4, Filter::Auto, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_bad_sizes() {
        let src = vec![0.0f32; 4 * 4];
        assert!(resize_f32(&src, 2, 2, 0, 2, Filter::Box, 1).is_err());
        assert!(resize_f32(&src, 3, 2, 2, 2, Filter::Box, 1).is_err());
    }

    /// sRGB with the colorant tags renamed away, so it cannot be queried.
    fn profile_without_colorants() -> Profile {
        let mut bytes = Profile::srgb().unwrap().to_bytes().to_vec();
        let count = u32::from_be_bytes(bytes[128..132].try_into().unwrap()) as usize;
        for i in 0..count {
            let at = 132 + i * 12;
            let renamed: Option<&[u8; 4]> = match &bytes[at..at + 4] {
                b"rXYZ" => Some(b"zzzr"),
                b"gXYZ" => Some(b"zzzg"),
                b"bXYZ" => Some(b"zzzb"),
                _ => None,
            };
            if let Some(sig) = renamed {
                bytes[at..at + 4].copy_from_slice(sig);
            }
        }
        Profile::parse(&bytes).unwrap()
    }

    #[test]
    fn falls_back_to_encoded_values() {
        let ctx = Context::new().with_jobs(2);
        let profile = profile_without_colorants();
        assert!(profile.query().is_err());

        let mut image = Image::create(6, 4, 8, Some(&profile)).unwrap();
        image.fill([0.25, 0.5, 0.75, 1.0]);
        let before = image.pixel(0, 0).unwrap();
        let out = resize_image(&ctx, &image, 3, 2, Filter::Auto).unwrap();
        assert_eq!((out.width(), out.height()), (3, 2));
        for y in 0..2 {
            for x in 0..3 {
                let px = out.pixel(x, y).unwrap();
                for c in 0..4 {
                    assert!((px[c] as i32 - before[c] as i32).abs() <= 1, "{px:?} vs {before:?}");
                }
            }
        }
        assert_eq!(out.profile().signature(), profile.signature());
    }

    #[test]
    fn nearest_same_size_is_exact() {
        let mut raw = RawImage::new(3, 2, 8).unwrap();
        raw.set_pixel(2, 1, [1, 2, 3, 4]);
        assert_eq!(resize_nearest(&raw, 3, 2).unwrap(), raw);
        let up = resize_nearest(&raw, 6, 4).unwrap();
        assert_eq!(up.pixel(5, 3), [1, 2, 3, 4]);
        assert_eq!(up.pixel(4, 2), [1, 2, 3, 4]);
    }
}

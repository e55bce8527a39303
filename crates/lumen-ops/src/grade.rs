//! Automatic choice of destination luminance and gamma.
//!
//! The grader looks for the `(L, G)` pair that stores the image in a given
//! bit depth with the least damage. Damage is measured on a fixed sample of
//! pixels as the absolute round-trip error in nits, plus a weighted penalty
//! for anything clipped above `L`.
//!
//! Search:
//! 1. peak and darkest non-zero channel values over the whole image;
//! 2. `L` is bisected between a floor and the peak luminance, comparing the
//!    cost at `L` and `L + 1`;
//! 3. for each `L` the gamma is the cheapest on a 0.1 grid from the lowest
//!    gamma that keeps the darkest value above the first code value, refined
//!    on a 0.01 grid.
//!
//! Statistics are reduced with `max`/`min` and costs are summed over fixed
//! blocks in order, so the result never depends on the task count.

use lumen_core::{map_ranges, max_value, Error as CoreError, Tonemap};
use lumen_icc::{Curve, Primaries, Profile};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::{Context, Image, OpsResult, Transform};

/// Pixels sampled for the cost function.
const MAX_SAMPLES: usize = 16 * 1024;
/// Channel values per cost block.
const BLOCK: usize = 4096;
/// Cost of one clipped nit relative to one nit of quantization error.
const CLIP_WEIGHT: f64 = 4.0;
/// Bisection steps on luminance.
const MAX_ITERATIONS: usize = 8;
/// Lowest luminance considered, as a fraction of the peak.
const FLOOR_RATIO: f64 = 0.1;
/// Gamma search range.
const GAMMA_MIN: f32 = 1.0;
const GAMMA_MAX: f32 = 5.0;

/// A chosen destination luminance and gamma.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grade {
    /// Destination luminance in nits.
    pub luminance: u32,
    /// Destination gamma, rounded to 0.01.
    pub gamma: f32,
}

struct Sampled {
    nits: Vec<f64>,
    peak_nits: f64,
    min_nits: f64,
    max_code: f64,
}

impl Sampled {
    /// Total damage for luminance `l` and gamma `g`.
    fn cost(&self, l: f64, g: f64) -> f64 {
        let inv = 1.0 / g;
        let blocks: Vec<f64> = self
            .nits
            .par_chunks(BLOCK)
            .map(|block| {
                let mut sum = 0.0;
                for &n in block {
                    let x = n / l;
                    let clipped = (x - 1.0).max(0.0) * l;
                    let code = (x.min(1.0).powf(inv) * self.max_code).round();
                    let decoded = (code / self.max_code).powf(g) * l;
                    sum += (decoded - n.min(l)).abs() + CLIP_WEIGHT * clipped;
                }
                sum
            })
            .collect();
        blocks.iter().sum()
    }

    /// Smallest gamma that keeps the darkest value at code 1 or above.
    fn gamma_floor(&self, l: f64) -> f32 {
        let d = self.min_nits / l;
        if d >= 1.0 {
            return GAMMA_MIN;
        }
        let g = d.ln() / (1.0 / self.max_code).ln();
        (g as f32).clamp(GAMMA_MIN, GAMMA_MAX)
    }

    /// Cheapest gamma for luminance `l`, with its cost.
    fn best_gamma(&self, l: f64) -> (f32, f64) {
        let floor = self.gamma_floor(l);
        let mut best = (floor, self.cost(l, floor as f64));

        let mut step = 1;
        loop {
            let g = floor + 0.1 * step as f32;
            if g > GAMMA_MAX + 1e-4 {
                break;
            }
            let c = self.cost(l, g as f64);
            if c < best.1 {
                best = (g, c);
            }
            step += 1;
        }

        let coarse = best.0;
        for i in -10..=10 {
            let g = coarse + 0.01 * i as f32;
            if g < floor || g > GAMMA_MAX {
                continue;
            }
            let c = self.cost(l, g as f64);
            if c < best.1 {
                best = (g, c);
            }
        }
        ((best.0 * 100.0).round() / 100.0, best.1)
    }
}

/// Grades a linear RGBA float buffer (1.0 = `src_luminance` nits) for `depth` bits.
///
/// Fails with a degenerate-image error when the buffer is empty or black.
pub fn color_grade(tasks: usize, linear: &[f32], src_luminance: u32, depth: u32) -> OpsResult<Grade> {
    let pixel_count = linear.len() / 4;
    if pixel_count == 0 {
        return Err(CoreError::DegenerateImage("no pixels to grade".into()).into());
    }

    let stats = map_ranges(pixel_count, tasks, |range| {
        let mut peak = 0.0f32;
        let mut darkest = f32::INFINITY;
        for px in linear[range.start * 4..range.end * 4].chunks_exact(4) {
            for &v in &px[..3] {
                peak = peak.max(v);
                if v > 0.0 {
                    darkest = darkest.min(v);
                }
            }
        }
        (peak, darkest)
    });
    let (peak, darkest) = stats
        .into_iter()
        .fold((0.0f32, f32::INFINITY), |(p, d), (tp, td)| (p.max(tp), d.min(td)));
    if peak <= 0.0 {
        return Err(CoreError::DegenerateImage("image is entirely black".into()).into());
    }

    let lum = src_luminance as f64;
    let stride = pixel_count.div_ceil(MAX_SAMPLES);
    let nits: Vec<f64> = linear
        .chunks_exact(4)
        .step_by(stride)
        .flat_map(|px| [px[0], px[1], px[2]])
        .map(|v| v.max(0.0) as f64 * lum)
        .collect();
    let sampled = Sampled {
        nits,
        peak_nits: peak as f64 * lum,
        min_nits: darkest as f64 * lum,
        max_code: max_value(depth) as f64,
    };

    let mut hi = sampled.peak_nits.ceil().max(1.0) as u32;
    let mut lo = ((hi as f64 * FLOOR_RATIO).floor() as u32).max(1);
    debug!(peak = sampled.peak_nits, darkest = sampled.min_nits, lo, hi, samples = sampled.nits.len(), "grading");

    for _ in 0..MAX_ITERATIONS {
        if lo >= hi {
            break;
        }
        let mid = lo + (hi - lo) / 2;
        let (_, here) = sampled.best_gamma(mid as f64);
        let (_, next) = sampled.best_gamma((mid + 1) as f64);
        if here <= next {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }

    let luminance = lo;
    let (gamma, cost) = sampled.best_gamma(luminance as f64);
    info!(luminance, gamma, cost, "color grade");
    Ok(Grade { luminance, gamma })
}

/// Grades `image` for `depth` bits once converted to `primaries`.
///
/// The pixels are linearized straight into the destination gamut, so
/// colors outside it count toward the peak.
pub(crate) fn grade_image(ctx: &Context, image: &Image, primaries: &Primaries, depth: u32) -> OpsResult<Grade> {
    let lum = image.profile().query()?.luminance;
    let target = Profile::synthesize(primaries, &Curve::LINEAR, Some(lum), Some("Lumen grading intermediate"))?;
    let xf = Transform::new(ctx, image.profile(), image.depth(), &target, 16, Tonemap::Off)?;
    let linear = xf.to_linear(image.samples())?;
    color_grade(ctx.tasks(), &linear, lum, depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::ErrorKind;

    fn ramp(n: usize, peak: f32) -> Vec<f32> {
        (0..n)
            .flat_map(|i| {
                let v = peak * (i as f32 + 1.0) / n as f32;
                [v, v * 0.5, v * 0.25, 1.0]
            })
            .collect()
    }

    #[test]
    fn black_is_degenerate() {
        let black = vec![0.0f32; 4 * 100];
        let err = color_grade(4, &black, 100, 8).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DegenerateImage);

        let err = color_grade(4, &[], 100, 8).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DegenerateImage);
    }

    #[test]
    fn alpha_alone_is_still_black() {
        let buf: Vec<f32> = (0..50).flat_map(|_| [0.0, 0.0, 0.0, 1.0]).collect();
        assert!(color_grade(1, &buf, 100, 16).is_err());
    }

    #[test]
    fn deterministic_across_jobs() {
        let buf = ramp(20_000, 0.8);
        let first = color_grade(1, &buf, 1000, 8).unwrap();
        for jobs in [1, 4, 16] {
            for _ in 0..3 {
                assert_eq!(color_grade(jobs, &buf, 1000, 8).unwrap(), first);
            }
        }
    }

    #[test]
    fn result_is_in_range() {
        let buf = ramp(1000, 1.0);
        let grade = color_grade(2, &buf, 300, 10).unwrap();
        assert!(grade.luminance >= 30 && grade.luminance <= 300, "{grade:?}");
        assert!(grade.gamma >= GAMMA_MIN && grade.gamma <= GAMMA_MAX, "{grade:?}");
    }

    /// BT.2020 1000 nit image: saturated reds next to a dim neutral ramp.
    fn wide_gamut_image() -> Image {
        let profile = Profile::synthesize(&Primaries::BT2020, &Curve::gamma(2.4), Some(1000), None).unwrap();
        let mut image = Image::create(64, 2, 16, Some(&profile)).unwrap();
        for x in 0..64u32 {
            let v = (x * 1024) as u16;
            image.set_pixel(x, 0, [v.max(1024), 0, 0, 65535]).unwrap();
            image.set_pixel(x, 1, [v / 4, v / 4, v / 4, 65535]).unwrap();
        }
        image
    }

    #[test]
    fn grades_in_destination_gamut() {
        let ctx = Context::new().with_jobs(3);
        let image = wide_gamut_image();
        let own_primaries = image.profile().query().unwrap().primaries;
        let own = grade_image(&ctx, &image, &own_primaries, 16).unwrap();
        assert_eq!(image.color_grade(&ctx, 16).unwrap(), own);

        // BT.2020 red lands outside BT.709, so the peak and the grade move up
        let narrow = grade_image(&ctx, &image, &Primaries::BT709, 16).unwrap();
        assert_ne!(narrow, own);
        assert!(narrow.luminance > own.luminance, "{narrow:?} vs {own:?}");
    }

    #[test]
    fn gamma_floor_keeps_darkest_visible() {
        let s = Sampled { nits: vec![0.01, 100.0], peak_nits: 100.0, min_nits: 0.01, max_code: 255.0 };
        let g = s.gamma_floor(100.0) as f64;
        let code = ((0.01f64 / 100.0).powf(1.0 / g) * 255.0).round();
        assert!(code >= 1.0, "gamma {g} gives code {code}");
    }
}

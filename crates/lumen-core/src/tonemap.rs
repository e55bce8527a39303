//! Luminance scaling and the tonemap curve.
//!
//! A transform between profiles with different reference luminances
//! multiplies every linear channel by `scale = src_luminance / dst_luminance`.
//! When the destination has less headroom (`scale > 1`) and tonemapping is
//! enabled, values are rolled off by a soft shoulder instead of clipped:
//!
//! ```text
//! x = v * scale
//! f(x) = x                                  x <= knee
//! f(x) = knee + (1 - knee) * u / (1 + u)    x >  knee,  u = (x - knee) / (1 - knee)
//! knee = max(1 / scale, KNEE_FLOOR)
//! ```
//!
//! `f(0) = 0`, `f` is continuous with a continuous slope at the knee, is
//! strictly increasing above it and approaches `1.0` as `x -> inf`, so the
//! destination re-encode never has to clip a tonemapped value.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;

use crate::error::Error;

/// Lowest point where the shoulder may start, in destination-normalized units.
pub const KNEE_FLOOR: f32 = 0.5;

/// Tonemap policy requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Tonemap {
    /// Tonemap only when compressing (`scale > 1`).
    #[default]
    Auto,
    /// Always route through the tonemapping stage.
    On,
    /// Multiply and clip.
    Off,
}

impl Tonemap {
    /// Whether tonemapping is active for a given luminance scale.
    pub fn enabled(self, scale: f32) -> bool {
        match self {
            Tonemap::Auto => scale > 1.0,
            Tonemap::On => true,
            Tonemap::Off => false,
        }
    }

    /// Lowercase name as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            Tonemap::Auto => "auto",
            Tonemap::On => "on",
            Tonemap::Off => "off",
        }
    }
}

impl fmt::Display for Tonemap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tonemap {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" | "a" => Ok(Tonemap::Auto),
            "on" | "yes" | "y" => Ok(Tonemap::On),
            "off" | "no" | "n" => Ok(Tonemap::Off),
            other => Err(Error::InvalidParameters(format!("unknown tonemap mode '{other}'"))),
        }
    }
}

/// The resolved luminance stage of a transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LuminanceScale {
    scale: f32,
    tonemap: bool,
    knee: f32,
}

impl LuminanceScale {
    /// Resolves `policy` for `src_luminance / dst_luminance`.
    pub fn new(src_luminance: f32, dst_luminance: f32, policy: Tonemap) -> Self {
        let scale = if dst_luminance > 0.0 { src_luminance / dst_luminance } else { 1.0 };
        Self::from_scale(scale, policy.enabled(scale))
    }

    /// Builds the stage from an explicit factor.
    pub fn from_scale(scale: f32, tonemap: bool) -> Self {
        let knee = if scale > 1.0 { (1.0 / scale).max(KNEE_FLOOR) } else { 1.0 };
        Self { scale, tonemap, knee }
    }

    /// Luminance factor applied before the curve.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Whether the shoulder is active.
    pub fn tonemap(&self) -> bool {
        self.tonemap
    }

    /// Start of the shoulder in destination-normalized units.
    pub fn knee(&self) -> f32 {
        self.knee
    }

    /// True when the stage leaves values untouched.
    pub fn is_identity(&self) -> bool {
        self.scale == 1.0
    }

    /// Maps one linear channel value.
    #[inline]
    pub fn apply(&self, v: f32) -> f32 {
        let x = v * self.scale;
        // The shoulder only exists while compressing; expanding stays a pure multiply.
        if !self.tonemap || self.scale <= 1.0 || x <= self.knee {
            return x;
        }
        let range = 1.0 - self.knee;
        let u = (x - self.knee) / range;
        self.knee + range * u / (1.0 + u)
    }

    /// Maps the RGB channels of an RGBA float buffer in place; alpha is untouched.
    pub fn apply_rgba(&self, pixels: &mut [f32]) {
        if self.is_identity() {
            return;
        }
        pixels.par_chunks_mut(4 * 4096).for_each(|chunk| {
            for px in chunk.chunks_exact_mut(4) {
                px[0] = self.apply(px[0]);
                px[1] = self.apply(px[1]);
                px[2] = self.apply(px[2]);
            }
        });
    }

    /// Short label used in conversion logs.
    pub fn mode_name(&self) -> &'static str {
        if self.tonemap { "tonemap" } else { "clip" }
    }
}

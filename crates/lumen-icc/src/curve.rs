//! Transfer curve classification.

use std::fmt;

/// How a profile's transfer curve was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveKind {
    /// A pure power function.
    Gamma,
    /// Any other shape; `gamma` holds an estimate.
    Complex,
    /// No usable curve.
    Unknown,
}

impl fmt::Display for CurveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CurveKind::Gamma => "Gamma",
            CurveKind::Complex => "Complex",
            CurveKind::Unknown => "Unknown",
        })
    }
}

/// A transfer curve reduced to a kind, a gamma and an implicit scale.
///
/// `implicit_scale` is the curve's output for input 1.0. It differs from 1
/// when a profile encodes extra headroom in the curve itself, and multiplies
/// the profile's nominal luminance to give the actual one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Curve {
    /// Classification
    pub kind: CurveKind,
    /// Exponent (exact for `Gamma`, estimated for `Complex`)
    pub gamma: f32,
    /// Output at input 1.0
    pub implicit_scale: f32,
}

impl Curve {
    /// A pure power curve.
    pub const fn gamma(gamma: f32) -> Self {
        Self { kind: CurveKind::Gamma, gamma, implicit_scale: 1.0 }
    }

    /// Linear light.
    pub const LINEAR: Curve = Curve::gamma(1.0);

    /// True for a pure power curve without implicit scale.
    pub fn is_simple_gamma(&self) -> bool {
        self.kind == CurveKind::Gamma && self.gamma > 0.0 && (self.implicit_scale - 1.0).abs() < 1e-4
    }
}

impl Default for Curve {
    fn default() -> Self {
        Self { kind: CurveKind::Unknown, gamma: 0.0, implicit_scale: 1.0 }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CurveKind::Gamma => write!(f, "Gamma({})", self.gamma),
            CurveKind::Complex => write!(f, "Complex(~{:.3})", self.gamma),
            CurveKind::Unknown => f.write_str("Unknown"),
        }
    }
}

/// SMPTE ST 2084 (PQ) EOTF, normalized so that 1.0 = 10000 nits.
pub fn pq_eotf(v: f32) -> f32 {
    const M1: f32 = 2610.0 / 16384.0;
    const M2: f32 = 2523.0 / 4096.0 * 128.0;
    const C1: f32 = 3424.0 / 4096.0;
    const C2: f32 = 2413.0 / 4096.0 * 32.0;
    const C3: f32 = 2392.0 / 4096.0 * 32.0;
    let v = v.clamp(0.0, 1.0);
    let p = v.powf(1.0 / M2);
    ((p - C1).max(0.0) / (C2 - C3 * p)).powf(1.0 / M1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn pq_endpoints() {
        assert_eq!(pq_eotf(0.0), 0.0);
        assert_abs_diff_eq!(pq_eotf(1.0), 1.0, epsilon = 1e-5);
        // 100 nits sits near code value 0.508
        assert_abs_diff_eq!(pq_eotf(0.508) * 10000.0, 100.0, epsilon = 2.0);
    }

    #[test]
    fn simple_gamma() {
        assert!(Curve::gamma(2.2).is_simple_gamma());
        let scaled = Curve { implicit_scale: 2.0, ..Curve::gamma(2.2) };
        assert!(!scaled.is_simple_gamma());
        assert!(!Curve::default().is_simple_gamma());
    }
}

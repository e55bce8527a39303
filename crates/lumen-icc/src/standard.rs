//! Stock profiles.

use std::fmt;
use std::str::FromStr;

use lcms2::ToneCurve;

use crate::curve::{pq_eotf, Curve};
use crate::{IccError, IccResult, Primaries, Profile};

/// Entries in the tabulated PQ curve.
const PQ_TABLE_SIZE: usize = 4096;

/// Luminance carried by PQ stock profiles.
pub const PQ_LUMINANCE: u32 = 10000;

/// Profiles lumen can build without any input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockProfile {
    /// lcms2's sRGB (piecewise curve)
    Srgb,
    /// BT.709 primaries, gamma 2.4
    Bt709,
    /// BT.2020 primaries, gamma 2.4
    Bt2020,
    /// P3 primaries, D65, gamma 2.2
    P3,
    /// BT.2020 primaries with the PQ curve at 10000 nits
    Bt2020Pq,
    /// P3 primaries with the PQ curve at 10000 nits
    P3Pq,
}

impl StockProfile {
    /// Every stock profile.
    pub const ALL: [StockProfile; 6] = [
        StockProfile::Srgb,
        StockProfile::Bt709,
        StockProfile::Bt2020,
        StockProfile::P3,
        StockProfile::Bt2020Pq,
        StockProfile::P3Pq,
    ];

    /// Lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            StockProfile::Srgb => "srgb",
            StockProfile::Bt709 => "bt709",
            StockProfile::Bt2020 => "bt2020",
            StockProfile::P3 => "p3",
            StockProfile::Bt2020Pq => "bt2020pq",
            StockProfile::P3Pq => "p3pq",
        }
    }

    /// Builds the profile.
    pub fn to_profile(self) -> IccResult<Profile> {
        match self {
            StockProfile::Srgb => Profile::srgb(),
            StockProfile::Bt709 => {
                Profile::synthesize(&Primaries::BT709, &Curve::gamma(2.4), None, Some("BT709 2.4g"))
            }
            StockProfile::Bt2020 => {
                Profile::synthesize(&Primaries::BT2020, &Curve::gamma(2.4), None, Some("BT2020 2.4g"))
            }
            StockProfile::P3 => {
                Profile::synthesize(&Primaries::P3, &Curve::gamma(2.2), None, Some("P3 2.2g"))
            }
            StockProfile::Bt2020Pq => pq_profile(&Primaries::BT2020, "BT2020 PQ"),
            StockProfile::P3Pq => pq_profile(&Primaries::P3, "P3 PQ"),
        }
    }
}

impl fmt::Display for StockProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StockProfile {
    type Err = IccError;

    fn from_str(s: &str) -> IccResult<Self> {
        let lower = s.to_ascii_lowercase();
        StockProfile::ALL
            .into_iter()
            .find(|p| p.name() == lower)
            .ok_or_else(|| IccError::InvalidParameters(format!("unknown stock profile '{s}'")))
    }
}

fn pq_profile(primaries: &Primaries, description: &str) -> IccResult<Profile> {
    let last = (PQ_TABLE_SIZE - 1) as f32;
    let table: Vec<u16> = (0..PQ_TABLE_SIZE)
        .map(|i| (pq_eotf(i as f32 / last) * 65535.0).round() as u16)
        .collect();
    let tone = ToneCurve::new_tabulated(&table);
    Profile::build(primaries, &tone, Some(PQ_LUMINANCE), description)
}

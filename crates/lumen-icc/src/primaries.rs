//! Chromaticities of a profile's red, green, blue and white points.

use std::fmt;
use std::str::FromStr;

use glam::{Mat3, Vec3};

use crate::{IccError, IccResult};

/// Red, green, blue and white chromaticities as CIE xy pairs.
///
/// All-zero is the "unspecified" value; a profile can only be built from
/// primaries whose eight coordinates are all positive.
///
/// # Example
///
/// ```rust
/// use lumen_icc::Primaries;
///
/// let p: Primaries = "0.64,0.33,0.30,0.60,0.15,0.06,0.3127,0.3290".parse().unwrap();
/// assert!(p.approx_eq(&Primaries::BT709, 1e-4));
/// assert_eq!("bt2020".parse::<Primaries>().unwrap(), Primaries::BT2020);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Primaries {
    /// Red (x, y)
    pub red: [f32; 2],
    /// Green (x, y)
    pub green: [f32; 2],
    /// Blue (x, y)
    pub blue: [f32; 2],
    /// White (x, y)
    pub white: [f32; 2],
}

/// D65 white point.
pub const D65: [f32; 2] = [0.3127, 0.3290];

/// D50 white point (the ICC connection space illuminant).
pub const D50: [f32; 2] = [0.3457, 0.3585];

/// Bradford cone response matrix.
pub const BRADFORD: Mat3 = Mat3::from_cols_array(&[
    0.8951, -0.7502, 0.0389, 0.2664, 1.7135, -0.0685, -0.1614, 0.0367, 1.0296,
]);

impl Primaries {
    /// ITU-R BT.709 / sRGB.
    pub const BT709: Primaries = Primaries::new([0.64, 0.33], [0.30, 0.60], [0.15, 0.06], D65);
    /// ITU-R BT.2020.
    pub const BT2020: Primaries = Primaries::new([0.708, 0.292], [0.170, 0.797], [0.131, 0.046], D65);
    /// Display P3 (P3 primaries, D65 white).
    pub const P3: Primaries = Primaries::new([0.680, 0.320], [0.265, 0.690], [0.150, 0.060], D65);

    /// Creates primaries from four xy pairs.
    pub const fn new(red: [f32; 2], green: [f32; 2], blue: [f32; 2], white: [f32; 2]) -> Self {
        Self { red, green, blue, white }
    }

    /// Builds primaries from `[rx, ry, gx, gy, bx, by, wx, wy]`.
    pub const fn from_array(v: [f32; 8]) -> Self {
        Self::new([v[0], v[1]], [v[2], v[3]], [v[4], v[5]], [v[6], v[7]])
    }

    /// Flattens to `[rx, ry, gx, gy, bx, by, wx, wy]`.
    pub fn to_array(&self) -> [f32; 8] {
        [
            self.red[0], self.red[1], self.green[0], self.green[1], self.blue[0], self.blue[1],
            self.white[0], self.white[1],
        ]
    }

    /// Looks up a stock set by name (`bt709`/`srgb`, `bt2020`, `p3`).
    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "bt709" | "709" | "srgb" | "rec709" => Some(Self::BT709),
            "bt2020" | "2020" | "rec2020" => Some(Self::BT2020),
            "p3" | "displayp3" | "dcip3" => Some(Self::P3),
            _ => None,
        }
    }

    /// Name of the stock set these primaries match, if any.
    pub fn stock_name(&self) -> Option<&'static str> {
        [(Self::BT709, "BT709"), (Self::BT2020, "BT2020"), (Self::P3, "P3")]
            .into_iter()
            .find(|(p, _)| self.approx_eq(p, 1e-3))
            .map(|(_, name)| name)
    }

    /// True when no coordinate has been set.
    pub fn is_unset(&self) -> bool {
        self.to_array().iter().all(|&v| v == 0.0)
    }

    /// True when every coordinate is positive.
    pub fn is_valid(&self) -> bool {
        self.to_array().iter().all(|&v| v > 0.0)
    }

    /// Fails unless [`is_valid`](Self::is_valid).
    pub fn validate(&self) -> IccResult<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(IccError::InvalidParameters("destination primaries are invalid".into()))
        }
    }

    /// Component-wise comparison within `eps`.
    pub fn approx_eq(&self, other: &Primaries, eps: f32) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(a, b)| (a - b).abs() <= eps)
    }

    /// White point as XYZ with Y = 1.
    pub fn white_xyz(&self) -> Vec3 {
        xy_to_xyz(self.white)
    }

    /// Linear RGB -> XYZ matrix, white mapping to `white_xyz()`.
    pub fn rgb_to_xyz(&self) -> Mat3 {
        let r = xy_to_xyz(self.red);
        let g = xy_to_xyz(self.green);
        let b = xy_to_xyz(self.blue);
        let m = Mat3::from_cols(r, g, b);
        let s = m.inverse() * self.white_xyz();
        Mat3::from_cols(r * s.x, g * s.y, b * s.z)
    }

    /// XYZ -> linear RGB matrix.
    pub fn xyz_to_rgb(&self) -> Mat3 {
        self.rgb_to_xyz().inverse()
    }
}

impl fmt::Display for Primaries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "r({:.4}, {:.4}) g({:.4}, {:.4}) b({:.4}, {:.4}) w({:.4}, {:.4})",
            self.red[0], self.red[1], self.green[0], self.green[1], self.blue[0], self.blue[1],
            self.white[0], self.white[1]
        )
    }
}

impl FromStr for Primaries {
    type Err = IccError;

    /// Accepts a stock name or eight comma-separated floats.
    fn from_str(s: &str) -> IccResult<Self> {
        if let Some(p) = Primaries::by_name(s.trim()) {
            return Ok(p);
        }
        let values: Vec<f32> = s
            .split(',')
            .map(|v| v.trim().parse::<f32>())
            .collect::<Result<_, _>>()
            .map_err(|e| IccError::InvalidParameters(format!("bad primaries '{s}': {e}")))?;
        let array: [f32; 8] = values
            .try_into()
            .map_err(|_| IccError::InvalidParameters(format!("primaries '{s}' need 8 values")))?;
        Ok(Primaries::from_array(array))
    }
}

/// xy chromaticity to XYZ with Y = 1.
pub fn xy_to_xyz(xy: [f32; 2]) -> Vec3 {
    let [x, y] = xy;
    if y.abs() < 1e-10 {
        return Vec3::ZERO;
    }
    Vec3::new(x / y, 1.0, (1.0 - x - y) / y)
}

/// XYZ to xy chromaticity; `None` for a zero vector.
pub fn xyz_to_xy(xyz: Vec3) -> Option<[f32; 2]> {
    let sum = xyz.x + xyz.y + xyz.z;
    if sum.abs() < 1e-10 {
        return None;
    }
    Some([xyz.x / sum, xyz.y / sum])
}

/// Bradford chromatic adaptation from `src_white` to `dst_white` (XYZ).
pub fn bradford_adapt(src_white: Vec3, dst_white: Vec3) -> Mat3 {
    let src = BRADFORD * src_white;
    let dst = BRADFORD * dst_white;
    let scale = Mat3::from_diagonal(Vec3::new(dst.x / src.x, dst.y / src.y, dst.z / src.z));
    BRADFORD.inverse() * scale * BRADFORD
}

//! Conversion parameters shared by the convert, generate and calc flows.

use std::path::PathBuf;
use std::str::FromStr;

use lumen_core::{Rect, Tonemap};
use lumen_icc::Primaries;
use lumen_io::WriteParams;

use crate::resize::Filter;
use crate::{OpsError, OpsResult};

/// Default JPEG quality.
pub const DEFAULT_QUALITY: u8 = 90;
/// Default JPEG 2000 compression rate.
pub const DEFAULT_RATE: u32 = 150;

/// Target size for a resize; a zero side keeps the aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeSpec {
    /// Width, 0 to derive from height
    pub width: u32,
    /// Height, 0 to derive from width
    pub height: u32,
    /// Resampling filter
    pub filter: Filter,
}

impl ResizeSpec {
    /// Final dimensions for a `src_w` x `src_h` source.
    ///
    /// ```rust
    /// use lumen_ops::ResizeSpec;
    ///
    /// let spec: ResizeSpec = "100,0".parse().unwrap();
    /// assert_eq!(spec.dims(400, 200).unwrap(), (100, 50));
    /// ```
    pub fn dims(&self, src_w: u32, src_h: u32) -> OpsResult<(u32, u32)> {
        let scaled = |num: u32, a: u32, b: u32| ((num as u64 * a as u64) as f64 / b as f64).round().max(1.0) as u32;
        match (self.width, self.height) {
            (0, 0) => Err(OpsError::InvalidParameter("resize needs a width or a height".into())),
            (w, 0) => Ok((w, scaled(w, src_h, src_w))),
            (0, h) => Ok((scaled(h, src_w, src_h), h)),
            (w, h) => Ok((w, h)),
        }
    }
}

impl FromStr for ResizeSpec {
    type Err = OpsError;

    /// Parses `w,h[,filter]`.
    fn from_str(s: &str) -> OpsResult<Self> {
        let bad = || OpsError::InvalidParameter(format!("bad resize '{s}', expected w,h[,filter]"));
        let mut parts = s.split(',').map(str::trim);
        let width = parts.next().and_then(|v| v.parse().ok()).ok_or_else(bad)?;
        let height = parts.next().and_then(|v| v.parse().ok()).ok_or_else(bad)?;
        let filter = match parts.next() {
            Some(f) => f.parse()?,
            None => Filter::Auto,
        };
        if parts.next().is_some() {
            return Err(bad());
        }
        Ok(Self { width, height, filter })
    }
}

/// Everything the conversion flow can be told.
///
/// Zero / `None` means "keep the source value".
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionParams {
    /// Pick luminance and gamma automatically
    pub auto_grade: bool,
    /// Output bits per channel, 0 = source depth
    pub depth: u32,
    /// Copyright text for a new profile
    pub copyright: Option<String>,
    /// Description for a new profile
    pub description: Option<String>,
    /// Output format name, `None` = detect from the output path
    pub format: Option<String>,
    /// Destination gamma, 0 = source gamma
    pub gamma: f32,
    /// HALD CLUT image applied before conversion
    pub hald: Option<PathBuf>,
    /// Destination luminance in nits, 0 = source luminance
    pub luminance: u32,
    /// Profile embedded in the output instead of the destination profile
    pub icc_out: Option<PathBuf>,
    /// Destination primaries, `None` = source primaries
    pub primaries: Option<Primaries>,
    /// JPEG quality 1-100
    pub quality: u8,
    /// JPEG 2000 rate
    pub rate: u32,
    /// Resize before conversion
    pub resize: Option<ResizeSpec>,
    /// Crop before conversion
    pub rect: Option<Rect>,
    /// Tonemap policy
    pub tonemap: Tonemap,
}

impl Default for ConversionParams {
    fn default() -> Self {
        Self {
            auto_grade: false,
            depth: 0,
            copyright: None,
            description: None,
            format: None,
            gamma: 0.0,
            hald: None,
            luminance: 0,
            icc_out: None,
            primaries: None,
            quality: DEFAULT_QUALITY,
            rate: DEFAULT_RATE,
            resize: None,
            rect: None,
            tonemap: Tonemap::Auto,
        }
    }
}

impl ConversionParams {
    /// Encoder settings.
    pub fn write_params(&self) -> WriteParams {
        WriteParams { quality: self.quality, rate: self.rate }
    }
}

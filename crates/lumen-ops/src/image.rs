//! Images: pixels plus the profile that gives them meaning.

use std::path::Path;

use lumen_core::{max_value, quantize, RawImage, Rect, Samples, Tonemap};
use lumen_icc::{Primaries, Profile};
use lumen_io::WriteParams;
use tracing::{debug, info};

use crate::resize::Filter;
use crate::{Context, OpsError, OpsResult};

/// An RGBA image at 8 or 16 bits that exclusively owns its profile.
///
/// Constructors clone any profile they are handed, so an image never
/// aliases a caller's profile.
///
/// ```rust
/// use lumen_ops::Image;
///
/// let mut image = Image::create(2, 2, 8, None).unwrap();
/// assert_eq!(image.pixel(1, 1).unwrap(), [255, 255, 255, 255]);
///
/// image.set_pixel(0, 0, [1, 2, 3, 4]).unwrap();
/// let rotated = image.rotate(2).unwrap();
/// assert_eq!(rotated.pixel(1, 1).unwrap(), [1, 2, 3, 4]);
/// ```
#[derive(Debug)]
pub struct Image {
    raw: RawImage,
    profile: Profile,
}

impl Image {
    /// Opaque white image. `None` selects stock sRGB.
    pub fn create(width: u32, height: u32, depth: u32, profile: Option<&Profile>) -> OpsResult<Self> {
        check_depth(depth)?;
        let profile = match profile {
            Some(p) => p.try_clone()?,
            None => Profile::srgb()?,
        };
        Ok(Self { raw: RawImage::new(width, height, depth)?, profile })
    }

    /// Pairs decoded pixels with a profile, taking ownership of both.
    pub fn from_parts(raw: RawImage, profile: Profile) -> OpsResult<Self> {
        check_depth(raw.depth)?;
        Ok(Self { raw, profile })
    }

    /// Splits the image back into pixels and profile.
    pub fn into_parts(self) -> (RawImage, Profile) {
        (self.raw, self.profile)
    }

    /// Deep copy, profile included.
    pub fn try_clone(&self) -> OpsResult<Self> {
        Ok(Self { raw: self.raw.clone(), profile: self.profile.try_clone()? })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.raw.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.raw.height
    }

    /// Bits per sample, 8 or 16.
    pub fn depth(&self) -> u32 {
        self.raw.depth
    }

    /// Pixel count.
    pub fn pixel_count(&self) -> usize {
        self.raw.pixel_count()
    }

    /// Pixel buffer.
    pub fn raw(&self) -> &RawImage {
        &self.raw
    }

    /// Interleaved RGBA samples.
    pub fn samples(&self) -> &Samples {
        &self.raw.samples
    }

    pub(crate) fn samples_mut(&mut self) -> &mut Samples {
        &mut self.raw.samples
    }

    /// The owned profile.
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Mutable profile, for metadata edits.
    pub fn profile_mut(&mut self) -> &mut Profile {
        &mut self.profile
    }

    /// Replaces the profile without touching pixels.
    pub fn set_profile(&mut self, profile: Profile) {
        self.profile = profile;
    }

    /// Reads an image file.
    ///
    /// `icc_override` replaces whatever profile the file embeds. Files without
    /// an embedded profile are treated as sRGB.
    pub fn read(ctx: &Context, path: &Path, icc_override: Option<&Path>) -> OpsResult<(Self, &'static str)> {
        let (decoded, format) = ctx.formats.read(path)?;
        let profile = match (icc_override, decoded.icc) {
            (Some(icc), _) => {
                info!(profile = %icc.display(), "overriding source profile");
                Profile::from_file(icc)?
            }
            (None, Some(bytes)) => Profile::parse(&bytes)?,
            (None, None) => {
                info!("no embedded ICC profile, using sRGB");
                Profile::srgb()?
            }
        };
        debug!(
            width = decoded.image.width,
            height = decoded.image.height,
            depth = decoded.image.depth,
            profile = %profile.description(),
            "decoded"
        );
        Ok((Self::from_parts(decoded.image, profile)?, format))
    }

    /// Encodes with `format` and writes `path` atomically, embedding the profile.
    pub fn write(&self, ctx: &Context, path: &Path, format: &str, params: &WriteParams) -> OpsResult<()> {
        ctx.formats
            .write(path, format, &self.raw, Some(self.profile.to_bytes()), params)?;
        Ok(())
    }

    /// RGBA at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> OpsResult<[u16; 4]> {
        self.check_bounds(x, y)?;
        Ok(self.raw.pixel(x, y))
    }

    /// Overwrites RGBA at (x, y). Values are truncated to the image depth.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u16; 4]) -> OpsResult<()> {
        self.check_bounds(x, y)?;
        let max = max_value(self.depth()) as u16;
        self.raw.set_pixel(x, y, rgba.map(|v| v.min(max)));
        Ok(())
    }

    fn check_bounds(&self, x: u32, y: u32) -> OpsResult<()> {
        if x >= self.width() || y >= self.height() {
            return Err(OpsError::InvalidInput(format!(
                "pixel ({x}, {y}) outside {}x{} image",
                self.width(),
                self.height()
            )));
        }
        Ok(())
    }

    /// Copies the part of the image inside `rect`, clamped to the image.
    pub fn crop(&self, rect: Rect) -> OpsResult<Self> {
        let r = rect.adjust(self.width(), self.height())?;
        let mut out = Self::create(r.w as u32, r.h as u32, self.depth(), Some(&self.profile))?;
        for j in 0..r.h as u32 {
            for i in 0..r.w as u32 {
                let px = self.raw.pixel(r.x as u32 + i, r.y as u32 + j);
                out.raw.set_pixel(i, j, px);
            }
        }
        Ok(out)
    }

    /// Rotates by `cw_turns` clockwise quarter turns (0-3).
    pub fn rotate(&self, cw_turns: u32) -> OpsResult<Self> {
        let (w, h) = (self.width(), self.height());
        let (dw, dh) = if cw_turns % 2 == 1 { (h, w) } else { (w, h) };
        if cw_turns > 3 {
            return Err(OpsError::InvalidParameter(format!("rotation must be 0-3 turns, got {cw_turns}")));
        }
        let mut out = Self::create(dw, dh, self.depth(), Some(&self.profile))?;
        for j in 0..h {
            for i in 0..w {
                let (x, y) = match cw_turns {
                    0 => (i, j),
                    1 => (dw - 1 - j, i),
                    2 => (dw - 1 - i, dh - 1 - j),
                    _ => (j, dh - 1 - i),
                };
                out.raw.set_pixel(x, y, self.raw.pixel(i, j));
            }
        }
        Ok(out)
    }

    /// Converts to `depth` bits in `dst_profile`.
    pub fn convert(&self, ctx: &Context, depth: u32, dst_profile: &Profile, tonemap: Tonemap) -> OpsResult<Self> {
        crate::transform::convert_image(ctx, self, depth, dst_profile, tonemap)
    }

    /// Resamples to `width` x `height`.
    pub fn resize(&self, ctx: &Context, width: u32, height: u32, filter: Filter) -> OpsResult<Self> {
        crate::resize::resize_image(ctx, self, width, height, filter)
    }

    /// Runs every pixel through a HALD lookup table image.
    pub fn apply_hald(&self, ctx: &Context, hald: &Image) -> OpsResult<Self> {
        crate::hald::apply_hald(ctx, self, hald)
    }

    /// Finds the luminance and gamma that best fit this image into `depth` bits.
    pub fn color_grade(&self, ctx: &Context, depth: u32) -> OpsResult<crate::Grade> {
        let primaries = self.profile.query()?.primaries;
        crate::grade::grade_image(ctx, self, &primaries, depth)
    }

    /// Like [`Image::color_grade`], for a conversion into `primaries`.
    pub fn color_grade_for(&self, ctx: &Context, primaries: &Primaries, depth: u32) -> OpsResult<crate::Grade> {
        crate::grade::grade_image(ctx, self, primaries, depth)
    }

    /// Identity HALD image of the given level.
    ///
    /// The image is `level^3` pixels square and encodes a `level^2` cube,
    /// red varying fastest.
    pub fn hald_identity(level: u32, depth: u32, profile: Option<&Profile>) -> OpsResult<Self> {
        if !(2..=16).contains(&level) {
            return Err(OpsError::InvalidParameter(format!("HALD level must be 2-16, got {level}")));
        }
        let side = level * level * level;
        let dims = (level * level) as usize;
        let mut image = Self::create(side, side, depth, profile)?;
        let max = max_value(depth) as f32;
        let scale = (dims - 1) as f32;
        for idx in 0..dims * dims * dims {
            let r = (idx % dims) as f32 / scale;
            let g = ((idx / dims) % dims) as f32 / scale;
            let b = (idx / (dims * dims)) as f32 / scale;
            let (x, y) = ((idx % side as usize) as u32, (idx / side as usize) as u32);
            image.raw.set_pixel(x, y, [quantize(r, max), quantize(g, max), quantize(b, max), max as u16]);
        }
        Ok(image)
    }

    /// Parses `#rrggbb`, `#rrggbbaa` or `(r,g,b[,a])` with components in 0-1.
    ///
    /// ```rust
    /// use lumen_ops::Image;
    ///
    /// assert_eq!(Image::parse_color("#ff0000").unwrap(), [1.0, 0.0, 0.0, 1.0]);
    /// assert_eq!(Image::parse_color("(0.5, 0, 1)").unwrap(), [0.5, 0.0, 1.0, 1.0]);
    /// ```
    pub fn parse_color(s: &str) -> OpsResult<[f32; 4]> {
        let s = s.trim();
        let bad = || OpsError::InvalidInput(format!("cannot parse color '{s}'"));

        if let Some(hex) = s.strip_prefix('#') {
            if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
                return Err(bad());
            }
            let mut rgba = [1.0f32; 4];
            for (c, chunk) in hex.as_bytes().chunks(2).enumerate() {
                let text = std::str::from_utf8(chunk).map_err(|_| bad())?;
                rgba[c] = u8::from_str_radix(text, 16).map_err(|_| bad())? as f32 / 255.0;
            }
            return Ok(rgba);
        }

        let inner = s
            .strip_prefix('(')
            .and_then(|t| t.strip_suffix(')'))
            .ok_or_else(bad)?;
        let values: Vec<f32> = inner
            .split(',')
            .map(|v| v.trim().parse::<f32>())
            .collect::<Result<_, _>>()
            .map_err(|_| bad())?;
        match values.as_slice() {
            &[r, g, b] => Ok([r, g, b, 1.0]),
            &[r, g, b, a] => Ok([r, g, b, a]),
            _ => Err(bad()),
        }
    }

    /// Fills every pixel with a normalized color.
    pub fn fill(&mut self, rgba: [f32; 4]) {
        let max = max_value(self.depth()) as f32;
        let value = rgba.map(|v| quantize(v, max));
        for i in 0..self.pixel_count() {
            for (c, v) in value.iter().enumerate() {
                self.raw.samples.set(i * 4 + c, *v);
            }
        }
    }
}

fn check_depth(depth: u32) -> OpsResult<()> {
    if depth == 8 || depth == 16 {
        Ok(())
    } else {
        Err(OpsError::InvalidParameter(format!("depth must be 8 or 16, got {depth}")))
    }
}

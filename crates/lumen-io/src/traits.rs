//! The codec interface every file format implements.
//!
//! Codecs work purely in memory: [`Codec::decode`] turns file bytes into a
//! [`RawImage`] plus the embedded ICC blob, [`Codec::encode`] does the
//! reverse. Filesystem access and format detection live in the
//! [`FormatRegistry`](crate::FormatRegistry).

use lumen_core::RawImage;

use crate::IoResult;

/// Bit depths a format can store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatDepth {
    /// 8 bits only.
    Depth8,
    /// 8 or 10 bits.
    Depth8Or10,
    /// 8 or 16 bits.
    Depth8Or16,
    /// Anything from 8 to 16 bits.
    Depth8To16,
}

impl FormatDepth {
    /// Deepest depth the format can hold.
    pub fn max(self) -> u32 {
        match self {
            FormatDepth::Depth8 => 8,
            FormatDepth::Depth8Or10 => 10,
            FormatDepth::Depth8Or16 | FormatDepth::Depth8To16 => 16,
        }
    }

    /// Closest supported depth to `requested`.
    ///
    /// ```rust
    /// use lumen_io::FormatDepth;
    ///
    /// assert_eq!(FormatDepth::Depth8.best(16), 8);
    /// assert_eq!(FormatDepth::Depth8Or16.best(10), 16);
    /// assert_eq!(FormatDepth::Depth8To16.best(12), 12);
    /// ```
    pub fn best(self, requested: u32) -> u32 {
        match self {
            FormatDepth::Depth8 => 8,
            FormatDepth::Depth8Or10 => {
                if requested > 8 { 10 } else { 8 }
            }
            FormatDepth::Depth8Or16 => {
                if requested > 8 { 16 } else { 8 }
            }
            FormatDepth::Depth8To16 => requested.clamp(8, 16),
        }
    }
}

/// Encoder knobs. Codecs ignore the ones they do not use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteParams {
    /// Lossy quality, 0-100.
    pub quality: u8,
    /// Compression rate for rate-driven codecs, 0 = lossless.
    pub rate: u32,
}

impl Default for WriteParams {
    fn default() -> Self {
        Self { quality: 90, rate: 0 }
    }
}

/// Output of [`Codec::decode`].
#[derive(Debug, Clone)]
pub struct Decoded {
    /// RGBA pixels at 8 or 16 bits.
    pub image: RawImage,
    /// Embedded ICC profile, if the file carried one.
    pub icc: Option<Vec<u8>>,
}

/// One image file format.
pub trait Codec: Send + Sync {
    /// Short lowercase name used on the command line (`png`, `jpg`).
    fn name(&self) -> &'static str;

    /// Human-readable name.
    fn description(&self) -> &'static str;

    /// MIME type.
    fn mime_type(&self) -> &'static str;

    /// File extensions without dots, lowercase.
    fn extensions(&self) -> &'static [&'static str];

    /// Magic byte prefixes identifying the format.
    fn signatures(&self) -> &'static [&'static [u8]];

    /// Storable bit depths.
    fn depth(&self) -> FormatDepth;

    /// Whether [`WriteParams::quality`] affects the output.
    fn uses_quality(&self) -> bool {
        false
    }

    /// Whether [`WriteParams::rate`] affects the output.
    fn uses_rate(&self) -> bool {
        false
    }

    /// Whether [`Codec::encode`] is implemented.
    fn can_write(&self) -> bool {
        true
    }

    /// Checks a file header against [`Codec::signatures`].
    fn matches(&self, header: &[u8]) -> bool {
        self.signatures().iter().any(|sig| header.starts_with(sig))
    }

    /// Decodes file bytes.
    fn decode(&self, data: &[u8]) -> IoResult<Decoded>;

    /// Encodes `image`, embedding `icc` when given.
    fn encode(&self, image: &RawImage, icc: Option<&[u8]>, params: &WriteParams) -> IoResult<Vec<u8>>;
}

/// Expands 1-4 channel interleaved samples to RGBA.
pub(crate) fn expand_to_rgba<T: Copy>(src: &[T], channels: usize, opaque: T) -> Vec<T> {
    let mut out = Vec::with_capacity(src.len() / channels.max(1) * 4);
    for px in src.chunks_exact(channels) {
        match channels {
            1 => out.extend_from_slice(&[px[0], px[0], px[0], opaque]),
            2 => out.extend_from_slice(&[px[0], px[0], px[0], px[1]]),
            3 => out.extend_from_slice(&[px[0], px[1], px[2], opaque]),
            _ => out.extend_from_slice(&px[..4]),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_gray_alpha() {
        assert_eq!(expand_to_rgba(&[10u8, 20], 2, 255), vec![10, 10, 10, 20]);
        assert_eq!(expand_to_rgba(&[1u16, 2, 3], 3, 65535), vec![1, 2, 3, 65535]);
        assert_eq!(expand_to_rgba(&[7u8], 1, 255), vec![7, 7, 7, 255]);
    }

    #[test]
    fn best_depths() {
        assert_eq!(FormatDepth::Depth8Or10.best(16), 10);
        assert_eq!(FormatDepth::Depth8Or10.best(8), 8);
        assert_eq!(FormatDepth::Depth8To16.best(4), 8);
        assert_eq!(FormatDepth::Depth8To16.best(32), 16);
        assert_eq!(FormatDepth::Depth8Or16.max(), 16);
    }
}

//! JPEG2000 codec (read-only) via the `jpeg2k` crate (OpenJPEG bindings).
//!
//! Components deeper than 8 bits are promoted to 16-bit samples. The
//! `jpeg2k` crate cannot encode, so writing reports
//! [`IoError::UnsupportedOperation`].

use jpeg2k::Image as J2kImage;
use lumen_core::{max_value, RawImage, Samples};
use tracing::trace;

use crate::traits::{expand_to_rgba, Codec, Decoded, FormatDepth, WriteParams};
use crate::{IoError, IoResult};

/// JPEG2000 (JP2 container or raw J2K codestream).
#[derive(Debug, Default, Clone, Copy)]
pub struct Jp2Codec;

impl Codec for Jp2Codec {
    fn name(&self) -> &'static str {
        "jp2"
    }

    fn description(&self) -> &'static str {
        "JPEG2000"
    }

    fn mime_type(&self) -> &'static str {
        "image/jp2"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["jp2", "j2k"]
    }

    fn signatures(&self) -> &'static [&'static [u8]] {
        &[
            &[0x00, 0x00, 0x00, 0x0C, 0x6A, 0x50, 0x20, 0x20, 0x0D, 0x0A, 0x87, 0x0A],
            &[0xFF, 0x4F, 0xFF, 0x51],
        ]
    }

    fn depth(&self) -> FormatDepth {
        FormatDepth::Depth8To16
    }

    fn uses_rate(&self) -> bool {
        true
    }

    fn can_write(&self) -> bool {
        false
    }

    fn decode(&self, data: &[u8]) -> IoResult<Decoded> {
        let img = J2kImage::from_bytes(data).map_err(|e| IoError::DecodeError(format!("JP2 decode: {e}")))?;
        let width = img.width();
        let height = img.height();
        let precision = img.components().first().map(|c| c.precision()).unwrap_or(8);

        let pixels = img
            .get_pixels(Some(255))
            .map_err(|e| IoError::DecodeError(format!("JP2 pixel extraction: {e}")))?;
        let values: Vec<u32> = pixels.data.iter().map(|&v| v as u32).collect();

        let count = width as usize * height as usize;
        let channels = if count == 0 { 0 } else { values.len() / count };
        if !(1..=4).contains(&channels) || channels * count != values.len() {
            return Err(IoError::InvalidFile(format!(
                "JP2 with {} components is not supported",
                img.num_components()
            )));
        }
        trace!(width, height, channels, precision, "JP2 frame");

        let (depth, samples) = if precision <= 8 {
            let narrow: Vec<u8> = values.iter().map(|&v| v.min(255) as u8).collect();
            (8, Samples::U8(expand_to_rgba(&narrow, channels, u8::MAX)))
        } else {
            let src_max = max_value(precision) as u64;
            let wide: Vec<u16> = values
                .iter()
                .map(|&v| (((v as u64).min(src_max) * 65535 + src_max / 2) / src_max) as u16)
                .collect();
            (16, Samples::U16(expand_to_rgba(&wide, channels, u16::MAX)))
        };

        let image = RawImage::from_samples(width, height, depth, samples)?;
        Ok(Decoded { image, icc: None })
    }

    fn encode(&self, _image: &RawImage, _icc: Option<&[u8]>, _params: &WriteParams) -> IoResult<Vec<u8>> {
        Err(IoError::UnsupportedOperation("writing JPEG2000 is not supported".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_is_refused() {
        let image = RawImage::new(1, 1, 8).unwrap();
        assert!(!Jp2Codec.can_write());
        assert!(matches!(
            Jp2Codec.encode(&image, None, &WriteParams::default()),
            Err(IoError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn signatures() {
        assert!(Jp2Codec.matches(&[0xFF, 0x4F, 0xFF, 0x51, 0x00]));
        assert!(!Jp2Codec.matches(b"\x89PNG"));
    }
}

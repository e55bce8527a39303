//! PNG codec.
//!
//! Reads 8/16-bit gray, gray-alpha, RGB, RGBA and palette images (palettes
//! and sub-byte depths are expanded by the decoder). Always writes RGBA,
//! embedding the profile as an `iCCP` chunk.

use std::borrow::Cow;
use std::io::Cursor;

use lumen_core::{try_alloc, RawImage, Samples};
use tracing::trace;

use crate::traits::{expand_to_rgba, Codec, Decoded, FormatDepth, WriteParams};
use crate::{IoError, IoResult};

/// PNG file format.
#[derive(Debug, Default, Clone, Copy)]
pub struct PngCodec;

impl Codec for PngCodec {
    fn name(&self) -> &'static str {
        "png"
    }

    fn description(&self) -> &'static str {
        "Portable Network Graphics"
    }

    fn mime_type(&self) -> &'static str {
        "image/png"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["png"]
    }

    fn signatures(&self) -> &'static [&'static [u8]] {
        &[b"\x89PNG\r\n\x1a\n"]
    }

    fn depth(&self) -> FormatDepth {
        FormatDepth::Depth8Or16
    }

    fn decode(&self, data: &[u8]) -> IoResult<Decoded> {
        let mut decoder = png::Decoder::new(Cursor::new(data));
        decoder.set_transformations(png::Transformations::EXPAND);
        let mut reader = decoder
            .read_info()
            .map_err(|e: png::DecodingError| IoError::DecodeError(e.to_string()))?;

        let icc = reader.info().icc_profile.as_ref().map(|p| p.to_vec());
        let buf_size = reader
            .output_buffer_size()
            .ok_or_else(|| IoError::DecodeError("PNG image too large".into()))?;
        let mut buf = try_alloc(buf_size, 0u8)?;
        let info = reader
            .next_frame(&mut buf)
            .map_err(|e| IoError::DecodeError(e.to_string()))?;
        buf.truncate(info.buffer_size());

        let channels = match info.color_type {
            png::ColorType::Grayscale => 1,
            png::ColorType::GrayscaleAlpha => 2,
            png::ColorType::Rgb => 3,
            png::ColorType::Rgba => 4,
            png::ColorType::Indexed => {
                return Err(IoError::DecodeError("palette was not expanded".into()));
            }
        };
        trace!(width = info.width, height = info.height, channels, bit_depth = ?info.bit_depth, "PNG frame");

        let (depth, samples) = match info.bit_depth {
            png::BitDepth::Eight => (8, Samples::U8(expand_to_rgba(&buf, channels, u8::MAX))),
            png::BitDepth::Sixteen => {
                let wide: Vec<u16> = buf
                    .chunks_exact(2)
                    .map(|b| u16::from_be_bytes([b[0], b[1]]))
                    .collect();
                (16, Samples::U16(expand_to_rgba(&wide, channels, u16::MAX)))
            }
            other => {
                return Err(IoError::UnsupportedBitDepth(format!("{other:?}")));
            }
        };

        let image = RawImage::from_samples(info.width, info.height, depth, samples)?;
        Ok(Decoded { image, icc })
    }

    fn encode(&self, image: &RawImage, icc: Option<&[u8]>, _params: &WriteParams) -> IoResult<Vec<u8>> {
        let (bit_depth, data) = match &image.samples {
            Samples::U8(v) if image.depth == 8 => (png::BitDepth::Eight, Cow::Borrowed(v.as_slice())),
            Samples::U16(v) if image.depth == 16 => {
                let bytes: Vec<u8> = v.iter().flat_map(|s| s.to_be_bytes()).collect();
                (png::BitDepth::Sixteen, Cow::Owned(bytes))
            }
            _ => {
                return Err(IoError::UnsupportedBitDepth(format!(
                    "PNG cannot store depth {}",
                    image.depth
                )));
            }
        };

        let mut info = png::Info::with_size(image.width, image.height);
        info.color_type = png::ColorType::Rgba;
        info.bit_depth = bit_depth;
        info.icc_profile = icc.map(Cow::Borrowed);

        let mut out = Vec::new();
        {
            let encoder = png::Encoder::with_info(&mut out, info)
                .map_err(|e: png::EncodingError| IoError::EncodeError(e.to_string()))?;
            let mut writer = encoder
                .write_header()
                .map_err(|e| IoError::EncodeError(e.to_string()))?;
            writer
                .write_image_data(&data)
                .map_err(|e| IoError::EncodeError(e.to_string()))?;
            writer.finish().map_err(|e| IoError::EncodeError(e.to_string()))?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(depth: u32) -> RawImage {
        let mut image = RawImage::new(3, 2, depth).unwrap();
        let max = lumen_core::max_value(depth) as u16;
        for y in 0..2 {
            for x in 0..3 {
                let v = (x + y * 3) as u16 * (max / 5);
                image.set_pixel(x, y, [v, max - v, v / 2, max]);
            }
        }
        image
    }

    #[test]
    fn roundtrip_8bit_with_icc() {
        let image = gradient(8);
        let icc = b"fake profile bytes".to_vec();
        let bytes = PngCodec.encode(&image, Some(&icc), &WriteParams::default()).unwrap();
        assert!(PngCodec.matches(&bytes));

        let decoded = PngCodec.decode(&bytes).unwrap();
        assert_eq!(decoded.image, image);
        assert_eq!(decoded.icc.as_deref(), Some(icc.as_slice()));
    }

    #[test]
    fn roundtrip_16bit() {
        let image = gradient(16);
        let bytes = PngCodec.encode(&image, None, &WriteParams::default()).unwrap();
        let decoded = PngCodec.decode(&bytes).unwrap();
        assert_eq!(decoded.image, image);
        assert!(decoded.icc.is_none());
    }

    #[test]
    fn gray_is_expanded() {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, 2, 1);
            encoder.set_color(png::ColorType::Grayscale);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(&[0, 200]).unwrap();
        }
        let decoded = PngCodec.decode(&out).unwrap();
        assert_eq!(decoded.image.pixel(1, 0), [200, 200, 200, 255]);
    }

    #[test]
    fn rejects_odd_depth() {
        let image = RawImage::new(1, 1, 12).unwrap();
        assert!(matches!(
            PngCodec.encode(&image, None, &WriteParams::default()),
            Err(IoError::UnsupportedBitDepth(_))
        ));
    }

    #[test]
    fn garbage_fails() {
        assert!(PngCodec.decode(b"not a png").is_err());
    }
}

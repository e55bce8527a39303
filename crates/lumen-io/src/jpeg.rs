//! JPEG codec.
//!
//! Decodes baseline and progressive RGB or grayscale JPEGs. CMYK files are
//! rejected: there is no profile-correct way to fold them into RGBA here.
//! Encoding drops alpha and embeds the profile in APP2 `ICC_PROFILE`
//! segments.

use std::io::Cursor;

use lumen_core::{RawImage, Samples};
use tracing::trace;

use crate::traits::{expand_to_rgba, Codec, Decoded, FormatDepth, WriteParams};
use crate::{IoError, IoResult};

/// APP2 marker identifier carrying ICC chunks.
const ICC_MARKER: &[u8] = b"ICC_PROFILE\0";

/// JPEG file format.
#[derive(Debug, Default, Clone, Copy)]
pub struct JpegCodec;

impl Codec for JpegCodec {
    fn name(&self) -> &'static str {
        "jpg"
    }

    fn description(&self) -> &'static str {
        "JPEG"
    }

    fn mime_type(&self) -> &'static str {
        "image/jpeg"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["jpg", "jpeg"]
    }

    fn signatures(&self) -> &'static [&'static [u8]] {
        &[&[0xFF, 0xD8, 0xFF]]
    }

    fn depth(&self) -> FormatDepth {
        FormatDepth::Depth8
    }

    fn uses_quality(&self) -> bool {
        true
    }

    fn decode(&self, data: &[u8]) -> IoResult<Decoded> {
        let mut decoder = jpeg_decoder::Decoder::new(Cursor::new(data));
        let pixels = decoder
            .decode()
            .map_err(|e| IoError::DecodeError(e.to_string()))?;
        let info = decoder
            .info()
            .ok_or_else(|| IoError::DecodeError("missing JPEG info".into()))?;
        trace!(width = info.width, height = info.height, format = ?info.pixel_format, "JPEG frame");

        let (depth, samples) = match info.pixel_format {
            jpeg_decoder::PixelFormat::RGB24 => (8, Samples::U8(expand_to_rgba(&pixels, 3, u8::MAX))),
            jpeg_decoder::PixelFormat::L8 => (8, Samples::U8(expand_to_rgba(&pixels, 1, u8::MAX))),
            jpeg_decoder::PixelFormat::L16 => {
                let wide: Vec<u16> = pixels
                    .chunks_exact(2)
                    .map(|b| u16::from_be_bytes([b[0], b[1]]))
                    .collect();
                (16, Samples::U16(expand_to_rgba(&wide, 1, u16::MAX)))
            }
            jpeg_decoder::PixelFormat::CMYK32 => {
                return Err(IoError::InvalidFile("CMYK JPEG is not supported".into()));
            }
        };

        let image = RawImage::from_samples(info.width as u32, info.height as u32, depth, samples)?;
        Ok(Decoded { image, icc: read_icc(data) })
    }

    fn encode(&self, image: &RawImage, icc: Option<&[u8]>, params: &WriteParams) -> IoResult<Vec<u8>> {
        use jpeg_encoder::{ColorType, Encoder};

        let Samples::U8(rgba) = &image.samples else {
            return Err(IoError::UnsupportedBitDepth(format!(
                "JPEG cannot store depth {}",
                image.depth
            )));
        };
        let width = u16::try_from(image.width)
            .map_err(|_| IoError::EncodeError(format!("width {} exceeds JPEG limits", image.width)))?;
        let height = u16::try_from(image.height)
            .map_err(|_| IoError::EncodeError(format!("height {} exceeds JPEG limits", image.height)))?;

        let rgb: Vec<u8> = rgba.chunks_exact(4).flat_map(|px| [px[0], px[1], px[2]]).collect();

        let mut buffer = Vec::new();
        let mut encoder = Encoder::new(&mut buffer, params.quality.clamp(1, 100));
        if let Some(icc) = icc {
            encoder
                .add_icc_profile(icc)
                .map_err(|e: jpeg_encoder::EncodingError| IoError::EncodeError(e.to_string()))?;
        }
        encoder
            .encode(&rgb, width, height, ColorType::Rgb)
            .map_err(|e: jpeg_encoder::EncodingError| IoError::EncodeError(e.to_string()))?;
        Ok(buffer)
    }
}

/// Reassembles the ICC profile from APP2 segments.
///
/// Chunks carry a 1-based sequence number and the total count; a profile is
/// returned only when every chunk is present.
fn read_icc(data: &[u8]) -> Option<Vec<u8>> {
    let mut chunks: Vec<(u8, &[u8])> = Vec::new();
    let mut expected = 0u8;
    let mut pos = 2;

    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            break;
        }
        let marker = data[pos + 1];
        // SOS: entropy-coded data follows, no more metadata
        if marker == 0xDA || marker == 0xD9 {
            break;
        }
        let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if len < 2 || pos + 2 + len > data.len() {
            break;
        }
        let segment = &data[pos + 4..pos + 2 + len];
        if marker == 0xE2 && segment.len() > ICC_MARKER.len() + 2 && segment.starts_with(ICC_MARKER) {
            let seq = segment[ICC_MARKER.len()];
            expected = segment[ICC_MARKER.len() + 1];
            chunks.push((seq, &segment[ICC_MARKER.len() + 2..]));
        }
        pos += 2 + len;
    }

    if chunks.is_empty() || chunks.len() != expected as usize {
        return None;
    }
    chunks.sort_by_key(|(seq, _)| *seq);
    Some(chunks.into_iter().flat_map(|(_, bytes)| bytes.iter().copied()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(value: [u16; 4]) -> RawImage {
        let mut image = RawImage::new(8, 8, 8).unwrap();
        for y in 0..8 {
            for x in 0..8 {
                image.set_pixel(x, y, value);
            }
        }
        image
    }

    #[test]
    fn roundtrip_flat_color() {
        let image = flat([200, 100, 50, 255]);
        let bytes = JpegCodec
            .encode(&image, None, &WriteParams { quality: 100, rate: 0 })
            .unwrap();
        assert!(JpegCodec.matches(&bytes));

        let decoded = JpegCodec.decode(&bytes).unwrap();
        assert_eq!(decoded.image.width, 8);
        assert_eq!(decoded.image.depth, 8);
        let px = decoded.image.pixel(3, 3);
        for c in 0..3 {
            assert!((px[c] as i32 - image.pixel(3, 3)[c] as i32).abs() <= 3, "{px:?}");
        }
        assert_eq!(px[3], 255);
        assert!(decoded.icc.is_none());
    }

    #[test]
    fn icc_survives() {
        let icc: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let bytes = JpegCodec
            .encode(&flat([0, 0, 0, 255]), Some(&icc), &WriteParams::default())
            .unwrap();
        let decoded = JpegCodec.decode(&bytes).unwrap();
        assert_eq!(decoded.icc, Some(icc));
    }

    #[test]
    fn sixteen_bit_is_refused() {
        let image = RawImage::new(2, 2, 16).unwrap();
        assert!(matches!(
            JpegCodec.encode(&image, None, &WriteParams::default()),
            Err(IoError::UnsupportedBitDepth(_))
        ));
    }

    #[test]
    fn incomplete_icc_is_dropped() {
        let mut data = vec![0xFF, 0xD8];
        let mut seg = ICC_MARKER.to_vec();
        seg.extend_from_slice(&[1, 2, 0xAA, 0xBB]);
        data.extend_from_slice(&[0xFF, 0xE2]);
        data.extend_from_slice(&((seg.len() + 2) as u16).to_be_bytes());
        data.extend_from_slice(&seg);
        data.extend_from_slice(&[0xFF, 0xD9]);
        assert_eq!(read_icc(&data), None);
    }
}

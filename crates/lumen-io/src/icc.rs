//! Raw ICC profile pseudo-format.
//!
//! An `.icc` file has no pixels. Decoding yields a 1x1 white image carrying
//! the file as its profile so identify/modify can treat it like any image;
//! encoding writes only the profile bytes.

use lumen_core::RawImage;

use crate::traits::{Codec, Decoded, FormatDepth, WriteParams};
use crate::{IoError, IoResult};

/// Byte offset of the `acsp` magic in an ICC header.
const MAGIC_OFFSET: usize = 36;

/// Bare ICC profile file.
#[derive(Debug, Default, Clone, Copy)]
pub struct IccCodec;

impl Codec for IccCodec {
    fn name(&self) -> &'static str {
        "icc"
    }

    fn description(&self) -> &'static str {
        "ICC profile"
    }

    fn mime_type(&self) -> &'static str {
        "application/vnd.iccprofile"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["icc", "icm"]
    }

    fn signatures(&self) -> &'static [&'static [u8]] {
        &[b"acsp"]
    }

    fn depth(&self) -> FormatDepth {
        FormatDepth::Depth8To16
    }

    fn matches(&self, header: &[u8]) -> bool {
        header.get(MAGIC_OFFSET..MAGIC_OFFSET + 4) == Some(b"acsp".as_slice())
    }

    fn decode(&self, data: &[u8]) -> IoResult<Decoded> {
        if !self.matches(data) {
            return Err(IoError::InvalidFile("missing ICC 'acsp' signature".into()));
        }
        Ok(Decoded { image: RawImage::new(1, 1, 8)?, icc: Some(data.to_vec()) })
    }

    fn encode(&self, _image: &RawImage, icc: Option<&[u8]>, _params: &WriteParams) -> IoResult<Vec<u8>> {
        icc.map(<[u8]>::to_vec)
            .ok_or_else(|| IoError::EncodeError("no profile to write".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<u8> {
        let mut data = vec![0u8; 128];
        data[MAGIC_OFFSET..MAGIC_OFFSET + 4].copy_from_slice(b"acsp");
        data
    }

    #[test]
    fn decode_wraps_profile() {
        let data = header();
        let decoded = IccCodec.decode(&data).unwrap();
        assert_eq!(decoded.image.width, 1);
        assert_eq!(decoded.icc, Some(data));
    }

    #[test]
    fn encode_needs_profile() {
        let image = RawImage::new(1, 1, 8).unwrap();
        assert!(IccCodec.encode(&image, None, &WriteParams::default()).is_err());
        let out = IccCodec.encode(&image, Some(b"abc"), &WriteParams::default()).unwrap();
        assert_eq!(out, b"abc");
    }

    #[test]
    fn rejects_non_profiles() {
        assert!(IccCodec.decode(b"short").is_err());
    }
}

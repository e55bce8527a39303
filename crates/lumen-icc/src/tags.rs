//! Raw access to the ICC tag table.
//!
//! lcms2 hides the tag directory, so diagnostics (tag listing) and the
//! chromatic adaptation matrix are read straight from the serialized bytes.

use glam::Mat3;

use crate::{IccError, IccResult};

const HEADER_SIZE: usize = 128;
const TAG_ENTRY_SIZE: usize = 12;

/// One entry of the tag directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    /// Four-character signature, e.g. `rXYZ`
    pub signature: String,
    /// Byte offset of the tag data
    pub offset: u32,
    /// Size of the tag data in bytes
    pub size: u32,
}

fn be_u32(data: &[u8], at: usize) -> Option<u32> {
    data.get(at..at + 4).map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

fn s15_fixed16(data: &[u8], at: usize) -> Option<f32> {
    be_u32(data, at).map(|v| v as i32 as f32 / 65536.0)
}

/// Lists the tag directory of a serialized profile.
pub fn tag_table(data: &[u8]) -> IccResult<Vec<TagInfo>> {
    let count = be_u32(data, HEADER_SIZE)
        .ok_or_else(|| IccError::InvalidProfile("profile shorter than its header".into()))?
        as usize;
    let mut tags = Vec::with_capacity(count.min(256));
    for i in 0..count {
        let at = HEADER_SIZE + 4 + i * TAG_ENTRY_SIZE;
        let (Some(sig), Some(offset), Some(size)) =
            (data.get(at..at + 4), be_u32(data, at + 4), be_u32(data, at + 8))
        else {
            return Err(IccError::InvalidProfile(format!("tag table truncated at entry {i}")));
        };
        tags.push(TagInfo {
            signature: String::from_utf8_lossy(sig).into_owned(),
            offset,
            size,
        });
    }
    Ok(tags)
}

/// Reads the `chad` matrix, if present and well formed.
///
/// The tag is an `sf32` array of nine s15Fixed16 values in row-major order.
pub fn chromatic_adaptation(data: &[u8]) -> Option<Mat3> {
    let tags = tag_table(data).ok()?;
    let chad = tags.iter().find(|t| t.signature == "chad")?;
    let at = chad.offset as usize;
    if data.get(at..at + 4)? != b"sf32" || (chad.size as usize) < 8 + 9 * 4 {
        return None;
    }
    let mut rows = [0.0f32; 9];
    for (i, v) in rows.iter_mut().enumerate() {
        *v = s15_fixed16(data, at + 8 + i * 4)?;
    }
    Some(Mat3::from_cols_array(&rows).transpose())
}

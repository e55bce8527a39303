//! Pixel buffers and the integer <-> float converter.
//!
//! Every image in lumen is four interleaved channels (RGBA) of unsigned
//! samples. Depths up to 8 bits are stored as `u8`, deeper images as `u16`.
//! Processing stages that need math (transform, resize, HALD, grading)
//! convert to a float buffer with [`to_linear_float`], operate, then
//! re-quantize with [`from_linear_float`].
//!
//! The two conversions are exact inverses on representable values:
//!
//! ```rust
//! use lumen_core::{Samples, to_linear_float, from_linear_float};
//!
//! let src = Samples::U16(vec![0, 1, 32768, 65535]);
//! let floats = to_linear_float(&src, 16).unwrap();
//! let back = from_linear_float(&floats, 16).unwrap();
//! assert_eq!(src, back);
//! ```

use rayon::prelude::*;

use crate::error::{Error, Result};

/// Interleaved channels per pixel.
pub const CHANNELS: usize = 4;

/// Samples handled per parallel work item in the converters.
const CHUNK_SAMPLES: usize = 64 * 1024;

/// Bytes needed to hold one sample of `depth` bits.
#[inline]
pub fn depth_to_bytes(depth: u32) -> usize {
    if depth > 8 { 2 } else { 1 }
}

/// Largest sample value representable at `depth` bits.
#[inline]
pub fn max_value(depth: u32) -> u32 {
    (1u32 << depth.clamp(1, 16)) - 1
}

/// Quantizes a normalized value: multiply, round to nearest, clamp.
#[inline]
pub fn quantize(v: f32, max: f32) -> u16 {
    (v * max).round().clamp(0.0, max) as u16
}

/// Allocates a vector without aborting on exhaustion.
pub fn try_alloc<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| Error::AllocationFailure {
        bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    v.resize(len, value);
    Ok(v)
}

/// Owned sample storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Samples {
    /// Depth 1..=8
    U8(Vec<u8>),
    /// Depth 9..=16
    U16(Vec<u16>),
}

impl Samples {
    /// Allocates `len` samples of storage suited to `depth`, all set to `value`.
    pub fn filled(depth: u32, len: usize, value: u16) -> Result<Self> {
        if depth_to_bytes(depth) == 1 {
            Ok(Samples::U8(try_alloc(len, value.min(255) as u8)?))
        } else {
            Ok(Samples::U16(try_alloc(len, value)?))
        }
    }

    /// Number of samples (not pixels).
    pub fn len(&self) -> usize {
        match self {
            Samples::U8(v) => v.len(),
            Samples::U16(v) => v.len(),
        }
    }

    /// True when no samples are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes per sample of this storage.
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            Samples::U8(_) => 1,
            Samples::U16(_) => 2,
        }
    }

    /// Reads one sample widened to `u16`.
    #[inline]
    pub fn get(&self, index: usize) -> u16 {
        match self {
            Samples::U8(v) => v[index] as u16,
            Samples::U16(v) => v[index],
        }
    }

    /// Writes one sample, truncating to the storage width.
    #[inline]
    pub fn set(&mut self, index: usize, value: u16) {
        match self {
            Samples::U8(v) => v[index] = value.min(255) as u8,
            Samples::U16(v) => v[index] = value,
        }
    }
}

/// Width, height, depth and RGBA samples without any color metadata.
///
/// This is what codecs produce and consume. `lumen-ops` pairs it with a
/// profile to form a full image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Bits per sample (8 or 16 for everything lumen writes)
    pub depth: u32,
    /// `width * height * 4` samples
    pub samples: Samples,
}

impl RawImage {
    /// Allocates an opaque white image.
    pub fn new(width: u32, height: u32, depth: u32) -> Result<Self> {
        check_geometry(width, height, depth)?;
        let len = sample_count(width, height)?;
        let samples = Samples::filled(depth, len, max_value(depth) as u16)?;
        Ok(Self { width, height, depth, samples })
    }

    /// Wraps decoded samples after validating the geometry.
    pub fn from_samples(width: u32, height: u32, depth: u32, samples: Samples) -> Result<Self> {
        check_geometry(width, height, depth)?;
        let expected = sample_count(width, height)?;
        if samples.len() != expected {
            return Err(Error::SizeMismatch { expected, actual: samples.len() });
        }
        if samples.bytes_per_sample() != depth_to_bytes(depth) {
            return Err(Error::InvalidParameters(format!(
                "depth {depth} does not fit {}-byte samples",
                samples.bytes_per_sample()
            )));
        }
        Ok(Self { width, height, depth, samples })
    }

    /// Pixel count.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size of the sample buffer in bytes.
    pub fn byte_size(&self) -> usize {
        self.samples.len() * self.samples.bytes_per_sample()
    }

    /// RGBA at (x, y). Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u16; 4] {
        let base = self.offset(x, y);
        [
            self.samples.get(base),
            self.samples.get(base + 1),
            self.samples.get(base + 2),
            self.samples.get(base + 3),
        ]
    }

    /// Overwrites RGBA at (x, y). Panics when out of bounds.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u16; 4]) {
        let base = self.offset(x, y);
        for (c, value) in rgba.into_iter().enumerate() {
            self.samples.set(base + c, value);
        }
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        CHANNELS * (x as usize + y as usize * self.width as usize)
    }
}

fn check_geometry(width: u32, height: u32, depth: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }
    if !(1..=16).contains(&depth) {
        return Err(Error::InvalidParameters(format!("unsupported depth {depth}")));
    }
    Ok(())
}

fn sample_count(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(CHANNELS))
        .ok_or(Error::InvalidDimensions { width, height })
}

/// Normalizes every sample to `[0, 1]` by dividing by `2^depth - 1`.
pub fn to_linear_float(samples: &Samples, depth: u32) -> Result<Vec<f32>> {
    let mut out = try_alloc(samples.len(), 0.0f32)?;
    let max = max_value(depth) as f32;
    match samples {
        Samples::U8(src) => unorm_chunks(src, &mut out, max),
        Samples::U16(src) => unorm_chunks(src, &mut out, max),
    }
    Ok(out)
}

fn unorm_chunks<T: Copy + Into<f32> + Sync>(src: &[T], out: &mut [f32], max: f32) {
    out.par_chunks_mut(CHUNK_SAMPLES)
        .zip(src.par_chunks(CHUNK_SAMPLES))
        .for_each(|(dst, src)| {
            for (d, &s) in dst.iter_mut().zip(src) {
                *d = s.into() / max;
            }
        });
}

/// Inverse of [`to_linear_float`]: multiply by `2^depth - 1`, round, clamp.
pub fn from_linear_float(src: &[f32], depth: u32) -> Result<Samples> {
    let mut out = Samples::filled(depth, src.len(), 0)?;
    write_linear_float(src, depth, &mut out);
    Ok(out)
}

/// Quantizes `src` into existing storage of the same length.
pub fn write_linear_float(src: &[f32], depth: u32, dst: &mut Samples) {
    let max = max_value(depth) as f32;
    match dst {
        Samples::U8(out) => out
            .par_chunks_mut(CHUNK_SAMPLES)
            .zip(src.par_chunks(CHUNK_SAMPLES))
            .for_each(|(dst, src)| {
                for (d, &s) in dst.iter_mut().zip(src) {
                    *d = quantize(s, max) as u8;
                }
            }),
        Samples::U16(out) => out
            .par_chunks_mut(CHUNK_SAMPLES)
            .zip(src.par_chunks(CHUNK_SAMPLES))
            .for_each(|(dst, src)| {
                for (d, &s) in dst.iter_mut().zip(src) {
                    *d = quantize(s, max);
                }
            }),
    }
}

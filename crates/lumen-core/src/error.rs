//! Error types shared by every lumen crate.
//!
//! The [`Error`] enum is the common failure vocabulary of the conversion
//! pipeline. Higher layers (`lumen-icc`, `lumen-io`, `lumen-ops`) keep their
//! own error enums but every one of them can be classified into an
//! [`ErrorKind`], so callers can react to the category of a failure without
//! matching on every variant.
//!
//! # Usage
//!
//! ```rust
//! use lumen_core::{Error, ErrorKind, Result};
//!
//! fn check_depth(depth: u32) -> Result<()> {
//!     if depth != 8 && depth != 16 {
//!         return Err(Error::InvalidParameters(format!("unsupported depth {depth}")));
//!     }
//!     Ok(())
//! }
//!
//! let err = check_depth(12).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::InvalidParameters);
//! ```

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure category.
///
/// Every error raised anywhere in lumen maps onto exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed file, bad rectangle or dimensions.
    InvalidInput,
    /// A profile whose curve cannot be reduced to gamma/complex.
    UnsupportedProfile,
    /// Missing or contradictory luminance/gamma/primaries after all fallbacks.
    InvalidParameters,
    /// A buffer could not be allocated.
    AllocationFailure,
    /// Opening, reading or writing a file failed.
    Io,
    /// Grading requested on an all-black or empty buffer.
    DegenerateImage,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::UnsupportedProfile => "unsupported profile",
            ErrorKind::InvalidParameters => "invalid parameters",
            ErrorKind::AllocationFailure => "allocation failure",
            ErrorKind::Io => "I/O failure",
            ErrorKind::DegenerateImage => "degenerate image",
        };
        f.write_str(name)
    }
}

/// Errors raised by the core pixel and scheduling primitives.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input data.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Rectangle rejected by [`Rect::adjust`](crate::Rect::adjust).
    #[error("invalid rectangle [{x}, {y}, {w}, {h}]")]
    InvalidRect {
        /// Left edge
        x: i32,
        /// Top edge
        y: i32,
        /// Width
        w: i32,
        /// Height
        h: i32,
    },

    /// Image dimensions that cannot describe a buffer.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// Buffer length does not match the declared geometry.
    #[error("buffer size mismatch: expected {expected} samples, got {actual}")]
    SizeMismatch {
        /// Samples implied by width, height and channel count
        expected: usize,
        /// Samples actually present
        actual: usize,
    },

    /// Profile cannot be reduced to the gamma/complex model.
    #[error("unsupported profile: {0}")]
    UnsupportedProfile(String),

    /// Luminance, gamma, depth or primaries are missing or contradictory.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Pixel buffer allocation failed.
    #[error("failed to allocate {bytes} bytes")]
    AllocationFailure {
        /// Requested size in bytes
        bytes: usize,
    },

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Grading cannot work on an empty or all-black buffer.
    #[error("degenerate image: {0}")]
    DegenerateImage(String),
}

impl Error {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_)
            | Error::InvalidRect { .. }
            | Error::InvalidDimensions { .. }
            | Error::SizeMismatch { .. } => ErrorKind::InvalidInput,
            Error::UnsupportedProfile(_) => ErrorKind::UnsupportedProfile,
            Error::InvalidParameters(_) => ErrorKind::InvalidParameters,
            Error::AllocationFailure { .. } => ErrorKind::AllocationFailure,
            Error::Io(_) => ErrorKind::Io,
            Error::DegenerateImage(_) => ErrorKind::DegenerateImage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_variants() {
        let rect = Error::InvalidRect { x: -1, y: 0, w: 4, h: 4 };
        assert_eq!(rect.kind(), ErrorKind::InvalidInput);
        assert!(rect.to_string().contains("-1"));

        let io: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(io.kind(), ErrorKind::Io);

        let grade = Error::DegenerateImage("all pixels are black".into());
        assert_eq!(grade.kind(), ErrorKind::DegenerateImage);
    }
}

//! Error types for codec operations.

use std::io;

use lumen_core::ErrorKind;
use thiserror::Error;

/// Result type for codec operations.
pub type IoResult<T> = Result<T, IoError>;

/// Errors that can occur while reading or writing image files.
#[derive(Debug, Error)]
pub enum IoError {
    /// Underlying filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No codec claims the file or format name.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// File content is not what its header claims.
    #[error("invalid file: {0}")]
    InvalidFile(String),

    /// Decoder reported an error.
    #[error("decode error: {0}")]
    DecodeError(String),

    /// Encoder reported an error.
    #[error("encode error: {0}")]
    EncodeError(String),

    /// Bit depth the codec cannot carry.
    #[error("unsupported bit depth: {0}")]
    UnsupportedBitDepth(String),

    /// Operation the codec does not implement (e.g. writing JP2).
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Error from the pixel buffer layer.
    #[error(transparent)]
    Core(#[from] lumen_core::Error),
}

impl IoError {
    /// Maps this error onto the shared failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            IoError::Io(_) => ErrorKind::Io,
            IoError::UnsupportedFormat(_)
            | IoError::InvalidFile(_)
            | IoError::DecodeError(_)
            | IoError::UnsupportedBitDepth(_) => ErrorKind::InvalidInput,
            IoError::EncodeError(_) => ErrorKind::Io,
            IoError::UnsupportedOperation(_) => ErrorKind::InvalidParameters,
            IoError::Core(e) => e.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(IoError::InvalidFile("x".into()).kind(), ErrorKind::InvalidInput);
        let e: IoError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert_eq!(e.kind(), ErrorKind::Io);
        let e: IoError = lumen_core::Error::AllocationFailure { bytes: 1 }.into();
        assert_eq!(e.kind(), ErrorKind::AllocationFailure);
    }
}

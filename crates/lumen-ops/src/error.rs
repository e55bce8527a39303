//! Error types for pipeline operations.

use lumen_core::ErrorKind;
use lumen_icc::IccError;
use lumen_io::IoError;
use thiserror::Error;

/// Error type for pipeline operations.
#[derive(Error, Debug)]
pub enum OpsError {
    /// Pixel buffer, rectangle or scheduling failure.
    #[error(transparent)]
    Core(#[from] lumen_core::Error),

    /// Profile or CMM failure.
    #[error(transparent)]
    Icc(#[from] IccError),

    /// Codec or file failure.
    #[error(transparent)]
    Io(#[from] IoError),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Malformed user input (color strings, HALD images, image strings).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Report serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OpsError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OpsError::Core(e) => e.kind(),
            OpsError::Icc(e) => e.kind(),
            OpsError::Io(e) => e.kind(),
            OpsError::InvalidParameter(_) => ErrorKind::InvalidParameters,
            OpsError::InvalidInput(_) => ErrorKind::InvalidInput,
            OpsError::Json(_) => ErrorKind::Io,
        }
    }
}

/// Result type for pipeline operations.
pub type OpsResult<T> = Result<T, OpsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_pass_through() {
        let e: OpsError = lumen_core::Error::DegenerateImage("black".into()).into();
        assert_eq!(e.kind(), ErrorKind::DegenerateImage);
        let e: OpsError = IoError::UnsupportedFormat("xyz".into()).into();
        assert_eq!(e.kind(), lumen_io::IoError::UnsupportedFormat(String::new()).kind());
        assert_eq!(OpsError::InvalidParameter("x".into()).kind(), ErrorKind::InvalidParameters);
    }
}

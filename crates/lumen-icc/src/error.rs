//! ICC error types.

use lumen_core::ErrorKind;
use thiserror::Error;

/// Result type for ICC operations.
pub type IccResult<T> = Result<T, IccError>;

/// Errors that can occur while parsing, building or applying profiles.
#[derive(Debug, Error)]
pub enum IccError {
    /// The bytes are not a usable ICC profile.
    #[error("invalid profile data: {0}")]
    InvalidProfile(String),

    /// lcms2 refused to build or serialize a profile.
    #[error("failed to create profile: {0}")]
    CreateFailed(String),

    /// lcms2 refused to build a transform.
    #[error("failed to create transform: {0}")]
    TransformFailed(String),

    /// The profile cannot be reduced to primaries + gamma/complex curve.
    #[error("unsupported profile: {0}")]
    Unsupported(String),

    /// Primaries, gamma or luminance rejected.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Failure from the core layer.
    #[error(transparent)]
    Core(#[from] lumen_core::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IccError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            IccError::InvalidProfile(_) => ErrorKind::InvalidInput,
            IccError::CreateFailed(_) | IccError::TransformFailed(_) => ErrorKind::UnsupportedProfile,
            IccError::Unsupported(_) => ErrorKind::UnsupportedProfile,
            IccError::InvalidParameters(_) => ErrorKind::InvalidParameters,
            IccError::Core(e) => e.kind(),
            IccError::Io(_) => ErrorKind::Io,
        }
    }
}

//! Error types and result mapping

use serde::Serialize;
use thiserror::Error;

/// Result type alias for conformance checks
pub type Result<T> = std::result::Result<T, ApiError>;

/// Error raised by a pipeline component
///
/// The first five variants are the classifications callers act on. The
/// platform variants only surface from transport or configuration failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("discovery failed: {message}")]
    DiscoveryFailed { message: String },

    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("unsupported format: {message}")]
    UnsupportedFormat { message: String },

    #[error("verification failed: {message}")]
    VerificationFailed { message: String },

    #[error("upstream error: {message}")]
    UpstreamError { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ApiError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn discovery_failed(message: impl Into<String>) -> Self {
        Self::DiscoveryFailed {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn unsupported_format(message: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            message: message.into(),
        }
    }

    pub fn verification_failed(message: impl Into<String>) -> Self {
        Self::VerificationFailed {
            message: message.into(),
        }
    }

    pub fn upstream_error(message: impl Into<String>) -> Self {
        Self::UpstreamError {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidArgument { .. } => 400,
            Self::DiscoveryFailed { .. } => 502,
            Self::Unauthorized { .. } => 401,
            Self::UnsupportedFormat { .. } => 415,
            Self::VerificationFailed { .. } => 401,
            Self::UpstreamError { .. } => 502,
            Self::Internal { .. } => 500,
        }
    }

    /// Get the error key for this error
    pub fn error_key(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::DiscoveryFailed { .. } => "discovery_failed",
            Self::Unauthorized { .. } => "unauthorized",
            Self::UnsupportedFormat { .. } => "unsupported_format",
            Self::VerificationFailed { .. } => "verification_failed",
            Self::UpstreamError { .. } => "upstream_error",
            Self::Internal { .. } => "internal_error",
        }
    }

    /// Whether this error belongs to the classifications a caller can act on,
    /// as opposed to a platform failure
    pub fn is_classified(&self) -> bool {
        !matches!(self, Self::UpstreamError { .. } | Self::Internal { .. })
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            error: err.error_key().to_string(),
            message: err.to_string(),
            status: err.status_code(),
        }
    }
}

use std::time::Duration;

use thiserror::Error;

use crate::cancellation::Cancellation;

/// Result type for fetchkit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for fetchkit
///
/// Every failure of a `fetch` ends up as one of these variants, after it has
/// passed through the error transformers of the request.
#[derive(Error, Debug)]
pub enum Error {
    /// No usable URL fragment was accumulated
    #[error("Missing URL: no non-empty url fragment to resolve")]
    MissingUrl,

    /// The server answered with a non-2xx status
    #[error("HTTP {status}: {status_text}")]
    HttpStatus {
        status: http::StatusCode,
        status_text: String,
    },

    /// The timeout branch won the race
    #[error("Request timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// The cancellation branch won the race
    #[error("{}", .0.message())]
    Cancelled(Cancellation),

    /// A transformer rejected its input
    #[error("Transform error: {0}")]
    Transform(String),

    /// Network-related errors from the default transport
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Errors reported by a custom transport
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid request configuration
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Response decoding errors
    #[error("Response parsing error: {0}")]
    ResponseParse(String),

    /// Generic error with custom message
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Create a new timeout error
    pub fn timeout(duration: Duration) -> Self {
        Error::Timeout { duration }
    }

    /// Create a new status error
    pub fn http_status(status: http::StatusCode, status_text: impl Into<String>) -> Self {
        Error::HttpStatus {
            status,
            status_text: status_text.into(),
        }
    }

    /// Create a new transform error
    pub fn transform(message: impl Into<String>) -> Self {
        Error::Transform(message.into())
    }

    /// Create a new transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Error::Transport(message.into())
    }

    /// Create a new invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Error::InvalidRequest(message.into())
    }

    /// Create a new response parsing error
    pub fn response_parse(message: impl Into<String>) -> Self {
        Error::ResponseParse(message.into())
    }

    /// Create a new custom error
    pub fn custom(message: impl Into<String>) -> Self {
        Error::Custom(message.into())
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Check if this is a cancellation error
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled(_))
    }

    /// Check if this is a missing url error
    pub fn is_missing_url(&self) -> bool {
        matches!(self, Error::MissingUrl)
    }

    /// Check if this is a network error
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Transport(_))
    }

    /// Status code carried by a status error
    pub fn status(&self) -> Option<http::StatusCode> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The cancellation handle that pre-empted the request, if any
    pub fn cancellation(&self) -> Option<&Cancellation> {
        match self {
            Error::Cancelled(cancellation) => Some(cancellation),
            _ => None,
        }
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Error::InvalidRequest(format!("Invalid header name: {}", err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Error::InvalidRequest(format!("Invalid header value: {}", err))
    }
}

impl From<http::method::InvalidMethod> for Error {
    fn from(err: http::method::InvalidMethod) -> Self {
        Error::InvalidRequest(format!("Invalid method: {}", err))
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Custom(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Custom(s.to_string())
    }
}

use autopilot_util::http::JsonParseError;
use thiserror::Error;

/// Failure of a single call to the automation service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connection, DNS, invalid url, timeout).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    /// The service answered with a body that does not match the expected shape.
    #[error(transparent)]
    Decode(#[from] JsonParseError),
}

impl ApiError {
    /// Status code for [`ApiError::Status`], `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

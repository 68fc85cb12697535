//! Error types for the spreadsheet client.

use thiserror::Error;

/// Result type alias for spreadsheet client operations.
pub type Result<T> = std::result::Result<T, SheetsClientError>;

/// Errors that can occur talking to the spreadsheet service.
#[derive(Debug, Error)]
pub enum SheetsClientError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API error response from the service
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Authentication error (missing, invalid, or read-only credential)
    #[error("authentication error: {0}")]
    Auth(String),

    /// Invalid request (missing required data, etc.)
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl SheetsClientError {
    /// Create an API error from status and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an auth error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<SheetsClientError> for banca_core::errors::SyncError {
    fn from(error: SheetsClientError) -> Self {
        match &error {
            SheetsClientError::Auth(_) => Self::auth(error.to_string()),
            SheetsClientError::Api { status, .. } if matches!(status, 401 | 403) => {
                Self::auth(error.to_string())
            }
            _ => Self::transport(error.to_string()),
        }
    }
}

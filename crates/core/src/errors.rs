//! Error types for the sync core.

use thiserror::Error;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while synchronizing a sheet against the store.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No confirmed column mapping exists for a sheet. This is a required
    /// user action, not a failure: the caller must confirm a mapping before
    /// the sheet can sync.
    #[error("no confirmed column mapping for sheet '{sheet}'")]
    MappingIncomplete { sheet: String },

    /// Row-level validation failure. Collected per row; never aborts a batch.
    #[error("validation error: {0}")]
    Validation(String),

    /// The destination store rejected a row or batch. Counted and collected;
    /// the remaining rows are still attempted.
    #[error("destination write error: {0}")]
    Write(String),

    /// Write attempted without write-capable credentials. Aborts the write
    /// phase only; a preceding read phase is unaffected.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Network or service failure. Aborts the entire in-flight sync.
    #[error("transport error: {0}")]
    Transport(String),

    /// A sync is already in flight; requests are rejected, never interleaved.
    #[error("a sync is already running")]
    Busy,

    /// Configuration error raised synchronously before any asynchronous work.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a destination write error.
    pub fn write(message: impl Into<String>) -> Self {
        Self::Write(message.into())
    }

    /// Create an auth error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True when the error aborts the whole in-flight sync rather than a
    /// single row or phase.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_is_the_only_fatal_class() {
        assert!(SyncError::transport("connection reset").is_fatal());
        assert!(!SyncError::write("row rejected").is_fatal());
        assert!(!SyncError::auth("no write credential").is_fatal());
        assert!(!SyncError::Busy.is_fatal());
    }
}

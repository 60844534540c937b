//! Unified error types for waystation.
//!
//! Every variant carries a stable code prefix so callers on the MCP surface
//! can tell the failure classes apart without parsing free text.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the interception engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport-level fetch error.
    #[error("NETWORK_FAILURE: {0}")]
    NetworkFailure(String),

    /// The network attempt exceeded its time budget.
    #[error("NETWORK_TIMEOUT: {0}")]
    NetworkTimeout(String),

    /// Requested key absent in all tiers.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Bulk pre-cache at install could not complete.
    #[error("POPULATION_FAILURE: {0}")]
    PopulationFailure(String),

    /// A single stale-tier deletion failed.
    #[error("EVICTION_FAILURE: {tier}: {reason}")]
    EvictionFailure { tier: String, reason: String },

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Invalid input parameters.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Push or control payload could not be decoded.
    #[error("INVALID_PAYLOAD: {0}")]
    InvalidPayload(String),

    /// The notification capability rejected a notification.
    #[error("NOTIFICATION_FAILED: {0}")]
    NotificationFailed(String),

    /// Focusing, opening or claiming a client page failed.
    #[error("CLIENT_FAILED: {0}")]
    ClientFailed(String),
}

impl Error {
    /// Whether this error came from the network attempt itself.
    ///
    /// Strategies recover from these by falling back to the cache.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::NetworkFailure(_) | Error::NetworkTimeout(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidPayload(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidPayload(msg) => (-32602, msg.clone()),
            Error::NetworkFailure(msg) => (-32000, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::NetworkTimeout(msg) => (-32006, msg.clone()),
            Error::PopulationFailure(msg) => (-32013, msg.clone()),
            Error::EvictionFailure { .. } => (-32014, err.to_string()),
            Error::NotificationFailed(msg) => (-32015, msg.clone()),
            Error::ClientFailed(msg) => (-32016, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

// ── Core error types ──
//
// User-facing errors from meraport-core. Per-item failures inside a backup
// or restore never surface here; they are logged and counted. A `CoreError`
// means the whole operation (or migration step) could not proceed.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Prerequisites ────────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Archive ──────────────────────────────────────────────────────
    #[error("Not a valid backup: {message}")]
    InvalidArchive { message: String },

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    // ── Dashboard ────────────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Cannot reach the Dashboard API: {reason}")]
    ConnectionFailed { reason: String },

    #[error("{message}")]
    Api {
        message: String,
        status: Option<u16>,
        endpoint: Option<String>,
    },

    #[error("Operation aborted")]
    Cancelled,

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<meraport_api::Error> for CoreError {
    fn from(err: meraport_api::Error) -> Self {
        match err {
            meraport_api::Error::Api {
                status: status @ (401 | 403),
                message,
                ..
            } => CoreError::AuthenticationFailed {
                message: format!("HTTP {status}: {message}"),
            },
            meraport_api::Error::Api {
                status,
                endpoint,
                message,
            } => CoreError::Api {
                message: format!("Meraki API Error: {message}"),
                status: Some(status),
                endpoint: Some(endpoint),
            },
            meraport_api::Error::Cancelled => CoreError::Cancelled,
            e @ meraport_api::Error::ProxyUnavailable { .. } => CoreError::ConnectionFailed {
                reason: e.to_string(),
            },
            meraport_api::Error::Transport(e) => CoreError::ConnectionFailed {
                reason: e.to_string(),
            },
            meraport_api::Error::InvalidUrl(e) => CoreError::ConnectionFailed {
                reason: format!("Invalid URL: {e}"),
            },
            meraport_api::Error::InvalidApiKey(message) => {
                CoreError::AuthenticationFailed { message }
            }
            meraport_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

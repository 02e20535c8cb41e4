use thiserror::Error;

/// Top-level error type for the `meraport-api` crate.
///
/// 404 and 204 are not errors at this layer; the gateway turns them into
/// [`Reply`](crate::Reply) variants. Everything here means the call failed.
#[derive(Debug, Error)]
pub enum Error {
    // ── Vendor API ──────────────────────────────────────────────────
    /// Non-success status after the retry budget was spent (or a status
    /// that is never retried). `message` is the vendor's `errors` array
    /// joined with `", "`, or a generic status line when the body had none.
    #[error("Meraki API Error: {message}")]
    Api {
        status: u16,
        endpoint: String,
        message: String,
    },

    // ── Cancellation ────────────────────────────────────────────────
    /// The caller's cancellation token fired before the call could finish.
    #[error("Operation aborted")]
    Cancelled,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The relay proxy could not be reached at all.
    #[error("Network request failed. Is the relay proxy running at {url}?")]
    ProxyUnavailable { url: String },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The API key cannot be carried in an HTTP header.
    #[error("Invalid API key: {0}")]
    InvalidApiKey(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON decoding failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// HTTP status carried by the error, if the vendor answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if the API key was rejected or lacks permission.
    pub fn is_auth(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::ProxyUnavailable { .. } => true,
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

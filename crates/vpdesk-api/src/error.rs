use thiserror::Error;

/// Top-level error type for the `vpdesk-api` crate.
///
/// Classifies every HTTP-level failure of the DMS VP endpoints.
/// `vpdesk-core` maps these into the session's user-facing taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// HTTP 401. The bearer token was rejected or has expired.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// The configured token cannot be sent as a header value.
    #[error("Invalid bearer token: {0}")]
    InvalidToken(String),

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Server ──────────────────────────────────────────────────────
    /// Non-2xx response, or a 2xx envelope that reports failure.
    #[error("DMS rejected the request (HTTP {status}): {message}")]
    ServerRejected { status: u16, message: String },

    /// `fetch VP info` answered with `data: null`.
    #[error("No VP record for barcode {barcode}")]
    NotFound { barcode: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if re-authenticating might resolve this error.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Returns `true` if the request never produced a readable response.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout { .. } | Self::Tls(_))
    }
}

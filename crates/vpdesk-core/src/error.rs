// ── Core error types ──
//
// User-facing errors from vpdesk-core. Consumers never match on HTTP
// status codes or JSON parse failures directly; `From<vpdesk_api::Error>`
// folds transport-layer errors into this taxonomy.

use thiserror::Error;

use crate::command::{CommandKind, FETCH_FAILURE_FALLBACK};

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Transport ────────────────────────────────────────────────────
    #[error("Cannot reach the DMS server: {reason}")]
    Transport { reason: String },

    #[error("DMS request timed out after {timeout_secs}s")]
    TimedOut { timeout_secs: u64 },

    #[error("Not authorized: {message}")]
    Unauthorized { message: String },

    // ── Server ───────────────────────────────────────────────────────
    #[error("DMS rejected the request (status {status}): {message}")]
    ServerRejected { status: u16, message: String },

    #[error("Malformed DMS response: {message}")]
    MalformedResponse { message: String },

    #[error("No VP record found for barcode {barcode}")]
    NotFound { barcode: String },

    // ── Session ──────────────────────────────────────────────────────
    #[error("{message}")]
    Validation { message: String },

    #[error("{command} is not permitted: {reason}")]
    NotPermitted { command: CommandKind, reason: String },

    #[error("{command} is already in progress")]
    CommandInFlight { command: CommandKind },

    #[error("No VP session is open")]
    NoSession,

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// The request never produced a readable response.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::TimedOut { .. })
    }

    /// The text an operator sees for this failure.
    ///
    /// Server messages win when present. Auth, transport, and parse
    /// failures always use the fixed text for the command (or for the
    /// fetch when `command` is `None`).
    pub fn operator_message(&self, command: Option<CommandKind>) -> String {
        let fallback = command.map_or(FETCH_FAILURE_FALLBACK, CommandKind::failure_fallback);
        match self {
            Self::ServerRejected { message, .. } if !message.trim().is_empty() => {
                message.trim().to_owned()
            }
            Self::Validation { .. }
            | Self::NotFound { .. }
            | Self::NotPermitted { .. }
            | Self::CommandInFlight { .. }
            | Self::NoSession
            | Self::Config { .. } => self.to_string(),
            Self::Transport { .. }
            | Self::TimedOut { .. }
            | Self::Unauthorized { .. }
            | Self::ServerRejected { .. }
            | Self::MalformedResponse { .. } => fallback.to_owned(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<vpdesk_api::Error> for CoreError {
    fn from(err: vpdesk_api::Error) -> Self {
        match err {
            vpdesk_api::Error::Unauthorized { message } => CoreError::Unauthorized { message },
            vpdesk_api::Error::InvalidToken(reason) => CoreError::Config {
                message: format!("invalid bearer token: {reason}"),
            },
            vpdesk_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::TimedOut { timeout_secs: 0 }
                } else {
                    CoreError::Transport {
                        reason: e.to_string(),
                    }
                }
            }
            vpdesk_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid URL: {e}"),
            },
            vpdesk_api::Error::Timeout { timeout_secs } => CoreError::TimedOut { timeout_secs },
            vpdesk_api::Error::Tls(msg) => CoreError::Transport {
                reason: format!("TLS error: {msg}"),
            },
            vpdesk_api::Error::ServerRejected { status, message } => {
                CoreError::ServerRejected { status, message }
            }
            vpdesk_api::Error::NotFound { barcode } => CoreError::NotFound { barcode },
            vpdesk_api::Error::Deserialization { message, body: _ } => {
                CoreError::MalformedResponse { message }
            }
        }
    }
}

//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and distinct exit codes.

use miette::Diagnostic;
use thiserror::Error;

use vpdesk_config::ConfigError;
use vpdesk_core::{CommandKind, CoreError};

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const REJECTED: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the DMS server: {reason}")]
    #[diagnostic(
        code(vpdesk::connection_failed),
        help(
            "Check the server URL and your network.\n\
             For a self-signed test server, try --insecure (-k) or set ca_cert in your profile."
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(vpdesk::timeout),
        help("Increase the timeout with --timeout, then retry. Nothing was changed locally.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Not authorized: {message}")]
    #[diagnostic(
        code(vpdesk::auth_failed),
        help(
            "Your operator token was refused; it may have expired.\n\
             Store a fresh one with: vpdesk config set-token --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No token configured for profile '{profile}'")]
    #[diagnostic(
        code(vpdesk::no_credentials),
        help(
            "Configure a token with: vpdesk config init\n\
             Or set the VPDESK_TOKEN environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── VP records ───────────────────────────────────────────────────
    #[error("No VP record found for barcode '{barcode}'")]
    #[diagnostic(
        code(vpdesk::not_found),
        help("Check the barcode, or search with: vpdesk vp list --search <text>")
    )]
    NotFound { barcode: String },

    #[error("{message}")]
    #[diagnostic(code(vpdesk::rejected))]
    Rejected { status: u16, message: String },

    #[error("{command} is not available: {reason}")]
    #[diagnostic(
        code(vpdesk::not_permitted),
        help("Run: vpdesk vp info <barcode> to see what the record allows next")
    )]
    NotPermitted { command: CommandKind, reason: String },

    #[error("{message}")]
    #[diagnostic(
        code(vpdesk::malformed_response),
        help("The server answered with something vpdesk could not read. Re-run with -vv for details.")
    )]
    Malformed { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(vpdesk::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(vpdesk::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: vpdesk config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(vpdesk::no_config),
        help(
            "Create one with: vpdesk config init\n\
             Or pass --api-url and --token.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("{0}")]
    #[diagnostic(code(vpdesk::config))]
    Config(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(vpdesk::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(vpdesk::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Rejected { .. } | Self::NotPermitted { .. } => exit_code::REJECTED,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the active profile to an auth failure.
    pub fn for_profile(self, profile_name: &str) -> Self {
        match self {
            Self::AuthFailed { message, .. } => Self::AuthFailed {
                profile: profile_name.into(),
                message,
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Transport { reason } => CliError::ConnectionFailed { reason },
            CoreError::TimedOut { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            CoreError::Unauthorized { message } => CliError::AuthFailed {
                profile: "default".into(),
                message,
            },
            CoreError::ServerRejected { status, message } => CliError::Rejected {
                status,
                message: if message.trim().is_empty() {
                    format!("DMS rejected the request (status {status})")
                } else {
                    message
                },
            },
            CoreError::MalformedResponse { message } => CliError::Malformed { message },
            CoreError::NotFound { barcode } => CliError::NotFound { barcode },
            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::NotPermitted { command, reason } => {
                CliError::NotPermitted { command, reason }
            }
            CoreError::CommandInFlight { command } => CliError::NotPermitted {
                command,
                reason: "already in progress".into(),
            },
            err @ CoreError::NoSession => CliError::Config(err.to_string()),
            CoreError::Config { message } => CliError::Config(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: "(none)".into(),
            },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(other.to_string()),
        }
    }
}

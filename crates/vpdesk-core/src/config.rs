// ── Runtime configuration ──
//
// These types describe how to reach the DMS server and how a VP session
// behaves. They carry credentials and tuning but never touch disk; the
// CLI builds them from its profile and hands them in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::overlay::OverlayRetention;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed certs on a test server).
    DangerAcceptInvalid,
}

/// How to reach one DMS server.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Server base URL (e.g., `https://dms.example.gov.bd`).
    pub url: Url,
    /// Bearer token of the signed-in operator.
    pub token: SecretString,
    pub tls: TlsVerification,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

/// Tuning for a `VpSession`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How often the expiry clock re-evaluates the effective view.
    pub tick_interval: Duration,
    /// Upper bound on any single gateway call.
    pub command_timeout: Duration,
    /// Local OTP lifetime used when the server reports none.
    pub otp_ttl: Option<Duration>,
    pub overlay_retention: OverlayRetention,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            command_timeout: Duration::from_secs(30),
            otp_ttl: None,
            overlay_retention: OverlayRetention::default(),
        }
    }
}

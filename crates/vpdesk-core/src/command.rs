// ── Command API ──
//
// Every mutation of a VP record is one of three commands. The session
// gates and validates a `Request`, then hands a `GatewayCall` to the
// gateway once its preconditions hold.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

use crate::error::CoreError;

/// The three VP mutations an operator can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    #[strum(to_string = "Receive VP money")]
    Receive,
    #[strum(to_string = "Send payment OTP")]
    SendOtp,
    #[strum(to_string = "Pay with OTP")]
    PayWithOtp,
}

impl CommandKind {
    /// Message logged when the server confirms without saying anything.
    pub fn success_fallback(self) -> &'static str {
        match self {
            Self::Receive => "VP money received successfully",
            Self::SendOtp => "OTP sent successfully",
            Self::PayWithOtp => "VP money paid successfully",
        }
    }

    /// Message logged for failures that carry no usable server text.
    pub fn failure_fallback(self) -> &'static str {
        match self {
            Self::Receive => "Error receiving VP Money",
            Self::SendOtp => "Error sending VP OTP",
            Self::PayWithOtp => "Error Paying VP Money",
        }
    }
}

/// Fallback for a failed record fetch.
pub const FETCH_FAILURE_FALLBACK: &str = "Error loading VP information";

/// An operator request, before gating and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Receive,
    SendOtp,
    PayWithOtp { otp: String },
}

impl Request {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Receive => CommandKind::Receive,
            Self::SendOtp => CommandKind::SendOtp,
            Self::PayWithOtp { .. } => CommandKind::PayWithOtp,
        }
    }
}

/// A request that passed the gate, ready for the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Receive,
    SendOtp,
    PayWithOtp(Otp),
}

impl GatewayCall {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Receive => CommandKind::Receive,
            Self::SendOtp => CommandKind::SendOtp,
            Self::PayWithOtp(_) => CommandKind::PayWithOtp,
        }
    }
}

// ── OTP ──────────────────────────────────────────────────────────────

/// Exactly six ASCII digits.
#[derive(Clone, PartialEq, Eq)]
pub struct Otp(String);

impl Otp {
    pub const LEN: usize = 6;

    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        if raw.len() == Self::LEN && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(raw.to_owned()))
        } else {
            Err(CoreError::Validation {
                message: "Please enter a valid 6-digit OTP".into(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Otp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Otp(******)")
    }
}

// ── Receipt ──────────────────────────────────────────────────────────

/// What the server said when it accepted a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionReceipt {
    pub kind: CommandKind,
    pub message: String,
    pub status_code: u16,
    /// Absolute OTP expiry, when the server reports one.
    pub otp_expires_at: Option<DateTime<Utc>>,
    /// Relative OTP lifetime, when the server reports one.
    #[serde(with = "optional_secs")]
    pub otp_ttl: Option<Duration>,
}

impl ActionReceipt {
    /// A bare success receipt with no OTP hints.
    pub fn ok(kind: CommandKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: 200,
            otp_expires_at: None,
            otp_ttl: None,
        }
    }

    /// The server's message, or the fixed success text if it sent none.
    pub fn display_message(&self) -> &str {
        let trimmed = self.message.trim();
        if trimmed.is_empty() {
            self.kind.success_fallback()
        } else {
            trimmed
        }
    }
}

mod optional_secs {
    use std::time::Duration;

    use serde::Serializer;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn otp_requires_exactly_six_digits() {
        assert!(Otp::parse("123456").is_ok());
        for bad in ["", "12345", "1234567", "12a456", " 23456", "１２３４５６"] {
            assert!(
                matches!(Otp::parse(bad), Err(CoreError::Validation { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn otp_debug_is_redacted() {
        let otp = Otp::parse("987654").unwrap();
        assert_eq!(format!("{otp:?}"), "Otp(******)");
    }

    #[test]
    fn receipt_falls_back_to_fixed_success_text() {
        let receipt = ActionReceipt::ok(CommandKind::SendOtp, "  ");
        assert_eq!(receipt.display_message(), "OTP sent successfully");

        let receipt = ActionReceipt::ok(CommandKind::Receive, "Received by counter 3");
        assert_eq!(receipt.display_message(), "Received by counter 3");
    }
}

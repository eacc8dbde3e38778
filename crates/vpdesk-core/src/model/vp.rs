// ── VP record domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Whether the counter has taken the VP amount from the recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ReceivedStatus {
    Pending,
    Received,
}

/// Server-side OTP lifecycle for a VP payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum OtpStatus {
    #[strum(to_string = "Pending", serialize = "pending")]
    Pending,
    #[strum(to_string = "Sent Success", serialize = "sent_success")]
    SentSuccess,
    #[strum(to_string = "Sent Failed", serialize = "sent_failed")]
    SentFailed,
    #[strum(to_string = "Verified", serialize = "verified")]
    Verified,
}

/// Whether the VP amount has been paid out to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum PaidStatus {
    Pending,
    Paid,
}

/// A monetary amount kept as the decimal text the server sent.
///
/// Amounts are display-only here; nothing in the session does arithmetic
/// on them, so the server's formatting is preserved as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(String);

impl Money {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Empty, `"0"`, and single-character placeholders count as absent.
    pub fn is_present(&self) -> bool {
        self.0.chars().count() > 1 && self.0 != "0"
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_present() {
            f.write_str(&self.0)
        } else {
            f.write_str("N/A")
        }
    }
}

/// A post office branch reference. Fields the server filled with
/// placeholders are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub code: Option<String>,
    pub name: Option<String>,
    pub bn_name: Option<String>,
}

/// Display-only fields. No session logic reads these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpDetails {
    pub booking_id: Option<String>,
    pub form_number: Option<String>,
    pub service_type: Option<String>,
    pub service_type_name: Option<String>,
    pub event_type: Option<String>,
    pub booked_branch: Branch,
    pub delivery_branch: Branch,
    pub sender_name: Option<String>,
    pub sender_phone: Option<String>,
    pub created_by: Option<String>,
    pub created_at: Option<String>,
    pub received_by: Option<String>,
    pub received_at: Option<String>,
    pub paid_by: Option<String>,
    pub paid_at: Option<String>,
    pub otp_verified_at: Option<String>,
}

/// Authoritative VP record, owned by the server and fetched per barcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpRecord {
    pub id: Option<i64>,
    pub barcode: String,
    pub received_status: ReceivedStatus,
    pub otp_status: OtpStatus,
    /// Only meaningful while `otp_status` is `SentSuccess`.
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub paid_status: PaidStatus,
    pub payable_amount: Money,
    pub commission: Money,
    pub total_vp_cost: Money,
    pub details: VpDetails,
}

impl VpRecord {
    /// A minimal record in its initial state, mostly for tests and fakes.
    pub fn pending(barcode: impl Into<String>) -> Self {
        Self {
            id: None,
            barcode: barcode.into(),
            received_status: ReceivedStatus::Pending,
            otp_status: OtpStatus::Pending,
            otp_expires_at: None,
            paid_status: PaidStatus::Pending,
            payable_amount: Money::default(),
            commission: Money::default(),
            total_vp_cost: Money::default(),
            details: VpDetails::default(),
        }
    }

    pub fn is_received(&self) -> bool {
        self.received_status == ReceivedStatus::Received
    }

    pub fn is_paid(&self) -> bool {
        self.paid_status == PaidStatus::Paid
    }

    /// Verified or paid: no overlay may override what the server reports.
    pub fn is_settled(&self) -> bool {
        self.is_paid() || self.otp_status == OtpStatus::Verified
    }

    /// `paid ⇒ verified ⇒ received`.
    pub fn is_consistent(&self) -> bool {
        let verified = self.otp_status == OtpStatus::Verified;
        (!self.is_paid() || verified) && (!verified || self.is_received())
    }
}

// ── Optimistic OTP overlay ──
//
// Session-local belief that an OTP was just issued. It bridges the gap
// between a successful `send OTP` and the refetched record confirming it,
// and never outlives the session that created it.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::debug;

use crate::model::{OtpStatus, VpRecord};

/// When an active overlay gives way to the fetched record.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum OverlayRetention {
    /// Drop the overlay once a fetched record reports the OTP as sent.
    #[default]
    ClearOnConfirm,
    /// Keep the overlay until the session closes.
    UntilClose,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OptimisticOverlay {
    pub otp_just_sent: bool,
    pub optimistic_expires_at: Option<DateTime<Utc>>,
}

impl OptimisticOverlay {
    pub fn is_active(&self) -> bool {
        self.otp_just_sent
    }

    /// Record a successful send. Expiry is `now + ttl` when a lifetime is
    /// known, otherwise left open.
    pub fn mark_otp_sent(&mut self, now: DateTime<Utc>, ttl: Option<Duration>) {
        let expires_at = ttl
            .and_then(|ttl| TimeDelta::from_std(ttl).ok())
            .and_then(|delta| now.checked_add_signed(delta));
        self.mark_otp_sent_until(expires_at);
    }

    /// Record a successful send with an absolute expiry from the server.
    pub fn mark_otp_sent_until(&mut self, expires_at: Option<DateTime<Utc>>) {
        self.otp_just_sent = true;
        self.optimistic_expires_at = expires_at;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Fold a freshly fetched record into the overlay. Returns `true` if
    /// the overlay was cleared.
    ///
    /// A settled record clears it under every policy. Otherwise only
    /// `ClearOnConfirm` yields, and only to a record that shows the OTP
    /// as sent.
    pub fn reconcile(&mut self, record: &VpRecord, retention: OverlayRetention) -> bool {
        if !self.is_active() {
            return false;
        }
        let superseded = record.is_settled()
            || (retention == OverlayRetention::ClearOnConfirm
                && record.otp_status == OtpStatus::SentSuccess);
        if superseded {
            debug!(barcode = %record.barcode, otp = %record.otp_status, "optimistic overlay cleared");
            self.reset();
        }
        superseded
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::model::{PaidStatus, ReceivedStatus};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap_or_default()
    }

    fn record(otp: OtpStatus) -> VpRecord {
        let mut record = VpRecord::pending("EV1BD");
        record.received_status = ReceivedStatus::Received;
        record.otp_status = otp;
        record
    }

    #[test]
    fn mark_with_ttl_sets_absolute_expiry() {
        let mut overlay = OptimisticOverlay::default();
        overlay.mark_otp_sent(t0(), Some(Duration::from_secs(300)));
        assert!(overlay.is_active());
        assert_eq!(overlay.optimistic_expires_at, Some(t0() + TimeDelta::minutes(5)));
    }

    #[test]
    fn mark_without_ttl_leaves_expiry_open() {
        let mut overlay = OptimisticOverlay::default();
        overlay.mark_otp_sent(t0(), None);
        assert!(overlay.is_active());
        assert_eq!(overlay.optimistic_expires_at, None);
    }

    #[test]
    fn clear_on_confirm_yields_to_sent_success() {
        let mut overlay = OptimisticOverlay::default();
        overlay.mark_otp_sent(t0(), None);

        assert!(!overlay.reconcile(&record(OtpStatus::Pending), OverlayRetention::ClearOnConfirm));
        assert!(overlay.is_active());

        assert!(overlay.reconcile(&record(OtpStatus::SentSuccess), OverlayRetention::ClearOnConfirm));
        assert_eq!(overlay, OptimisticOverlay::default());
    }

    #[test]
    fn until_close_holds_except_for_settled_records() {
        let mut overlay = OptimisticOverlay::default();
        overlay.mark_otp_sent(t0(), None);

        assert!(!overlay.reconcile(&record(OtpStatus::SentSuccess), OverlayRetention::UntilClose));
        assert!(overlay.is_active());

        let mut paid = record(OtpStatus::Verified);
        paid.paid_status = PaidStatus::Paid;
        assert!(overlay.reconcile(&paid, OverlayRetention::UntilClose));
        assert!(!overlay.is_active());
    }

    #[test]
    fn retention_parses_from_config_text() {
        assert_eq!(
            "until-close".parse::<OverlayRetention>().ok(),
            Some(OverlayRetention::UntilClose)
        );
        assert_eq!(OverlayRetention::ClearOnConfirm.to_string(), "clear-on-confirm");
    }
}

// ── Effective view ──
//
// Pure combination of the fetched record, the optimistic overlay, and the
// current instant. Recomputed on every fetch, command result, and tick.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

use crate::model::{OtpStatus, VpRecord};
use crate::overlay::OptimisticOverlay;

/// OTP status as shown to the operator. `Expired` never comes from the
/// server; it is derived from the expiry and the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum DisplayOtpStatus {
    Pending,
    #[strum(to_string = "Sent Success")]
    SentSuccess,
    #[strum(to_string = "Sent Failed")]
    SentFailed,
    Verified,
    Expired,
}

impl From<OtpStatus> for DisplayOtpStatus {
    fn from(status: OtpStatus) -> Self {
        match status {
            OtpStatus::Pending => Self::Pending,
            OtpStatus::SentSuccess => Self::SentSuccess,
            OtpStatus::SentFailed => Self::SentFailed,
            OtpStatus::Verified => Self::Verified,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EffectiveView {
    pub effective_otp_status: OtpStatus,
    pub effective_expires_at: Option<DateTime<Utc>>,
    pub is_expired: bool,
    pub display_otp_status: DisplayOtpStatus,
}

impl EffectiveView {
    /// Time left before the effective expiry, if one is known and not
    /// yet reached.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        if self.is_expired {
            return None;
        }
        self.effective_expires_at
            .and_then(|at| (at - now).to_std().ok())
    }
}

/// Combine server truth with the overlay at `now`.
///
/// The overlay only contributes while it is active and the record is not
/// yet verified or paid. While it does, its expiry replaces the record's
/// outright, even when unknown. An unknown expiry never counts as expired.
pub fn merge(record: &VpRecord, overlay: &OptimisticOverlay, now: DateTime<Utc>) -> EffectiveView {
    let use_overlay = overlay.is_active() && !record.is_settled();

    let (effective_otp_status, effective_expires_at) = if use_overlay {
        (OtpStatus::SentSuccess, overlay.optimistic_expires_at)
    } else {
        (record.otp_status, record.otp_expires_at)
    };

    let is_expired = effective_otp_status == OtpStatus::SentSuccess
        && effective_expires_at.is_some_and(|at| now >= at);

    let display_otp_status = if is_expired {
        DisplayOtpStatus::Expired
    } else {
        effective_otp_status.into()
    };

    EffectiveView {
        effective_otp_status,
        effective_expires_at,
        is_expired,
        display_otp_status,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{PaidStatus, ReceivedStatus};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap_or_default()
    }

    fn received(otp: OtpStatus, expires_at: Option<DateTime<Utc>>) -> VpRecord {
        let mut record = VpRecord::pending("EV1BD");
        record.received_status = ReceivedStatus::Received;
        record.otp_status = otp;
        record.otp_expires_at = expires_at;
        record
    }

    fn active_overlay(expires_at: Option<DateTime<Utc>>) -> OptimisticOverlay {
        let mut overlay = OptimisticOverlay::default();
        overlay.mark_otp_sent_until(expires_at);
        overlay
    }

    #[test]
    fn inactive_overlay_passes_record_through() {
        let record = received(OtpStatus::SentFailed, None);
        let view = merge(&record, &OptimisticOverlay::default(), t0());
        assert_eq!(view.effective_otp_status, OtpStatus::SentFailed);
        assert_eq!(view.display_otp_status, DisplayOtpStatus::SentFailed);
        assert!(!view.is_expired);
    }

    #[test]
    fn active_overlay_shows_sent_success_over_stale_record() {
        let record = received(OtpStatus::Pending, None);
        let view = merge(&record, &active_overlay(None), t0());
        assert_eq!(view.effective_otp_status, OtpStatus::SentSuccess);
        assert_eq!(view.display_otp_status, DisplayOtpStatus::SentSuccess);
        assert_eq!(view.effective_expires_at, None);
    }

    #[test]
    fn overlay_expiry_wins_over_record_expiry() {
        let record = received(OtpStatus::SentSuccess, Some(t0() + TimeDelta::minutes(1)));
        let overlay = active_overlay(Some(t0() + TimeDelta::minutes(5)));
        let view = merge(&record, &overlay, t0() + TimeDelta::minutes(2));
        assert_eq!(view.effective_expires_at, Some(t0() + TimeDelta::minutes(5)));
        assert!(!view.is_expired);
    }

    #[test]
    fn overlay_without_expiry_hides_lapsed_record_expiry() {
        let record = received(OtpStatus::SentSuccess, Some(t0()));
        let mut overlay = OptimisticOverlay::default();
        overlay.mark_otp_sent(t0() + TimeDelta::minutes(1), None);

        let view = merge(&record, &overlay, t0() + TimeDelta::minutes(1));
        assert_eq!(view.effective_expires_at, None);
        assert!(!view.is_expired);
        assert_eq!(view.display_otp_status, DisplayOtpStatus::SentSuccess);
    }

    #[test]
    fn expiry_is_inclusive_at_the_boundary() {
        let at = t0() + TimeDelta::seconds(30);
        let record = received(OtpStatus::SentSuccess, Some(at));
        let overlay = OptimisticOverlay::default();

        let before = merge(&record, &overlay, at - TimeDelta::milliseconds(1));
        assert!(!before.is_expired);
        assert_eq!(before.remaining(at - TimeDelta::seconds(10)), Some(Duration::from_secs(10)));

        let exactly = merge(&record, &overlay, at);
        assert!(exactly.is_expired);
        assert_eq!(exactly.remaining(at), None);
    }

    #[test]
    fn unknown_expiry_never_expires() {
        let record = received(OtpStatus::SentSuccess, None);
        let view = merge(&record, &OptimisticOverlay::default(), t0() + TimeDelta::days(365));
        assert!(!view.is_expired);
        assert_eq!(view.display_otp_status, DisplayOtpStatus::SentSuccess);
    }

    #[test]
    fn settled_record_ignores_overlay() {
        let mut record = received(OtpStatus::Verified, None);
        record.paid_status = PaidStatus::Paid;
        let overlay = active_overlay(Some(t0()));
        let view = merge(&record, &overlay, t0() + TimeDelta::hours(1));
        assert_eq!(view.effective_otp_status, OtpStatus::Verified);
        assert_eq!(view.display_otp_status, DisplayOtpStatus::Verified);
        assert!(!view.is_expired);
    }

    #[test]
    fn expired_only_applies_to_sent_success() {
        let record = received(OtpStatus::SentFailed, Some(t0()));
        let view = merge(&record, &OptimisticOverlay::default(), t0() + TimeDelta::hours(1));
        assert!(!view.is_expired);
        assert_eq!(view.display_otp_status, DisplayOtpStatus::SentFailed);
    }

    #[test]
    fn merge_is_deterministic() {
        let record = received(OtpStatus::SentSuccess, Some(t0() + TimeDelta::minutes(1)));
        let overlay = active_overlay(None);
        let now = t0() + TimeDelta::seconds(42);
        assert_eq!(merge(&record, &overlay, now), merge(&record, &overlay, now));
    }
}

// ── API-to-domain type conversions ──
//
// Bridges raw `vpdesk_api` wire records into canonical `VpRecord`s.
// Status strings are matched case-insensitively; anything unrecognised is
// a malformed response rather than a silent default.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use vpdesk_api::VpRecordWire;

use crate::error::CoreError;
use crate::model::{Branch, Money, OtpStatus, PaidStatus, ReceivedStatus, VpDetails, VpRecord};

// ── Helpers ────────────────────────────────────────────────────────

/// Placeholder text the server uses for missing values.
fn display_field(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.chars().count() <= 1 || trimmed.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

fn branch(code: &str, name: &str, bn_name: &str) -> Branch {
    Branch {
        code: display_field(code).filter(|c| c != "9999"),
        name: display_field(name).filter(|n| n != "Unknown Branch"),
        bn_name: display_field(bn_name),
    }
}

fn parse_status<T: std::str::FromStr>(field: &str, raw: &str) -> Result<T, CoreError> {
    raw.trim().parse().map_err(|_| CoreError::MalformedResponse {
        message: format!("unrecognised {field} {raw:?}"),
    })
}

/// Parse a server timestamp. RFC 3339 first, then naive forms read as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

// ── VP record ──────────────────────────────────────────────────────

impl TryFrom<VpRecordWire> for VpRecord {
    type Error = CoreError;

    fn try_from(w: VpRecordWire) -> Result<Self, Self::Error> {
        let received_status: ReceivedStatus = parse_status("received_status", &w.received_status)?;
        let otp_status: OtpStatus = parse_status("otp_status", &w.otp_status)?;
        let paid_status: PaidStatus = parse_status("paid_status", &w.paid_status)?;

        let otp_expires_at = parse_timestamp(&w.otp_expired_at);
        if otp_expires_at.is_none() && !w.otp_expired_at.trim().is_empty() {
            warn!(raw = %w.otp_expired_at, "ignoring unparseable otp_expired_at");
        }

        let mut record = VpRecord {
            id: w.id,
            barcode: w.article_barcode.trim().to_owned(),
            received_status,
            otp_status,
            otp_expires_at,
            paid_status,
            payable_amount: Money::new(w.payable_amount),
            commission: Money::new(w.commission),
            total_vp_cost: Money::new(w.total_vp_cost),
            details: VpDetails {
                booking_id: display_field(&w.booking_id),
                form_number: display_field(&w.form_number),
                service_type: display_field(&w.article_service_type),
                service_type_name: display_field(&w.article_service_type_name),
                event_type: display_field(&w.article_event_type),
                booked_branch: branch(
                    &w.booked_branch_code,
                    &w.booked_branch_name,
                    &w.booked_branch_bn_name,
                ),
                delivery_branch: branch(
                    &w.delivery_branch_code,
                    &w.delivery_branch_name,
                    &w.delivery_branch_bn_name,
                ),
                sender_name: display_field(&w.sender_name),
                sender_phone: display_field(&w.sender_phone),
                created_by: display_field(&w.created_by_name),
                created_at: display_field(&w.created_at),
                received_by: display_field(&w.received_by_name),
                received_at: display_field(&w.received_at),
                paid_by: display_field(&w.paid_by_name),
                paid_at: display_field(&w.paid_at),
                otp_verified_at: display_field(&w.otp_verified_at),
            },
        };

        // A paid record is terminal; its predecessors are implied.
        if !record.is_consistent() {
            warn!(
                barcode = %record.barcode,
                received = %record.received_status,
                otp = %record.otp_status,
                paid = %record.paid_status,
                "server returned inconsistent VP statuses"
            );
            if record.is_paid() {
                record.otp_status = OtpStatus::Verified;
            }
            if record.otp_status == OtpStatus::Verified {
                record.received_status = ReceivedStatus::Received;
            }
        }

        Ok(record)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn wire(received: &str, otp: &str, paid: &str) -> VpRecordWire {
        VpRecordWire {
            article_barcode: "EV1BD".into(),
            received_status: received.into(),
            otp_status: otp.into(),
            paid_status: paid.into(),
            ..VpRecordWire::default()
        }
    }

    #[test]
    fn statuses_are_parsed_tolerantly() {
        let record = VpRecord::try_from(wire("received", "Sent Success", "PENDING"))
            .unwrap();
        assert_eq!(record.received_status, ReceivedStatus::Received);
        assert_eq!(record.otp_status, OtpStatus::SentSuccess);
        assert_eq!(record.paid_status, PaidStatus::Pending);
    }

    #[test]
    fn unknown_status_is_malformed() {
        let result = VpRecord::try_from(wire("Received", "bounced", "Pending"));
        assert!(matches!(result, Err(CoreError::MalformedResponse { .. })));
    }

    #[test]
    fn paid_record_implies_verified_and_received() {
        let record = VpRecord::try_from(wire("Pending", "sent_success", "Paid"))
            .unwrap();
        assert!(record.is_consistent());
        assert_eq!(record.otp_status, OtpStatus::Verified);
        assert_eq!(record.received_status, ReceivedStatus::Received);
    }

    #[test]
    fn placeholders_become_none() {
        let mut w = wire("Pending", "pending", "Pending");
        w.booked_branch_code = "9999".into();
        w.booked_branch_name = "Unknown Branch".into();
        w.sender_name = "0".into();
        w.sender_phone = "01700000000".into();
        let record = VpRecord::try_from(w).unwrap();
        assert_eq!(record.details.booked_branch, Branch::default());
        assert_eq!(record.details.sender_name, None);
        assert_eq!(record.details.sender_phone.as_deref(), Some("01700000000"));
    }

    #[test]
    fn timestamps_accept_rfc3339_and_naive_forms() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 1, 0, 5, 0).single();
        assert_eq!(parse_timestamp("2025-01-01T00:05:00Z"), expected);
        assert_eq!(parse_timestamp("2025-01-01T06:05:00+06:00"), expected);
        assert_eq!(parse_timestamp("2025-01-01 00:05:00"), expected);
        assert_eq!(parse_timestamp("2025-01-01T00:05:00.000"), expected);
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("soon"), None);
    }
}

// ── Domain model ──
//
// Canonical types the session reasons about. Wire shapes live in
// `vpdesk_api::dms::models`; `crate::convert` bridges the two.

pub mod message;
pub mod vp;

pub use message::{MessageLevel, MessageLog, SessionMessage};
pub use vp::{Branch, Money, OtpStatus, PaidStatus, ReceivedStatus, VpDetails, VpRecord};

// ── Action gate ──
//
// Which commands the current view admits. The session evaluates the gate
// again when a command is requested, so a stale affordance in the UI can
// never reach the server.

use serde::Serialize;

use crate::command::CommandKind;
use crate::merge::{DisplayOtpStatus, EffectiveView};
use crate::model::{OtpStatus, VpRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionGate {
    pub can_receive: bool,
    pub can_send_otp: bool,
    pub can_pay_with_otp: bool,
}

impl ActionGate {
    /// Nothing is allowed; used while no record is loaded.
    pub fn closed() -> Self {
        Self::default()
    }

    pub fn evaluate(record: &VpRecord, view: &EffectiveView) -> Self {
        let payable = record.is_received() && !record.is_paid();
        let display = view.display_otp_status;

        Self {
            can_receive: !record.is_paid() && !record.is_received(),
            can_send_otp: payable
                && matches!(
                    display,
                    DisplayOtpStatus::Pending
                        | DisplayOtpStatus::SentFailed
                        | DisplayOtpStatus::Expired
                ),
            can_pay_with_otp: payable
                && view.effective_otp_status == OtpStatus::SentSuccess
                && !view.is_expired,
        }
    }

    pub fn permits(&self, kind: CommandKind) -> bool {
        match kind {
            CommandKind::Receive => self.can_receive,
            CommandKind::SendOtp => self.can_send_otp,
            CommandKind::PayWithOtp => self.can_pay_with_otp,
        }
    }

    /// Why `kind` is refused for `record` in `view`. `None` if permitted.
    pub fn denial_reason(&self, kind: CommandKind, record: &VpRecord, view: &EffectiveView) -> Option<String> {
        if self.permits(kind) {
            return None;
        }
        let reason = match kind {
            CommandKind::Receive => "VP money has already been received".to_owned(),
            _ if !record.is_received() => "VP money has not been received yet".to_owned(),
            _ if record.is_paid() => "VP money has already been paid".to_owned(),
            CommandKind::SendOtp => {
                format!("OTP status is {}", view.display_otp_status)
            }
            CommandKind::PayWithOtp if view.is_expired => "the OTP has expired".to_owned(),
            CommandKind::PayWithOtp => "no OTP has been sent".to_owned(),
        };
        Some(reason)
    }
}

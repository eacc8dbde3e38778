// ── VP session ──
//
// `state` holds the pure reducer; `crate::controller::VpSession` drives it
// against a gateway and a clock. Observers only ever see `SessionSnapshot`s.

mod state;

use serde::Serialize;
use strum::Display;

pub use state::{Effect, Input, SessionState, Ticket};

use crate::command::CommandKind;
use crate::gate::ActionGate;
use crate::merge::{DisplayOtpStatus, EffectiveView};
use crate::model::{MessageLog, VpRecord};
use crate::overlay::OptimisticOverlay;

/// Where a session stands in the collection flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No record loaded yet.
    #[default]
    Uninitialized,
    /// Money not yet received at the counter.
    Pending,
    /// Received; waiting for an OTP to be (re)sent.
    #[strum(to_string = "Awaiting OTP")]
    AwaitingOtp,
    /// An OTP is live and can be used to pay.
    #[strum(to_string = "OTP issued")]
    OtpIssued,
    /// OTP verified, payout not recorded yet.
    Verified,
    Paid,
}

impl SessionPhase {
    pub fn derive(record: Option<&VpRecord>, view: Option<&EffectiveView>) -> Self {
        let (Some(record), Some(view)) = (record, view) else {
            return Self::Uninitialized;
        };
        if record.is_paid() {
            return Self::Paid;
        }
        if !record.is_received() {
            return Self::Pending;
        }
        match view.display_otp_status {
            DisplayOtpStatus::Verified => Self::Verified,
            DisplayOtpStatus::SentSuccess => Self::OtpIssued,
            DisplayOtpStatus::Pending | DisplayOtpStatus::SentFailed | DisplayOtpStatus::Expired => {
                Self::AwaitingOtp
            }
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Paid
    }
}

/// Commands currently awaiting a server answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InFlight {
    pub receive: bool,
    pub send_otp: bool,
    pub pay_with_otp: bool,
}

impl InFlight {
    pub fn is(&self, kind: CommandKind) -> bool {
        match kind {
            CommandKind::Receive => self.receive,
            CommandKind::SendOtp => self.send_otp,
            CommandKind::PayWithOtp => self.pay_with_otp,
        }
    }

    pub fn set(&mut self, kind: CommandKind, busy: bool) {
        match kind {
            CommandKind::Receive => self.receive = busy,
            CommandKind::SendOtp => self.send_otp = busy,
            CommandKind::PayWithOtp => self.pay_with_otp = busy,
        }
    }

    pub fn any(&self) -> bool {
        self.receive || self.send_otp || self.pay_with_otp
    }
}

/// Everything an observer needs to render a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub barcode: Option<String>,
    pub phase: SessionPhase,
    pub record: Option<VpRecord>,
    pub view: Option<EffectiveView>,
    pub gate: ActionGate,
    pub in_flight: InFlight,
    /// A fetch for this session has not answered yet.
    pub loading: bool,
    pub overlay: OptimisticOverlay,
    pub messages: MessageLog,
}

impl SessionSnapshot {
    pub fn is_open(&self) -> bool {
        self.barcode.is_some()
    }

    /// The gate allows `kind` and it is not already running.
    pub fn can(&self, kind: CommandKind) -> bool {
        self.gate.permits(kind) && !self.in_flight.is(kind)
    }
}

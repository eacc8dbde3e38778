// ── Session reducer ──
//
// All session transitions happen here, synchronously, given an input and
// the current instant. I/O is described as `Effect`s for the controller
// to carry out; their results come back in as inputs.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::{InFlight, SessionPhase, SessionSnapshot};
use crate::command::{ActionReceipt, CommandKind, GatewayCall, Otp, Request};
use crate::error::CoreError;
use crate::gate::ActionGate;
use crate::merge::{EffectiveView, merge};
use crate::model::{MessageLevel, MessageLog, VpRecord};
use crate::overlay::{OptimisticOverlay, OverlayRetention};

/// Identifies one fetch: which session opened it and its order within
/// that session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub generation: u64,
    pub seq: u64,
}

#[derive(Debug, Clone)]
pub enum Input {
    Open {
        barcode: String,
    },
    Refresh,
    Fetched {
        ticket: Ticket,
        result: Result<VpRecord, CoreError>,
    },
    Request(Request),
    Completed {
        generation: u64,
        kind: CommandKind,
        result: Result<ActionReceipt, CoreError>,
    },
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Fetch {
        ticket: Ticket,
        barcode: String,
    },
    Call {
        generation: u64,
        barcode: String,
        call: GatewayCall,
    },
    StartClock,
    StopClock,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    retention: OverlayRetention,
    otp_ttl: Option<Duration>,

    /// Bumped on every open and close. Results tagged with an older
    /// generation are dropped.
    generation: u64,
    issued_seq: u64,
    settled_seq: u64,

    barcode: Option<String>,
    record: Option<VpRecord>,
    overlay: OptimisticOverlay,
    in_flight: InFlight,
    messages: MessageLog,
}

impl SessionState {
    /// `otp_ttl` is the local OTP lifetime used when a successful send
    /// reports no expiry of its own.
    pub fn new(retention: OverlayRetention, otp_ttl: Option<Duration>) -> Self {
        Self {
            retention,
            otp_ttl,
            generation: 0,
            issued_seq: 0,
            settled_seq: 0,
            barcode: None,
            record: None,
            overlay: OptimisticOverlay::default(),
            in_flight: InFlight::default(),
            messages: MessageLog::default(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn barcode(&self) -> Option<&str> {
        self.barcode.as_deref()
    }

    pub fn record(&self) -> Option<&VpRecord> {
        self.record.as_ref()
    }

    pub fn overlay(&self) -> &OptimisticOverlay {
        &self.overlay
    }

    pub fn view(&self, now: DateTime<Utc>) -> Option<EffectiveView> {
        self.record
            .as_ref()
            .map(|record| merge(record, &self.overlay, now))
    }

    pub fn gate(&self, now: DateTime<Utc>) -> ActionGate {
        match &self.record {
            Some(record) => ActionGate::evaluate(record, &merge(record, &self.overlay, now)),
            None => ActionGate::closed(),
        }
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> SessionSnapshot {
        let view = self.view(now);
        SessionSnapshot {
            barcode: self.barcode.clone(),
            phase: SessionPhase::derive(self.record.as_ref(), view.as_ref()),
            record: self.record.clone(),
            view,
            gate: self.gate(now),
            in_flight: self.in_flight,
            loading: self.settled_seq < self.issued_seq,
            overlay: self.overlay,
            messages: self.messages.clone(),
        }
    }

    /// Apply one input at `now`.
    ///
    /// `Err` means the input was refused outright: nothing was dispatched
    /// and, for gate or OTP-shape failures, the reason was logged.
    pub fn apply(&mut self, input: Input, now: DateTime<Utc>) -> Result<Vec<Effect>, CoreError> {
        match input {
            Input::Open { barcode } => self.open(&barcode),
            Input::Refresh => {
                let barcode = self.barcode.clone().ok_or(CoreError::NoSession)?;
                Ok(vec![self.issue_fetch(barcode)])
            }
            Input::Fetched { ticket, result } => Ok(self.fetched(ticket, result, now)),
            Input::Request(request) => self.request(request, now),
            Input::Completed {
                generation,
                kind,
                result,
            } => Ok(self.completed(generation, kind, result, now)),
            Input::Close => Ok(self.close()),
        }
    }

    // ── Transitions ──────────────────────────────────────────────────

    fn open(&mut self, barcode: &str) -> Result<Vec<Effect>, CoreError> {
        let barcode = barcode.trim();
        if barcode.is_empty() {
            return Err(CoreError::Validation {
                message: "Barcode must not be empty".into(),
            });
        }
        self.reset_session();
        self.barcode = Some(barcode.to_owned());
        info!(barcode, generation = self.generation, "VP session opened");
        Ok(vec![Effect::StartClock, self.issue_fetch(barcode.to_owned())])
    }

    fn close(&mut self) -> Vec<Effect> {
        if let Some(barcode) = &self.barcode {
            info!(barcode = %barcode, "VP session closed");
        }
        self.reset_session();
        vec![Effect::StopClock]
    }

    fn reset_session(&mut self) {
        self.generation += 1;
        self.issued_seq = 0;
        self.settled_seq = 0;
        self.barcode = None;
        self.record = None;
        self.overlay.reset();
        self.in_flight = InFlight::default();
        self.messages.clear();
    }

    fn issue_fetch(&mut self, barcode: String) -> Effect {
        self.issued_seq += 1;
        Effect::Fetch {
            ticket: Ticket {
                generation: self.generation,
                seq: self.issued_seq,
            },
            barcode,
        }
    }

    fn fetched(
        &mut self,
        ticket: Ticket,
        result: Result<VpRecord, CoreError>,
        now: DateTime<Utc>,
    ) -> Vec<Effect> {
        if ticket.generation != self.generation || ticket.seq <= self.settled_seq {
            debug!(?ticket, generation = self.generation, "dropping stale fetch result");
            return Vec::new();
        }
        self.settled_seq = ticket.seq;

        match result {
            Ok(record) => {
                if self.barcode.as_deref() != Some(record.barcode.as_str()) {
                    debug!(
                        requested = ?self.barcode,
                        returned = %record.barcode,
                        "server returned a different barcode spelling"
                    );
                }
                self.overlay.reconcile(&record, self.retention);
                self.record = Some(record);
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch VP information");
                self.log_error(now, None, &e);
            }
        }
        Vec::new()
    }

    fn request(&mut self, request: Request, now: DateTime<Utc>) -> Result<Vec<Effect>, CoreError> {
        let kind = request.kind();
        let barcode = self.barcode.clone().ok_or(CoreError::NoSession)?;

        if self.in_flight.is(kind) {
            return Err(CoreError::CommandInFlight { command: kind });
        }

        if let Err(e) = self.check_gate(kind, now) {
            self.log_error(now, Some(kind), &e);
            return Err(e);
        }

        let call = match request {
            Request::Receive => GatewayCall::Receive,
            Request::SendOtp => GatewayCall::SendOtp,
            Request::PayWithOtp { otp } => match Otp::parse(&otp) {
                Ok(otp) => GatewayCall::PayWithOtp(otp),
                Err(e) => {
                    self.log_error(now, Some(kind), &e);
                    return Err(e);
                }
            },
        };

        self.in_flight.set(kind, true);
        debug!(barcode = %barcode, command = %kind, "dispatching VP command");
        Ok(vec![Effect::Call {
            generation: self.generation,
            barcode,
            call,
        }])
    }

    fn check_gate(&self, kind: CommandKind, now: DateTime<Utc>) -> Result<(), CoreError> {
        let Some(record) = &self.record else {
            return Err(CoreError::NotPermitted {
                command: kind,
                reason: "VP information is not loaded".into(),
            });
        };
        let view = merge(record, &self.overlay, now);
        let gate = ActionGate::evaluate(record, &view);
        match gate.denial_reason(kind, record, &view) {
            None => Ok(()),
            Some(reason) => Err(CoreError::NotPermitted {
                command: kind,
                reason,
            }),
        }
    }

    fn completed(
        &mut self,
        generation: u64,
        kind: CommandKind,
        result: Result<ActionReceipt, CoreError>,
        now: DateTime<Utc>,
    ) -> Vec<Effect> {
        if generation != self.generation {
            debug!(command = %kind, "dropping result for a closed session");
            return Vec::new();
        }
        self.in_flight.set(kind, false);

        match result {
            Ok(receipt) => {
                info!(command = %kind, status = receipt.status_code, "VP command accepted");
                self.messages.push(
                    now,
                    MessageLevel::Info,
                    Some(kind),
                    receipt.display_message(),
                );
                if kind == CommandKind::SendOtp {
                    match receipt.otp_expires_at {
                        Some(at) => self.overlay.mark_otp_sent_until(Some(at)),
                        None => self
                            .overlay
                            .mark_otp_sent(now, receipt.otp_ttl.or(self.otp_ttl)),
                    }
                }
                match self.barcode.clone() {
                    Some(barcode) => vec![self.issue_fetch(barcode)],
                    None => Vec::new(),
                }
            }
            Err(e) => {
                warn!(command = %kind, error = %e, "VP command failed");
                self.log_error(now, Some(kind), &e);
                Vec::new()
            }
        }
    }

    fn log_error(&mut self, now: DateTime<Utc>, kind: Option<CommandKind>, err: &CoreError) {
        self.messages
            .push(now, MessageLevel::Error, kind, err.operator_message(kind));
    }
}

// ── VP session controller ──
//
// Drives a `SessionState` against a gateway and a clock. The state mutex
// is only held while the reducer runs; every gateway call happens with
// the lock released, bounded by `SessionConfig::command_timeout`.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::command::{ActionReceipt, GatewayCall, Request};
use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::gateway::VpGateway;
use crate::model::VpRecord;
use crate::session::{Effect, Input, SessionSnapshot, SessionState};

const MIN_TICK: Duration = Duration::from_millis(10);

// ── VpSession ────────────────────────────────────────────────────

/// One operator's view of one VP record.
///
/// Cheaply cloneable via `Arc<SessionInner>`. Commands from any clone are
/// serialized through the reducer; observers follow along with
/// [`subscribe()`](Self::subscribe).
pub struct VpSession<G> {
    inner: Arc<SessionInner<G>>,
}

impl<G> Clone for VpSession<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SessionInner<G> {
    gateway: G,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    state: Mutex<SessionState>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    cancel: CancellationToken,
    ticker: Mutex<Option<Ticker>>,
}

impl<G> Drop for SessionInner<G> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Ticker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// What running a batch of effects produced.
#[derive(Default)]
struct Outcome {
    fetched: Option<Result<VpRecord, CoreError>>,
    called: Option<Result<ActionReceipt, CoreError>>,
}

impl<G: VpGateway> VpSession<G> {
    /// Create a session on the wall clock. Nothing is fetched until
    /// [`open()`](Self::open).
    pub fn new(gateway: G, config: SessionConfig) -> Self {
        Self::with_clock(gateway, config, Arc::new(SystemClock))
    }

    pub fn with_clock(gateway: G, config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        let state = SessionState::new(config.overlay_retention, config.otp_ttl);
        let (snapshot_tx, _) = watch::channel(state.snapshot(clock.now()));
        Self {
            inner: Arc::new(SessionInner {
                gateway,
                clock,
                config,
                state: Mutex::new(state),
                snapshot_tx,
                cancel: CancellationToken::new(),
                ticker: Mutex::new(None),
            }),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.inner.gateway
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Receive every snapshot change. Unchanged recomputations are not
    /// re-sent.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// The session as of the clock's current instant.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let now = self.inner.clock.now();
        self.inner.state.lock().await.snapshot(now)
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Start a session for `barcode`: reset everything, start the expiry
    /// clock, and fetch the record.
    ///
    /// A failed fetch leaves the session open but uninitialized, with the
    /// failure in the message log.
    pub async fn open(&self, barcode: &str) -> Result<VpRecord, CoreError> {
        let effects = self.apply(Input::Open {
            barcode: barcode.to_owned(),
        })
        .await?;
        self.drive(effects)
            .await
            .fetched
            .unwrap_or(Err(CoreError::NoSession))
    }

    /// Re-fetch the record for the open session.
    pub async fn refresh(&self) -> Result<VpRecord, CoreError> {
        let effects = self.apply(Input::Refresh).await?;
        self.drive(effects)
            .await
            .fetched
            .unwrap_or(Err(CoreError::NoSession))
    }

    /// Discard the session: stop the clock and drop any late results.
    pub async fn close(&self) {
        if let Ok(effects) = self.apply(Input::Close).await {
            self.drive(effects).await;
        }
    }

    /// Stop the clock for good. The session cannot tick after this.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.stop_clock().await;
    }

    pub async fn is_clock_running(&self) -> bool {
        self.inner
            .ticker
            .lock()
            .await
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Re-evaluate the view at the current instant and publish it.
    pub async fn tick(&self) {
        let now = self.inner.clock.now();
        trace!(%now, "expiry clock tick");
        let snapshot = self.inner.state.lock().await.snapshot(now);
        self.publish(snapshot);
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Mark the VP amount as received.
    pub async fn receive(&self) -> Result<ActionReceipt, CoreError> {
        self.execute(Request::Receive).await
    }

    /// Issue (or re-issue) the payment OTP.
    pub async fn send_otp(&self) -> Result<ActionReceipt, CoreError> {
        self.execute(Request::SendOtp).await
    }

    /// Pay out using the OTP the sender read back.
    pub async fn pay_with_otp(&self, otp: &str) -> Result<ActionReceipt, CoreError> {
        self.execute(Request::PayWithOtp {
            otp: otp.to_owned(),
        })
        .await
    }

    async fn execute(&self, request: Request) -> Result<ActionReceipt, CoreError> {
        let kind = request.kind();
        let effects = self.apply(Input::Request(request)).await?;
        self.drive(effects)
            .await
            .called
            .unwrap_or(Err(CoreError::NotPermitted {
                command: kind,
                reason: "nothing was dispatched".into(),
            }))
    }

    // ── Internals ────────────────────────────────────────────────

    /// Run the reducer under the lock and publish the result.
    async fn apply(&self, input: Input) -> Result<Vec<Effect>, CoreError> {
        let now = self.inner.clock.now();
        let mut state = self.inner.state.lock().await;
        let result = state.apply(input, now);
        let snapshot = state.snapshot(now);
        drop(state);
        self.publish(snapshot);
        result
    }

    fn publish(&self, snapshot: SessionSnapshot) {
        self.inner.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    /// Carry out effects, feeding each result back through the reducer
    /// until nothing is left to do.
    async fn drive(&self, effects: Vec<Effect>) -> Outcome {
        let mut queue = VecDeque::from(effects);
        let mut outcome = Outcome::default();

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::StartClock => self.start_clock().await,
                Effect::StopClock => self.stop_clock().await,
                Effect::Fetch { ticket, barcode } => {
                    debug!(barcode = %barcode, seq = ticket.seq, "fetching VP record");
                    let result = self.bounded(self.inner.gateway.fetch_info(&barcode)).await;
                    let follow = self
                        .apply(Input::Fetched {
                            ticket,
                            result: result.clone(),
                        })
                        .await
                        .unwrap_or_default();
                    queue.extend(follow);
                    outcome.fetched = Some(result);
                }
                Effect::Call {
                    generation,
                    barcode,
                    call,
                } => {
                    let kind = call.kind();
                    let result = self.bounded(self.call(&barcode, &call)).await;
                    let follow = self
                        .apply(Input::Completed {
                            generation,
                            kind,
                            result: result.clone(),
                        })
                        .await
                        .unwrap_or_default();
                    queue.extend(follow);
                    outcome.called = Some(result);
                }
            }
        }
        outcome
    }

    async fn call(&self, barcode: &str, call: &GatewayCall) -> Result<ActionReceipt, CoreError> {
        let gateway = &self.inner.gateway;
        match call {
            GatewayCall::Receive => gateway.receive(barcode).await,
            GatewayCall::SendOtp => gateway.send_otp(barcode).await,
            GatewayCall::PayWithOtp(otp) => gateway.pay_with_otp(barcode, otp).await,
        }
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, CoreError>>,
    ) -> Result<T, CoreError> {
        let limit = self.inner.config.command_timeout;
        tokio::time::timeout(limit, fut).await.unwrap_or_else(|_| {
            warn!(timeout_secs = limit.as_secs(), "gateway call timed out");
            Err(CoreError::TimedOut {
                timeout_secs: limit.as_secs(),
            })
        })
    }

    // ── Expiry clock ─────────────────────────────────────────────

    /// Replace the running ticker, if any. The slot stays locked from the
    /// old ticker's cancellation until the new one is stored.
    async fn start_clock(&self) {
        let mut slot = self.inner.ticker.lock().await;
        if let Some(old) = slot.take() {
            old.stop().await;
        }
        if self.inner.cancel.is_cancelled() {
            return;
        }
        // A close that landed after this effect was issued wins.
        if self.inner.state.lock().await.barcode().is_none() {
            return;
        }
        let cancel = self.inner.cancel.child_token();
        let period = self.inner.config.tick_interval.max(MIN_TICK);
        let handle = tokio::spawn(clock_task(
            Arc::downgrade(&self.inner),
            period,
            cancel.clone(),
        ));
        *slot = Some(Ticker { cancel, handle });
        debug!(period_ms = period.as_millis(), "expiry clock started");
    }

    async fn stop_clock(&self) {
        let mut slot = self.inner.ticker.lock().await;
        if let Some(ticker) = slot.take() {
            ticker.stop().await;
        }
    }
}

impl Ticker {
    async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
        debug!("expiry clock stopped");
    }
}

// ── Background task ──────────────────────────────────────────────

/// Holds only a weak reference so a dropped session ends the task.
async fn clock_task<G: VpGateway>(
    session: Weak<SessionInner<G>>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let Some(inner) = session.upgrade() else { break };
                VpSession { inner }.tick().await;
            }
        }
    }
}

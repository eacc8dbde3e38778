//! Session logic for collecting Value-Payable (VP) money at a postal counter.
//!
//! A VP article is paid out in three server-confirmed steps: the counter
//! receives the money, the server texts an OTP to the sender, and the
//! payout is recorded once the sender reads that OTP back. This crate sits
//! between `vpdesk-api` and the CLI:
//!
//! - **[`VpSession`]** drives one barcode through that flow. It serializes
//!   commands, keeps the optimistic OTP overlay, runs the expiry clock, and
//!   publishes [`SessionSnapshot`]s over a `watch` channel.
//!
//! - **[`merge()`]** and **[`ActionGate`]** are the pure rules: what OTP
//!   status the operator sees and which commands that view admits.
//!
//! - **[`VpGateway`]** is the seam to the server. [`DmsGateway`] speaks
//!   HTTP; tests provide scripted fakes.

pub mod clock;
pub mod command;
pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod gate;
pub mod gateway;
pub mod merge;
pub mod model;
pub mod overlay;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use clock::{Clock, ManualClock, SystemClock};
pub use command::{ActionReceipt, CommandKind, Otp};
pub use config::{GatewayConfig, SessionConfig, TlsVerification};
pub use controller::VpSession;
pub use error::CoreError;
pub use gate::ActionGate;
pub use gateway::{DmsGateway, VpGateway, VpPage};
pub use merge::{DisplayOtpStatus, EffectiveView, merge};
pub use model::{
    Branch, MessageLevel, MessageLog, Money, OtpStatus, PaidStatus, ReceivedStatus,
    SessionMessage, VpDetails, VpRecord,
};
pub use overlay::{OptimisticOverlay, OverlayRetention};
pub use session::{InFlight, SessionPhase, SessionSnapshot};

// Query type for `DmsGateway::list`.
pub use vpdesk_api::VpListQuery;

// vpdesk-api: Async Rust client for the DMS Value-Payable (VP) endpoints

pub mod auth;
pub mod dms;
pub mod error;
pub mod transport;

pub use dms::DmsClient;
pub use dms::models::{ActionResponse, VpListQuery, VpListResponse, VpRecordWire};
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};

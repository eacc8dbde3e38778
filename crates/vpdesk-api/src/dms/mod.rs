// DMS API client modules
//
// Hand-written client for the DMS Value-Payable endpoints under `/dms/api/`.

pub mod client;
pub mod models;
pub mod vp;

pub use client::DmsClient;

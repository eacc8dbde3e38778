//! Command handlers: bridge CLI args to the VP session and output formatting.

pub mod config_cmd;
pub mod util;
pub mod vp;

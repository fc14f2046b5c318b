//! Shared utilities for the registry reconciliation workspace.

pub mod logging;
pub mod magnitude;
pub mod time;

pub use logging::{init_logging, LogFormat};
pub use magnitude::{format_magnitude, format_percent, parse_magnitude};
pub use time::format_duration;

//! Timestamp utilities

use chrono::{DateTime, Local, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

/// Local wall-clock time in `YYYY-MM-DD HH:MM:SS` form
///
/// Used for the human-readable compilation stamp written into packages.
pub fn local_stamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

pub mod config;
pub mod ledger;
pub mod mode;
pub mod run;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use shopdesk_application::{Clock, SystemClock};

/// Format of `--at` arguments.
pub const AT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// `--at` value, or the current local time.
pub fn resolve_at(at: Option<&str>) -> Result<NaiveDateTime> {
    match at {
        Some(raw) => NaiveDateTime::parse_from_str(raw.trim(), AT_FORMAT)
            .with_context(|| format!("Invalid --at '{}'; expected YYYY-MM-DD HH:MM", raw)),
        None => Ok(SystemClock.now()),
    }
}

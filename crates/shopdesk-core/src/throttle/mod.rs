//! Per-customer reply throttling.
//!
//! - `model`: ledger rows (`LedgerEntry`, `LedgerStamp`)
//! - `repository`: persistence trait for the flat table
//! - `ledger`: cooldown test and update (`ThrottleLedger`)

mod ledger;
mod model;
mod repository;

pub use ledger::{DEFAULT_COOLDOWN_SECS, ThrottleLedger, default_cooldown};
pub use model::{LEDGER_TIMESTAMP_FORMAT, LedgerEntry, LedgerStamp};
pub use repository::ThrottleRepository;

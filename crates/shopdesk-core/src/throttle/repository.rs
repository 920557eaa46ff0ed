//! Throttle table repository trait.

use async_trait::async_trait;

use super::model::LedgerEntry;
use crate::error::Result;

/// Durable storage for the throttle table.
///
/// The table is small and always handled whole: it is loaded completely at
/// the start of a dispatch cycle and rewritten completely on every update.
/// A missing backing store is an empty table, not an error.
#[async_trait]
pub trait ThrottleRepository: Send + Sync {
    /// Loads every row in stored order.
    async fn load_all(&self) -> Result<Vec<LedgerEntry>>;

    /// Replaces the stored table with `entries`.
    async fn save_all(&self, entries: &[LedgerEntry]) -> Result<()>;
}

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};

use super::model::{LedgerEntry, LedgerStamp};
use super::repository::ThrottleRepository;
use crate::error::Result;

/// Default minimum interval between two automated replies to one customer.
pub const DEFAULT_COOLDOWN_SECS: i64 = 2 * 60 * 60;

pub fn default_cooldown() -> Duration {
    Duration::seconds(DEFAULT_COOLDOWN_SECS)
}

/// In-memory view of the throttle table for one dispatch cycle.
///
/// Holds at most one entry per customer. Entries are only ever overwritten,
/// never expired.
pub struct ThrottleLedger {
    entries: Vec<LedgerEntry>,
    cooldown: Duration,
    repository: Arc<dyn ThrottleRepository>,
}

impl ThrottleLedger {
    /// Loads the full table. Duplicate customer rows collapse onto the first
    /// position with the last stored value.
    pub async fn load(repository: Arc<dyn ThrottleRepository>, cooldown: Duration) -> Result<Self> {
        let mut entries: Vec<LedgerEntry> = Vec::new();
        for row in repository.load_all().await? {
            match entries.iter_mut().find(|e| e.customer == row.customer) {
                Some(existing) => existing.last_reply = row.last_reply,
                None => entries.push(row),
            }
        }

        tracing::debug!(target: "throttle", "Loaded {} ledger entries", entries.len());
        Ok(Self {
            entries,
            cooldown,
            repository,
        })
    }

    /// True when `customer` has no record, or the last reply is strictly
    /// older than the cooldown. Malformed rows never authorize a reply.
    pub fn should_reply(&self, customer: &str, now: NaiveDateTime) -> bool {
        match self.last_reply(customer) {
            None => true,
            Some(LedgerStamp::Valid(at)) => now - *at > self.cooldown,
            Some(LedgerStamp::Malformed(raw)) => {
                tracing::warn!(
                    target: "throttle",
                    "Malformed ledger timestamp for '{}': {:?}; not replying",
                    customer,
                    raw
                );
                false
            }
        }
    }

    /// Upserts `customer` with `now` and rewrites the backing table. The
    /// in-memory view only changes once the table is written.
    pub async fn record_reply(&mut self, customer: &str, now: NaiveDateTime) -> Result<()> {
        // The stored format has minute precision; keep memory consistent with it.
        let stamp = LedgerStamp::parse(&LedgerStamp::Valid(now).to_stored());
        let mut entries = self.entries.clone();
        match entries.iter_mut().find(|e| e.customer == customer) {
            Some(existing) => existing.last_reply = stamp,
            None => entries.push(LedgerEntry::new(customer, stamp)),
        }
        self.repository.save_all(&entries).await?;
        self.entries = entries;
        Ok(())
    }

    pub fn last_reply(&self, customer: &str) -> Option<&LedgerStamp> {
        self.entries
            .iter()
            .find(|e| e.customer == customer)
            .map(|e| &e.last_reply)
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp format of the persisted ledger (`YYYY/MM/DD HH:MM`).
pub const LEDGER_TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M";

/// The stored last-reply time of one customer.
///
/// Rows whose timestamp cannot be parsed are kept verbatim so that the
/// table round-trips; they never authorize a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LedgerStamp {
    Valid(NaiveDateTime),
    Malformed(String),
}

impl LedgerStamp {
    pub fn parse(raw: &str) -> Self {
        match NaiveDateTime::parse_from_str(raw.trim(), LEDGER_TIMESTAMP_FORMAT) {
            Ok(at) => Self::Valid(at),
            Err(_) => Self::Malformed(raw.to_string()),
        }
    }

    /// Text written to the backing table.
    pub fn to_stored(&self) -> String {
        match self {
            Self::Valid(at) => at.format(LEDGER_TIMESTAMP_FORMAT).to_string(),
            Self::Malformed(raw) => raw.clone(),
        }
    }
}

/// One row of the throttle table: `customerName → lastReplyTimestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub customer: String,
    pub last_reply: LedgerStamp,
}

impl LedgerEntry {
    pub fn new(customer: impl Into<String>, last_reply: LedgerStamp) -> Self {
        Self {
            customer: customer.into(),
            last_reply,
        }
    }
}

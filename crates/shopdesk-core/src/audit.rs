//! Navigation audit trail.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One line of the navigation trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavRecord {
    pub at: DateTime<Local>,
    pub url: String,
    pub title: String,
    pub referrer: String,
    pub note: Option<String>,
}

impl NavRecord {
    pub fn new(url: impl Into<String>, title: impl Into<String>, referrer: impl Into<String>) -> Self {
        Self {
            at: Local::now(),
            url: url.into(),
            title: title.into(),
            referrer: referrer.into(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// `[2024-06-11 12:30:00] url=... title=... ref=... note=...`
    pub fn to_line(&self) -> String {
        format!(
            "[{}] url={} title={} ref={} note={}",
            self.at.format("%Y-%m-%d %H:%M:%S"),
            self.url,
            self.title,
            self.referrer,
            self.note.as_deref().unwrap_or("")
        )
    }
}

/// Append-only destination of the audit trail.
pub trait AuditSink: Send + Sync {
    fn append(&self, record: &NavRecord) -> Result<()>;

    /// Free-form line, used for the launch banner.
    fn banner(&self, text: &str) -> Result<()>;
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn append(&self, _record: &NavRecord) -> Result<()> {
        Ok(())
    }

    fn banner(&self, _text: &str) -> Result<()> {
        Ok(())
    }
}

//! Append-only navigation log.

use std::fs::{self, OpenOptions};
use std::io::Write as IoWrite;
use std::path::PathBuf;
use std::sync::Mutex;

use shopdesk_core::audit::{AuditSink, NavRecord};
use shopdesk_core::{Result, ShopdeskError};

/// Writes one line per [`NavRecord`] to a plain text file.
pub struct FileAuditSink {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileAuditSink {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) -> Result<()> {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| ShopdeskError::internal("audit log mutex poisoned"))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

impl AuditSink for FileAuditSink {
    fn append(&self, record: &NavRecord) -> Result<()> {
        self.append_line(&record.to_line())
    }

    fn banner(&self, text: &str) -> Result<()> {
        self.append_line(&format!("\n===== {} =====", text))
    }
}

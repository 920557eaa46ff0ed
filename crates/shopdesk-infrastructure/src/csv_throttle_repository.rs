//! CSV-backed ThrottleRepository.
//!
//! The table is headerless, one `customer,YYYY/MM/DD HH:MM` row per line, and
//! is rewritten in full on every save.

use std::path::PathBuf;

use async_trait::async_trait;
use shopdesk_core::throttle::{LedgerEntry, LedgerStamp, ThrottleRepository};
use shopdesk_core::{Result, ShopdeskError};

use crate::storage::AtomicFile;

pub struct CsvThrottleRepository {
    file: AtomicFile,
}

impl CsvThrottleRepository {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            file: AtomicFile::new(path),
        }
    }

    fn parse(content: &str) -> Result<Vec<LedgerEntry>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut entries = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(csv_error)?;
            let customer = record.get(0).unwrap_or_default();
            if customer.is_empty() {
                continue;
            }
            match record.get(1) {
                Some(stamp) => entries.push(LedgerEntry::new(customer, LedgerStamp::parse(stamp))),
                None => {
                    tracing::warn!(
                        target: "throttle",
                        "Ledger row {} for '{}' has no timestamp; treating as malformed",
                        line + 1,
                        customer
                    );
                    entries.push(LedgerEntry::new(customer, LedgerStamp::Malformed(String::new())));
                }
            }
        }
        Ok(entries)
    }

    fn render(entries: &[LedgerEntry]) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        for entry in entries {
            writer
                .write_record([entry.customer.as_str(), entry.last_reply.to_stored().as_str()])
                .map_err(csv_error)?;
        }
        writer
            .into_inner()
            .map_err(|e| ShopdeskError::serialization("CSV", e.to_string()))
    }
}

fn csv_error(err: csv::Error) -> ShopdeskError {
    ShopdeskError::serialization("CSV", err.to_string())
}

#[async_trait]
impl ThrottleRepository for CsvThrottleRepository {
    async fn load_all(&self) -> Result<Vec<LedgerEntry>> {
        match self.file.read_to_string()? {
            Some(content) => Self::parse(&content),
            None => Ok(Vec::new()),
        }
    }

    async fn save_all(&self, entries: &[LedgerEntry]) -> Result<()> {
        let bytes = Self::render(entries)?;
        self.file.write(&bytes)
    }
}

use std::sync::Arc;

use anyhow::Result;
use shopdesk_core::throttle::{LedgerStamp, ThrottleLedger, ThrottleRepository};
use shopdesk_infrastructure::{CsvThrottleRepository, ShopdeskPaths, TomlSettingsRepository};

use super::{AT_FORMAT, resolve_at};

pub async fn list(paths: &ShopdeskPaths) -> Result<()> {
    let repository = CsvThrottleRepository::with_path(paths.ledger_file());
    let entries = repository.load_all().await?;
    if entries.is_empty() {
        println!("Ledger is empty ({})", paths.ledger_file().display());
        return Ok(());
    }
    for entry in entries {
        let marker = match entry.last_reply {
            LedgerStamp::Valid(_) => "",
            LedgerStamp::Malformed(_) => "  (malformed)",
        };
        println!("{}\t{}{}", entry.customer, entry.last_reply.to_stored(), marker);
    }
    Ok(())
}

pub async fn check(
    settings: &TomlSettingsRepository,
    paths: &ShopdeskPaths,
    customer: &str,
    at: Option<&str>,
) -> Result<()> {
    let config = settings.load()?;
    let now = resolve_at(at)?;
    let repository = Arc::new(CsvThrottleRepository::with_path(paths.ledger_file()));
    let ledger = ThrottleLedger::load(repository, config.dispatch.cooldown()).await?;

    let verdict = if ledger.should_reply(customer, now) {
        "reply due".to_string()
    } else {
        match ledger.last_reply(customer) {
            Some(LedgerStamp::Valid(last)) => {
                format!("throttled until {}", (*last + ledger.cooldown()).format(AT_FORMAT))
            }
            _ => "throttled (malformed ledger entry)".to_string(),
        }
    };
    println!("{customer}: {verdict} at {}", now.format(AT_FORMAT));
    Ok(())
}

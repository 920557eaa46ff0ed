use anyhow::{Context, Result, bail};
use shopdesk_application::{CycleOutcome, ResponderUseCase};
use shopdesk_core::status::StatusReporter;
use shopdesk_execution::PeriodicDriver;
use shopdesk_infrastructure::{ShopdeskPaths, TomlSettingsRepository};

use crate::bootstrap::ResponderBootstrap;

pub async fn run(settings: &TomlSettingsRepository, paths: &ShopdeskPaths, once: bool) -> Result<()> {
    let config = settings
        .load()
        .with_context(|| format!("Failed to load {}", settings.path().display()))?;
    let ResponderBootstrap {
        mut usecase,
        controller,
        status,
    } = ResponderBootstrap::build(&config, paths)?;
    print_status_changes(&status);

    let result = if once {
        run_once(&mut usecase).await
    } else {
        let driver = PeriodicDriver::new(config.driver.interval());
        let token = driver.cancellation_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!(target: "driver", "Shutdown requested; finishing the current cycle");
                token.cancel();
            }
        });
        driver.run(usecase).await;
        Ok(())
    };

    controller.shutdown().await;
    result
}

async fn run_once(usecase: &mut ResponderUseCase) -> Result<()> {
    match usecase.run_cycle().await? {
        CycleOutcome::Dispatched(summary) => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        CycleOutcome::LoginFailed(reason) | CycleOutcome::Halted(reason) => bail!("Login failed: {}", reason),
    }
}

/// Mirrors the status surface on stdout for the operator.
fn print_status_changes(status: &StatusReporter) {
    let mut rx = status.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let event = rx.borrow_and_update().clone();
            match event.message {
                Some(message) => println!("[{}] {}", event.phase, message),
                None => println!("[{}]", event.phase),
            }
        }
    });
}

use std::time::Duration;

use async_trait::async_trait;
use shopdesk_application::{CycleOutcome, ResponderUseCase};
use shopdesk_core::Result;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

/// Work executed on every accepted tick.
#[async_trait]
pub trait CycleTask: Send {
    /// Runs one cycle. Errors are logged by the driver and never stop it.
    async fn run_cycle(&mut self) -> Result<()>;
}

#[async_trait]
impl CycleTask for ResponderUseCase {
    async fn run_cycle(&mut self) -> Result<()> {
        match ResponderUseCase::run_cycle(self).await? {
            CycleOutcome::Dispatched(summary) => {
                tracing::debug!(target: "driver", replied = summary.replied, "Cycle complete");
            }
            CycleOutcome::LoginFailed(reason) => {
                tracing::warn!(target: "driver", "Cycle ended at login: {}", reason);
            }
            CycleOutcome::Halted(reason) => {
                tracing::debug!(target: "driver", "Idle after failed login ({})", reason);
            }
        }
        Ok(())
    }
}

/// Counters reported when the driver stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    pub ticks: u64,
    /// Ticks dropped because a cycle was running and another was queued.
    pub dropped: u64,
    pub cycles: u64,
    pub failed: u64,
}

/// Fires a cycle every `interval`, the first one immediately.
pub struct PeriodicDriver {
    interval: Duration,
    cancel: CancellationToken,
}

impl PeriodicDriver {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the driver. A running cycle is allowed to finish.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs until cancelled and returns the counters.
    pub async fn run<T>(self, task: T) -> DriverStats
    where
        T: CycleTask + 'static,
    {
        let (tx, rx) = mpsc::channel::<()>(1);
        let worker = tokio::spawn(work(task, rx, self.cancel.clone()));

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(target: "driver", "Driver started ({}s interval)", self.interval.as_secs());

        let mut stats = DriverStats::default();
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    stats.ticks += 1;
                    match tx.try_send(()) {
                        Ok(()) => {}
                        Err(TrySendError::Full(())) => {
                            stats.dropped += 1;
                            tracing::warn!(target: "driver", "Previous cycle still running; tick skipped");
                        }
                        Err(TrySendError::Closed(())) => {
                            tracing::error!(target: "driver", "Worker stopped unexpectedly");
                            break;
                        }
                    }
                }
            }
        }
        drop(tx);

        match worker.await {
            Ok((cycles, failed)) => {
                stats.cycles = cycles;
                stats.failed = failed;
            }
            Err(err) => tracing::error!(target: "driver", "Worker task failed: {}", err),
        }
        tracing::info!(
            target: "driver",
            ticks = stats.ticks,
            cycles = stats.cycles,
            failed = stats.failed,
            dropped = stats.dropped,
            "Driver stopped"
        );
        stats
    }
}

/// The single consumer of ticks. Returns `(cycles, failed)`.
async fn work<T: CycleTask>(
    mut task: T,
    mut ticks: mpsc::Receiver<()>,
    cancel: CancellationToken,
) -> (u64, u64) {
    let mut cycles = 0;
    let mut failed = 0;
    loop {
        let tick = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            tick = ticks.recv() => tick,
        };
        if tick.is_none() {
            break;
        }

        cycles += 1;
        if let Err(err) = task.run_cycle().await {
            failed += 1;
            tracing::error!(target: "driver", "Dispatch cycle failed: {}", err);
        }
    }
    (cycles, failed)
}

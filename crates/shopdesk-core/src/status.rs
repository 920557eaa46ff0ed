//! Operator-facing status surface.

use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::watch;

/// High-level phase shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum StatusPhase {
    #[default]
    #[strum(serialize = "idle")]
    Idle,
    #[strum(serialize = "logging in")]
    LoggingIn,
    #[strum(serialize = "awaiting manual verification")]
    AwaitingVerification,
    #[strum(serialize = "logged in")]
    LoggedIn,
    #[strum(serialize = "error")]
    Error,
}

/// Phase plus a short operator message. Diagnostic detail belongs in the
/// log, not here.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusEvent {
    pub phase: StatusPhase,
    pub message: Option<String>,
}

/// Publishes the latest [`StatusEvent`]; cloning shares the channel.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    tx: watch::Sender<StatusEvent>,
}

impl StatusReporter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(StatusEvent::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusEvent> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> StatusEvent {
        self.tx.borrow().clone()
    }

    /// Publishes `phase`; unchanged phases without a message are not re-sent.
    pub fn set(&self, phase: StatusPhase, message: Option<String>) {
        let event = StatusEvent { phase, message };
        self.tx.send_if_modified(|current| {
            if *current == event {
                return false;
            }
            tracing::info!(target: "status", phase = %event.phase, "Status changed");
            *current = event;
            true
        });
    }

    pub fn phase(&self, phase: StatusPhase) {
        self.set(phase, None);
    }
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_text() {
        assert_eq!(StatusPhase::AwaitingVerification.to_string(), "awaiting manual verification");
        assert_eq!(StatusPhase::LoggedIn.to_string(), "logged in");
    }

    #[tokio::test]
    async fn test_subscribers_see_latest_phase() {
        let reporter = StatusReporter::new();
        let mut rx = reporter.subscribe();
        reporter.phase(StatusPhase::LoggingIn);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().phase, StatusPhase::LoggingIn);

        reporter.phase(StatusPhase::LoggingIn);
        assert!(!rx.has_changed().unwrap());
        assert_eq!(reporter.current().phase, StatusPhase::LoggingIn);
    }
}

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::time::Instant;

/// Authentication progress of the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuthState {
    Unauthenticated,
    CredentialsSubmitted,
    VerificationLocked,
    ManualWait,
    Ready,
    Failed,
}

impl AuthState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

/// Present from the first verification page until the run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationLock {
    pub locked_at: Instant,
    pub pin_until: Instant,
    pub force_back_count: u32,
}

impl VerificationLock {
    pub fn new(locked_at: Instant, pin_window: Duration) -> Self {
        Self {
            locked_at,
            pin_until: locked_at + pin_window,
            force_back_count: 0,
        }
    }

    pub fn pin_active(&self, now: Instant) -> bool {
        now < self.pin_until
    }
}

/// Why a run ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The credential flow exceeded the global budget.
    LoginTimeout,
    /// Nobody completed the manual step within the wait budget.
    VerificationTimeout,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoginTimeout => write!(f, "login timeout"),
            Self::VerificationTimeout => write!(f, "verification timeout"),
        }
    }
}

/// Account used for the credential form.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub account: String,
    pub password: String,
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        !self.account.trim().is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Budgets and thresholds of the login flow.
///
/// The loop and pin thresholds are heuristics; they are configurable rather
/// than fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthTimings {
    /// Overall budget for the credential flow.
    pub global_budget_secs: u64,
    /// Budget for a human to finish CAPTCHA/2FA.
    pub manual_wait_budget_secs: u64,
    /// Window after verification detection during which drift is reverted.
    pub pin_window_secs: u64,
    /// Returns to the login page that switch the run to manual mode.
    pub loop_threshold: u32,
    /// Sliding window in which `loop_threshold` returns must occur.
    pub loop_window_secs: u64,
    /// Lower bound of the randomized poll pause.
    pub poll_min_ms: u64,
    /// Upper bound of the randomized poll pause.
    pub poll_max_ms: u64,
    /// Per-signal timeout of the chat-ready probe.
    pub ready_probe_timeout_ms: u64,
    /// Timeout for each credential form field.
    pub form_field_timeout_secs: u64,
    /// Start a new run on the next tick after a `Failed` run.
    pub relogin_after_failure: bool,
}

impl Default for AuthTimings {
    fn default() -> Self {
        Self {
            global_budget_secs: 600,
            manual_wait_budget_secs: 900,
            pin_window_secs: 10,
            loop_threshold: 2,
            loop_window_secs: 120,
            poll_min_ms: 800,
            poll_max_ms: 1500,
            ready_probe_timeout_ms: 2000,
            form_field_timeout_secs: 20,
            relogin_after_failure: false,
        }
    }
}

impl AuthTimings {
    pub fn global_budget(&self) -> Duration {
        Duration::from_secs(self.global_budget_secs)
    }

    pub fn manual_wait_budget(&self) -> Duration {
        Duration::from_secs(self.manual_wait_budget_secs)
    }

    pub fn pin_window(&self) -> Duration {
        Duration::from_secs(self.pin_window_secs)
    }

    pub fn loop_window(&self) -> Duration {
        Duration::from_secs(self.loop_window_secs)
    }

    pub fn ready_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_probe_timeout_ms)
    }

    pub fn form_field_timeout(&self) -> Duration {
        Duration::from_secs(self.form_field_timeout_secs)
    }
}

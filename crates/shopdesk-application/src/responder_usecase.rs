//! One tick of the responder: make sure the console is signed in, pick the
//! reply mode, and run a dispatch cycle.

use std::sync::Arc;

use shopdesk_core::Result;
use shopdesk_core::auth::FailureReason;
use shopdesk_core::schedule::{ScheduleConfig, select_mode};
use shopdesk_core::status::{StatusPhase, StatusReporter};

use crate::clock::Clock;
use crate::dispatch::{ConversationDispatcher, DispatchSummary};
use crate::login::{Authenticator, LoginOutcome};

/// Result of [`ResponderUseCase::run_cycle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Dispatched(DispatchSummary),
    /// The login run of this tick failed.
    LoginFailed(FailureReason),
    /// An earlier login failed and automatic re-login is disabled.
    Halted(FailureReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AuthStatus {
    Unauthenticated,
    Authenticated,
    Failed(FailureReason),
}

/// Owns the sign-in state between ticks. Driven by exactly one worker.
pub struct ResponderUseCase {
    authenticator: Arc<dyn Authenticator>,
    dispatcher: ConversationDispatcher,
    schedule: ScheduleConfig,
    clock: Arc<dyn Clock>,
    status: StatusReporter,
    relogin_after_failure: bool,
    auth: AuthStatus,
}

impl ResponderUseCase {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        dispatcher: ConversationDispatcher,
        schedule: ScheduleConfig,
        clock: Arc<dyn Clock>,
        status: StatusReporter,
    ) -> Self {
        Self {
            authenticator,
            dispatcher,
            schedule,
            clock,
            status,
            relogin_after_failure: false,
            auth: AuthStatus::Unauthenticated,
        }
    }

    /// Lets a tick start a new login run after a failed one.
    pub fn with_relogin_after_failure(mut self, enabled: bool) -> Self {
        self.relogin_after_failure = enabled;
        self
    }

    pub fn status(&self) -> &StatusReporter {
        &self.status
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth == AuthStatus::Authenticated
    }

    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        if let Some(outcome) = self.ensure_authenticated().await? {
            return Ok(outcome);
        }

        let mode = select_mode(self.clock.now(), &self.schedule);
        tracing::info!(target: "dispatch", "Reply mode: {}", mode);

        match self.dispatcher.run_cycle(mode).await {
            Ok(summary) => {
                self.check_signed_out().await;
                Ok(CycleOutcome::Dispatched(summary))
            }
            Err(err) if err.is_session_dead() => {
                self.invalidate("browser session lost");
                Err(err)
            }
            Err(err) => {
                self.check_signed_out().await;
                Err(err)
            }
        }
    }

    /// `Some` when this tick ends at the authentication step.
    async fn ensure_authenticated(&mut self) -> Result<Option<CycleOutcome>> {
        match &self.auth {
            AuthStatus::Authenticated => return Ok(None),
            AuthStatus::Failed(reason) if !self.relogin_after_failure => {
                tracing::debug!(target: "auth", "Login failed earlier ({}); not retrying", reason);
                return Ok(Some(CycleOutcome::Halted(reason.clone())));
            }
            AuthStatus::Failed(_) | AuthStatus::Unauthenticated => {}
        }

        match self.authenticator.authenticate().await? {
            LoginOutcome::Ready => {
                self.auth = AuthStatus::Authenticated;
                Ok(None)
            }
            LoginOutcome::Failed(reason) => {
                tracing::error!(target: "auth", "Login failed: {}", reason);
                self.auth = AuthStatus::Failed(reason.clone());
                Ok(Some(CycleOutcome::LoginFailed(reason)))
            }
        }
    }

    async fn check_signed_out(&mut self) {
        match self.dispatcher.console().on_login_page().await {
            Ok(true) => self.invalidate("signed out by the console"),
            Ok(false) => {}
            Err(err) => tracing::debug!(target: "auth", error = %err, "Could not check for the login page"),
        }
    }

    fn invalidate(&mut self, why: &str) {
        tracing::warn!(target: "auth", "{}; signing in again on the next cycle", why);
        self.auth = AuthStatus::Unauthenticated;
        self.status.set(StatusPhase::Idle, Some(format!("{why}; signing in again")));
    }
}

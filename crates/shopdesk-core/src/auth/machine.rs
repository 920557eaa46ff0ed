//! Decision core of the login flow.
//!
//! The machine never touches the browser. The login flow feeds it
//! observations and executes the returned [`Directive`].

use std::collections::VecDeque;

use tokio::time::Instant;

use super::model::{AuthState, AuthTimings, FailureReason, VerificationLock};
use crate::status::StatusPhase;

/// Coarse classification of the page the browser currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationKind {
    /// The credential form.
    Login,
    /// A CAPTCHA, 2FA or challenge page.
    Verification,
    /// Somewhere on the seller console.
    ChatSurface,
    /// `about:blank` or an empty URL.
    Blank,
    Other,
}

/// What the login flow must do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Poll again after the randomized pause.
    Wait,
    /// Fill and submit the credential form once.
    SubmitCredentials,
    /// Check the chat-ready signals, navigating to the chat URL first when
    /// the browser is elsewhere on the console.
    ProbeChatReady { navigate_to_chat: bool },
    /// Switch to a window showing verification, or open the verification
    /// entry page.
    ReturnToVerification,
    /// Force the verification entry page while the pin window is active.
    PinBack { count: u32 },
    Ready,
    Fail(FailureReason),
}

/// Login progress for one run.
#[derive(Debug, Clone)]
pub struct AuthStateMachine {
    timings: AuthTimings,
    state: AuthState,
    started_at: Instant,
    lock: Option<VerificationLock>,
    manual_deadline: Option<Instant>,
    on_login_page: bool,
    submitted_this_visit: bool,
    login_returns: VecDeque<Instant>,
    loop_count: u32,
    failure: Option<FailureReason>,
}

impl AuthStateMachine {
    pub fn new(timings: AuthTimings, now: Instant) -> Self {
        Self {
            timings,
            state: AuthState::Unauthenticated,
            started_at: now,
            lock: None,
            manual_deadline: None,
            on_login_page: false,
            submitted_this_visit: false,
            login_returns: VecDeque::new(),
            loop_count: 0,
            failure: None,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn lock(&self) -> Option<&VerificationLock> {
        self.lock.as_ref()
    }

    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        self.failure.as_ref()
    }

    pub fn timings(&self) -> &AuthTimings {
        &self.timings
    }

    /// Credentials are never auto-submitted once verification was seen.
    pub fn auto_submission_enabled(&self) -> bool {
        self.lock.is_none() && self.state != AuthState::ManualWait
    }

    pub fn status_phase(&self) -> StatusPhase {
        match self.state {
            AuthState::Unauthenticated | AuthState::CredentialsSubmitted => StatusPhase::LoggingIn,
            AuthState::VerificationLocked | AuthState::ManualWait => {
                StatusPhase::AwaitingVerification
            }
            AuthState::Ready => StatusPhase::LoggedIn,
            AuthState::Failed => StatusPhase::Error,
        }
    }

    /// Restored cookies already unlocked the console.
    pub fn on_cookie_restore(&mut self, chat_ready: bool) -> Directive {
        if chat_ready && self.state == AuthState::Unauthenticated && self.lock.is_none() {
            self.state = AuthState::Ready;
            return Directive::Ready;
        }
        Directive::Wait
    }

    /// Advances the machine for the page the browser shows at `now`.
    pub fn observe(&mut self, location: LocationKind, on_chat_url: bool, now: Instant) -> Directive {
        if let Some(directive) = self.terminal_directive() {
            return directive;
        }

        let entering_login = location == LocationKind::Login && !self.on_login_page;
        self.on_login_page = location == LocationKind::Login;

        if location == LocationKind::Verification && self.lock.is_none() {
            tracing::info!(
                target: "auth",
                "Verification detected; credential submission disabled for this run"
            );
            self.lock = Some(VerificationLock::new(now, self.timings.pin_window()));
            self.state = AuthState::VerificationLocked;
            self.manual_deadline = Some(now + self.timings.manual_wait_budget());
            return Directive::Wait;
        }

        if self.lock.is_some() {
            return self.observe_locked(location, on_chat_url, now);
        }

        if self.state == AuthState::ManualWait {
            if self.manual_expired(now) {
                return self.fail(FailureReason::VerificationTimeout);
            }
            return match location {
                LocationKind::ChatSurface => Directive::ProbeChatReady {
                    navigate_to_chat: !on_chat_url,
                },
                _ => Directive::Wait,
            };
        }

        if now.duration_since(self.started_at) >= self.timings.global_budget() {
            return self.fail(FailureReason::LoginTimeout);
        }

        match location {
            LocationKind::Login => self.observe_login(entering_login, now),
            LocationKind::ChatSurface => Directive::ProbeChatReady {
                navigate_to_chat: !on_chat_url,
            },
            _ => Directive::Wait,
        }
    }

    /// Reports whether the credential form was actually filled and submitted.
    pub fn on_submission(&mut self, submitted: bool) {
        if submitted || self.state != AuthState::CredentialsSubmitted {
            return;
        }
        // The form was not usable; allow another attempt on this visit.
        self.state = AuthState::Unauthenticated;
        self.submitted_this_visit = false;
    }

    /// Reports the outcome of a chat-ready probe.
    pub fn on_chat_ready(&mut self, ready: bool) -> Directive {
        if let Some(directive) = self.terminal_directive() {
            return directive;
        }
        if ready {
            self.state = AuthState::Ready;
            return Directive::Ready;
        }
        Directive::Wait
    }

    fn observe_login(&mut self, entering_login: bool, now: Instant) -> Directive {
        if entering_login {
            if self.state == AuthState::CredentialsSubmitted {
                self.record_login_return(now);
                self.state = AuthState::Unauthenticated;
                if self.login_returns.len() >= self.timings.loop_threshold as usize {
                    tracing::warn!(
                        target: "auth",
                        loops = self.loop_count,
                        "Repeated returns to the login page; switching to manual wait"
                    );
                    self.state = AuthState::ManualWait;
                    self.manual_deadline = Some(now + self.timings.manual_wait_budget());
                    return Directive::Wait;
                }
            }
            self.submitted_this_visit = false;
        }

        if self.submitted_this_visit {
            return Directive::Wait;
        }
        self.submitted_this_visit = true;
        self.state = AuthState::CredentialsSubmitted;
        Directive::SubmitCredentials
    }

    fn observe_locked(&mut self, location: LocationKind, on_chat_url: bool, now: Instant) -> Directive {
        if self.manual_expired(now) {
            return self.fail(FailureReason::VerificationTimeout);
        }
        let Some(lock) = self.lock.as_mut() else {
            return Directive::Wait;
        };

        if lock.pin_active(now) {
            if location == LocationKind::Verification {
                return Directive::Wait;
            }
            lock.force_back_count += 1;
            return Directive::PinBack {
                count: lock.force_back_count,
            };
        }

        if self.state == AuthState::VerificationLocked {
            self.state = AuthState::ManualWait;
        }

        match location {
            LocationKind::Verification => Directive::Wait,
            LocationKind::ChatSurface => Directive::ProbeChatReady {
                navigate_to_chat: !on_chat_url,
            },
            LocationKind::Login | LocationKind::Blank | LocationKind::Other => {
                Directive::ReturnToVerification
            }
        }
    }

    fn record_login_return(&mut self, now: Instant) {
        self.loop_count += 1;
        self.login_returns.push_back(now);
        let window = self.timings.loop_window();
        while let Some(first) = self.login_returns.front() {
            if now.duration_since(*first) > window {
                self.login_returns.pop_front();
            } else {
                break;
            }
        }
    }

    fn manual_expired(&self, now: Instant) -> bool {
        self.manual_deadline.is_some_and(|deadline| now >= deadline)
    }

    fn terminal_directive(&self) -> Option<Directive> {
        match self.state {
            AuthState::Ready => Some(Directive::Ready),
            AuthState::Failed => self.failure.clone().map(Directive::Fail),
            _ => None,
        }
    }

    fn fail(&mut self, reason: FailureReason) -> Directive {
        tracing::error!(target: "auth", reason = %reason, "Login run failed");
        self.state = AuthState::Failed;
        self.failure = Some(reason.clone());
        Directive::Fail(reason)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn machine() -> (AuthStateMachine, Instant) {
        let now = Instant::now();
        (AuthStateMachine::new(AuthTimings::default(), now), now)
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_submits_exactly_once_per_login_visit() {
        let (mut m, t0) = machine();
        assert_eq!(m.observe(LocationKind::Login, false, t0), Directive::SubmitCredentials);
        m.on_submission(true);
        assert_eq!(m.state(), AuthState::CredentialsSubmitted);
        for i in 1..5 {
            assert_eq!(m.observe(LocationKind::Login, false, t0 + secs(i)), Directive::Wait);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fill_allows_retry() {
        let (mut m, t0) = machine();
        assert_eq!(m.observe(LocationKind::Login, false, t0), Directive::SubmitCredentials);
        m.on_submission(false);
        assert_eq!(m.state(), AuthState::Unauthenticated);
        assert_eq!(
            m.observe(LocationKind::Login, false, t0 + secs(1)),
            Directive::SubmitCredentials
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cookie_restore_goes_straight_to_ready() {
        let (mut m, _) = machine();
        assert_eq!(m.on_cookie_restore(true), Directive::Ready);
        assert_eq!(m.state(), AuthState::Ready);
        assert_eq!(m.status_phase(), StatusPhase::LoggedIn);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chat_ready_after_submission() {
        let (mut m, t0) = machine();
        m.observe(LocationKind::Login, false, t0);
        m.on_submission(true);
        assert_eq!(
            m.observe(LocationKind::ChatSurface, false, t0 + secs(3)),
            Directive::ProbeChatReady { navigate_to_chat: true }
        );
        assert_eq!(m.on_chat_ready(true), Directive::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_verification_locks_submission_for_the_run() {
        let (mut m, t0) = machine();
        m.observe(LocationKind::Login, false, t0);
        m.on_submission(true);
        assert_eq!(m.observe(LocationKind::Verification, false, t0 + secs(2)), Directive::Wait);
        assert_eq!(m.state(), AuthState::VerificationLocked);
        assert!(!m.auto_submission_enabled());
        assert_eq!(m.status_phase(), StatusPhase::AwaitingVerification);

        // Drift back to the login page during the pin window.
        assert_eq!(
            m.observe(LocationKind::Login, false, t0 + secs(5)),
            Directive::PinBack { count: 1 }
        );
        // After the pin window, the login page still never gets credentials.
        for i in 0..30 {
            let directive = m.observe(LocationKind::Login, false, t0 + secs(20 + i * 10));
            assert_ne!(directive, Directive::SubmitCredentials);
        }
        assert_eq!(m.state(), AuthState::ManualWait);
        assert!(m.lock().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pin_back_counts_every_drift() {
        let (mut m, t0) = machine();
        m.observe(LocationKind::Verification, false, t0);
        assert_eq!(m.observe(LocationKind::Other, false, t0 + secs(1)), Directive::PinBack { count: 1 });
        assert_eq!(
            m.observe(LocationKind::ChatSurface, true, t0 + secs(2)),
            Directive::PinBack { count: 2 }
        );
        assert_eq!(m.observe(LocationKind::Verification, false, t0 + secs(3)), Directive::Wait);
        assert_eq!(m.lock().map(|l| l.force_back_count), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_after_pin_drift_returns_to_verification() {
        let (mut m, t0) = machine();
        m.observe(LocationKind::Verification, false, t0);
        assert_eq!(
            m.observe(LocationKind::Blank, false, t0 + secs(11)),
            Directive::ReturnToVerification
        );
        assert_eq!(m.state(), AuthState::ManualWait);
    }

    #[tokio::test(start_paused = true)]
    async fn test_human_completes_verification() {
        let (mut m, t0) = machine();
        m.observe(LocationKind::Verification, false, t0);
        assert_eq!(
            m.observe(LocationKind::ChatSurface, true, t0 + secs(60)),
            Directive::ProbeChatReady { navigate_to_chat: false }
        );
        assert_eq!(m.on_chat_ready(false), Directive::Wait);
        assert_eq!(m.on_chat_ready(true), Directive::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_verification_times_out_after_manual_budget() {
        let (mut m, t0) = machine();
        m.observe(LocationKind::Verification, false, t0);
        assert_eq!(m.observe(LocationKind::Verification, false, t0 + secs(899)), Directive::Wait);
        assert_eq!(
            m.observe(LocationKind::Verification, false, t0 + secs(900)),
            Directive::Fail(FailureReason::VerificationTimeout)
        );
        assert_eq!(m.state(), AuthState::Failed);
        assert_eq!(m.status_phase(), StatusPhase::Error);
        // Terminal: later observations keep failing.
        assert_eq!(
            m.observe(LocationKind::Login, false, t0 + secs(901)),
            Directive::Fail(FailureReason::VerificationTimeout)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_verification_after_global_budget_uses_manual_budget() {
        let (mut m, t0) = machine();
        m.observe(LocationKind::Login, false, t0);
        m.on_submission(true);
        m.observe(LocationKind::Verification, false, t0 + secs(590));
        // Past the 600s credential budget but within the manual budget.
        assert_eq!(m.observe(LocationKind::Verification, false, t0 + secs(700)), Directive::Wait);
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_loop_switches_to_manual_wait() {
        let (mut m, t0) = machine();
        assert_eq!(m.observe(LocationKind::Login, false, t0), Directive::SubmitCredentials);
        m.on_submission(true);
        m.observe(LocationKind::Other, false, t0 + secs(5));
        // First return: counted, resubmission allowed on the new visit.
        assert_eq!(
            m.observe(LocationKind::Login, false, t0 + secs(10)),
            Directive::SubmitCredentials
        );
        m.on_submission(true);
        assert_eq!(m.loop_count(), 1);
        m.observe(LocationKind::Other, false, t0 + secs(15));
        // Second return within the window: manual mode.
        assert_eq!(m.observe(LocationKind::Login, false, t0 + secs(20)), Directive::Wait);
        assert_eq!(m.state(), AuthState::ManualWait);
        assert_eq!(m.loop_count(), 2);
        assert_eq!(m.observe(LocationKind::Login, false, t0 + secs(30)), Directive::Wait);
        assert_eq!(
            m.observe(LocationKind::Login, false, t0 + secs(20 + 900)),
            Directive::Fail(FailureReason::VerificationTimeout)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_returns_outside_window_do_not_trigger_manual_wait() {
        let (mut m, t0) = machine();
        m.observe(LocationKind::Login, false, t0);
        m.on_submission(true);
        m.observe(LocationKind::Other, false, t0 + secs(5));
        m.observe(LocationKind::Login, false, t0 + secs(10));
        m.on_submission(true);
        m.observe(LocationKind::Other, false, t0 + secs(100));
        assert_eq!(
            m.observe(LocationKind::Login, false, t0 + secs(200)),
            Directive::SubmitCredentials
        );
        assert_eq!(m.loop_count(), 2);
        assert_eq!(m.state(), AuthState::CredentialsSubmitted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_global_budget_fails_with_login_timeout() {
        let (mut m, t0) = machine();
        m.observe(LocationKind::Login, false, t0);
        m.on_submission(true);
        assert_eq!(
            m.observe(LocationKind::Other, false, t0 + secs(600)),
            Directive::Fail(FailureReason::LoginTimeout)
        );
        assert_eq!(m.failure(), Some(&FailureReason::LoginTimeout));
    }
}

//! LoginFlow - executes the auth state machine against the browser.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use shopdesk_core::auth::{AuthState, AuthStateMachine, AuthTimings, Credentials, Directive, FailureReason};
use shopdesk_core::browser::{CookieStore, keys};
use shopdesk_core::config::ConsoleConfig;
use shopdesk_core::status::{StatusPhase, StatusReporter};
use shopdesk_core::Result;
use tokio::time::{Instant, sleep};

use super::Authenticator;
use super::location::{classify_location, is_chat_url, login_entry_url};
use crate::console::{WebChatConsole, selectors};
use crate::session_controller::SessionController;

const SUBMIT_BUTTON_TIMEOUT: Duration = Duration::from_secs(10);
const VERIFICATION_MESSAGE: &str = "Complete the verification in the browser; the responder continues automatically";

/// How a login run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Ready,
    Failed(FailureReason),
}

pub struct LoginFlow {
    console: Arc<WebChatConsole>,
    cookies: Option<Arc<dyn CookieStore>>,
    credentials: Credentials,
    config: ConsoleConfig,
    timings: AuthTimings,
    status: StatusReporter,
}

impl LoginFlow {
    pub fn new(
        console: Arc<WebChatConsole>,
        credentials: Credentials,
        config: ConsoleConfig,
        timings: AuthTimings,
        status: StatusReporter,
    ) -> Self {
        Self {
            console,
            cookies: None,
            credentials,
            config,
            timings,
            status,
        }
    }

    pub fn with_cookie_store(mut self, store: Arc<dyn CookieStore>) -> Self {
        self.cookies = Some(store);
        self
    }

    fn controller(&self) -> &Arc<SessionController> {
        self.console.controller()
    }

    /// One login run: cookie fast path first, then the credential flow until
    /// the chat console is ready or a budget is exhausted.
    pub async fn run(&self) -> Result<LoginOutcome> {
        let mut machine = AuthStateMachine::new(self.timings.clone(), Instant::now());
        self.status.phase(StatusPhase::LoggingIn);
        tracing::info!(target: "auth", "Login run started");

        self.controller().ensure_alive(None).await?;
        if self.try_cookie_login(&mut machine).await? {
            return self.finish_ready().await;
        }

        if !self.credentials.is_complete() {
            tracing::warn!(target: "auth", "No credentials configured; waiting for a manual sign-in");
        }
        self.controller()
            .navigate(&login_entry_url(&self.config), Some("open login"))
            .await?;

        loop {
            let directive = match self.step(&mut machine).await {
                Ok(directive) => directive,
                Err(err) if err.is_session_dead() => {
                    tracing::warn!(target: "auth", error = %err, "Browser lost during login; restarting");
                    let target = self.resume_target(&machine);
                    self.controller().ensure_alive(Some(&target)).await?;
                    continue;
                }
                Err(err) => {
                    tracing::warn!(target: "auth", error = %err, "Login step failed; polling again");
                    Directive::Wait
                }
            };

            self.publish(&machine);
            match directive {
                Directive::Ready => return self.finish_ready().await,
                Directive::Fail(reason) => return Ok(self.finish_failed(reason).await),
                _ => sleep(self.poll_pause()).await,
            }
        }
    }

    async fn try_cookie_login(&self, machine: &mut AuthStateMachine) -> Result<bool> {
        let Some(store) = &self.cookies else {
            return Ok(false);
        };
        match self.controller().restore_cookies(store.as_ref(), &self.config).await {
            Ok(0) => return Ok(false),
            Ok(_) => {}
            Err(err) if err.is_session_dead() => return Err(err),
            Err(err) => {
                tracing::warn!(target: "auth", error = %err, "Cookie restore failed; using credentials");
                return Ok(false);
            }
        }

        let ready = self.console.is_chat_ready(self.timings.ready_probe_timeout()).await?;
        if machine.on_cookie_restore(ready) == Directive::Ready {
            self.controller().record_nav(Some("cookie login success")).await;
            tracing::info!(target: "auth", "Signed in with stored cookies");
            return Ok(true);
        }
        Ok(false)
    }

    /// Observes the current page and carries out the machine's directive.
    async fn step(&self, machine: &mut AuthStateMachine) -> Result<Directive> {
        let url = self.controller().current_url().await?;
        self.controller().record_nav(None).await;
        let location = classify_location(&url, &self.config);
        let directive = machine.observe(location, is_chat_url(&url, &self.config), Instant::now());

        match directive {
            Directive::SubmitCredentials => {
                let submitted = self.submit_credentials().await?;
                machine.on_submission(submitted);
                if submitted {
                    // Give the page time to leave the form.
                    sleep(self.poll_pause() * 3).await;
                }
                Ok(Directive::Wait)
            }
            Directive::ProbeChatReady { navigate_to_chat } => {
                if navigate_to_chat {
                    self.controller()
                        .navigate(&self.config.chat_url, Some("open chat"))
                        .await?;
                }
                let ready = self.console.is_chat_ready(self.timings.ready_probe_timeout()).await?;
                self.controller()
                    .record_nav(Some(if ready {
                        "arrived at chat - ready"
                    } else {
                        "arrived at chat - not ready"
                    }))
                    .await;
                Ok(machine.on_chat_ready(ready))
            }
            Directive::ReturnToVerification => {
                if !self
                    .controller()
                    .switch_to_window_matching(&self.config.verification_patterns)
                    .await?
                {
                    self.controller()
                        .navigate(&self.config.verification_entry_url, Some("return to verification"))
                        .await?;
                }
                Ok(Directive::Wait)
            }
            Directive::PinBack { count } => {
                let note = format!("pin back to verification #{count}");
                self.controller()
                    .navigate(&self.config.verification_entry_url, Some(&note))
                    .await?;
                Ok(Directive::Wait)
            }
            other => Ok(other),
        }
    }

    /// Fills and submits the credential form. `false` when the form could
    /// not be used; only a dead session is an error.
    async fn submit_credentials(&self) -> Result<bool> {
        if !self.credentials.is_complete() {
            self.controller()
                .record_nav(Some("login form: no credentials, leaving it to the operator"))
                .await;
            return Ok(true);
        }
        match self.fill_form().await {
            Err(err) if !err.is_session_dead() => {
                tracing::warn!(target: "auth", error = %err, "Login form not usable; retrying");
                self.controller().record_nav(Some("login form: fill failed")).await;
                Ok(false)
            }
            result => result,
        }
    }

    async fn fill_form(&self) -> Result<bool> {
        let controller = self.controller();
        let timeout = self.timings.form_field_timeout();
        let Some(account) = controller.find_optional(&selectors::account_field(), None, timeout).await? else {
            controller.record_nav(Some("login form: account field missing")).await;
            return Ok(false);
        };
        let session = controller.session().await?;
        session.clear(&account).await?;
        sleep(self.poll_pause()).await;
        session.type_text(&account, &self.credentials.account).await?;

        let Some(password) = controller.find_optional(&selectors::password_field(), None, timeout).await? else {
            controller.record_nav(Some("login form: password field missing")).await;
            return Ok(false);
        };
        session.clear(&password).await?;
        sleep(self.poll_pause()).await;
        session.type_text(&password, &self.credentials.password).await?;
        sleep(self.poll_pause()).await;

        match controller
            .find_optional(&selectors::submit_button(), None, SUBMIT_BUTTON_TIMEOUT)
            .await?
        {
            Some(button) => session.click(&button).await?,
            None => session.type_text(&password, &keys::ENTER.to_string()).await?,
        }
        controller.record_nav(Some("login form submitted")).await;
        tracing::info!(target: "auth", "Credentials submitted");
        Ok(true)
    }

    async fn finish_ready(&self) -> Result<LoginOutcome> {
        match self.console.select_all_filter().await {
            Ok(true) => {}
            Ok(false) => tracing::debug!(target: "auth", "All-conversations filter not found"),
            Err(err) if err.is_session_dead() => return Err(err),
            Err(err) => tracing::debug!(target: "auth", error = %err, "Could not select the all filter"),
        }
        if let Some(store) = &self.cookies {
            if let Err(err) = self.controller().persist_cookies(store.as_ref()).await {
                tracing::warn!(target: "auth", error = %err, "Failed to persist cookies");
            }
        }
        self.status.phase(StatusPhase::LoggedIn);
        tracing::info!(target: "auth", "Chat console ready");
        Ok(LoginOutcome::Ready)
    }

    async fn finish_failed(&self, reason: FailureReason) -> LoginOutcome {
        let message = reason.to_string();
        self.controller().capture_diagnostics(&message).await;
        self.status.set(StatusPhase::Error, Some(message));
        LoginOutcome::Failed(reason)
    }

    fn publish(&self, machine: &AuthStateMachine) {
        match machine.state() {
            AuthState::VerificationLocked | AuthState::ManualWait => self
                .status
                .set(StatusPhase::AwaitingVerification, Some(VERIFICATION_MESSAGE.to_string())),
            AuthState::Unauthenticated | AuthState::CredentialsSubmitted => {
                self.status.phase(StatusPhase::LoggingIn)
            }
            AuthState::Ready | AuthState::Failed => {}
        }
    }

    fn resume_target(&self, machine: &AuthStateMachine) -> String {
        if machine.auto_submission_enabled() {
            login_entry_url(&self.config)
        } else {
            self.config.verification_entry_url.clone()
        }
    }

    fn poll_pause(&self) -> Duration {
        let min = self.timings.poll_min_ms.min(self.timings.poll_max_ms);
        let max = self.timings.poll_max_ms.max(min);
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

#[async_trait]
impl Authenticator for LoginFlow {
    async fn authenticate(&self) -> Result<LoginOutcome> {
        self.run().await
    }
}

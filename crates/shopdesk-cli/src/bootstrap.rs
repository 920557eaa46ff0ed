use std::sync::Arc;

use anyhow::{Context, Result};
use shopdesk_application::{
    Clock, ConversationDispatcher, LoginFlow, ResponderUseCase, SessionController, SystemClock, WebChatConsole,
};
use shopdesk_core::browser::CookieStore;
use shopdesk_core::config::AppConfig;
use shopdesk_core::reply::ReplySource;
use shopdesk_core::status::StatusReporter;
use shopdesk_infrastructure::{CsvThrottleRepository, FileAuditSink, JsonCookieStore, ShopdeskPaths};
use shopdesk_interaction::{WebDriverLauncher, build_reply_generator};

/// Everything `run` needs, wired from the configuration.
pub struct ResponderBootstrap {
    pub usecase: ResponderUseCase,
    pub controller: Arc<SessionController>,
    pub status: StatusReporter,
}

impl ResponderBootstrap {
    pub fn build(config: &AppConfig, paths: &ShopdeskPaths) -> Result<Self> {
        let launcher = WebDriverLauncher::new(config.webdriver.endpoint.clone(), config.webdriver.request_timeout())
            .context("Failed to create the WebDriver client")?;
        let audit = Arc::new(FileAuditSink::with_path(paths.nav_log_file()));
        let controller = Arc::new(
            SessionController::new(Arc::new(launcher), config.webdriver.profile.clone(), audit)
                .with_probe_timeout(config.webdriver.probe_timeout())
                .with_diagnostics_dir(paths.diagnostics_dir()),
        );
        let console = Arc::new(WebChatConsole::new(
            controller.clone(),
            config.console.clone(),
            config.dispatch.clone(),
        ));

        let status = StatusReporter::new();
        let cookies: Arc<dyn CookieStore> = Arc::new(JsonCookieStore::with_path(paths.cookie_file()));
        let login = LoginFlow::new(
            console.clone(),
            config.credentials.clone(),
            config.console.clone(),
            config.auth.clone(),
            status.clone(),
        )
        .with_cookie_store(cookies);

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let mut dispatcher = ConversationDispatcher::new(
            console,
            Arc::new(CsvThrottleRepository::with_path(paths.ledger_file())),
            config.reply.clone(),
            config.dispatch.clone(),
            clock.clone(),
        );
        match build_reply_generator(&config.assistant).context("Failed to create the reply generator")? {
            Some(generator) => dispatcher = dispatcher.with_generator(generator),
            None if config.reply.source == ReplySource::Assistant => {
                tracing::warn!(target: "config", "No OpenAI API key configured; replies fall back to canned texts");
            }
            None => {}
        }

        let usecase = ResponderUseCase::new(
            Arc::new(login),
            dispatcher,
            config.schedule.clone(),
            clock,
            status.clone(),
        )
        .with_relogin_after_failure(config.auth.relogin_after_failure);

        Ok(Self {
            usecase,
            controller,
            status,
        })
    }
}

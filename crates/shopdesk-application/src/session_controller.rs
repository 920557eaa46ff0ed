//! SessionController - owns the automation browser and keeps it usable.
//!
//! Every browser interaction of the responder goes through one controller.
//! It restarts crashed sessions on the same profile, bounds every wait and
//! writes the navigation audit trail.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use shopdesk_core::audit::{AuditSink, NavRecord};
use shopdesk_core::browser::{BrowserLauncher, BrowserProfile, BrowserSession, CookieStore, ElementHandle};
use shopdesk_core::config::ConsoleConfig;
use shopdesk_core::wait::wait_until;
use shopdesk_core::{Result, ShopdeskError};
use tokio::sync::Mutex;

use crate::console::LocatorChain;

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Default)]
struct SessionSlot {
    session: Option<Arc<dyn BrowserSession>>,
    last_url: Option<String>,
    launches: u32,
}

pub struct SessionController {
    launcher: Arc<dyn BrowserLauncher>,
    profile: BrowserProfile,
    audit: Arc<dyn AuditSink>,
    probe_timeout: Duration,
    poll_interval: Duration,
    diagnostics_dir: Option<PathBuf>,
    slot: Mutex<SessionSlot>,
}

impl SessionController {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, profile: BrowserProfile, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            launcher,
            profile,
            audit,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            diagnostics_dir: None,
            slot: Mutex::new(SessionSlot::default()),
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll_interval = poll;
        self
    }

    pub fn with_diagnostics_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.diagnostics_dir = Some(dir.into());
        self
    }

    /// Number of browsers launched so far.
    pub async fn launches(&self) -> u32 {
        self.slot.lock().await.launches
    }

    /// Last URL written to the audit trail.
    pub async fn last_url(&self) -> Option<String> {
        self.slot.lock().await.last_url.clone()
    }

    /// The current session, launching one if none exists yet.
    pub async fn session(&self) -> Result<Arc<dyn BrowserSession>> {
        let current = self.slot.lock().await.session.clone();
        match current {
            Some(session) => Ok(session),
            None => self.restart(None).await,
        }
    }

    /// Probes the current session with a no-op script and replaces it when
    /// the probe fails or exceeds the probe timeout.
    pub async fn ensure_alive(&self, target: Option<&str>) -> Result<Arc<dyn BrowserSession>> {
        let current = self.slot.lock().await.session.clone();
        if let Some(session) = current {
            match tokio::time::timeout(self.probe_timeout, session.execute_script("return 1", Vec::new())).await {
                Ok(Ok(_)) => return Ok(session),
                Ok(Err(err)) => {
                    tracing::warn!(target: "session", error = %err, "Liveness probe failed; restarting browser");
                }
                Err(_) => {
                    tracing::warn!(
                        target: "session",
                        timeout_ms = self.probe_timeout.as_millis() as u64,
                        "Liveness probe timed out; restarting browser"
                    );
                }
            }
        }
        self.restart(target).await
    }

    /// Discards the current session and launches a new one on the same
    /// profile, then opens `target` if given.
    pub async fn restart(&self, target: Option<&str>) -> Result<Arc<dyn BrowserSession>> {
        let session = {
            let mut slot = self.slot.lock().await;
            if let Some(old) = slot.session.take() {
                if let Err(err) = old.quit().await {
                    tracing::debug!(target: "session", error = %err, "Ignoring quit failure of old session");
                }
            }
            let session: Arc<dyn BrowserSession> = Arc::from(self.launcher.launch(&self.profile).await?);
            slot.session = Some(session.clone());
            slot.last_url = None;
            slot.launches += 1;
            tracing::info!(target: "session", launches = slot.launches, "Browser session started");
            session
        };

        let banner = format!("browser started {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        if let Err(err) = self.audit.banner(&banner) {
            tracing::warn!(target: "session", error = %err, "Failed to write audit banner");
        }

        if let Some(url) = target {
            session.navigate(url).await?;
            self.record_nav(Some("restored after restart")).await;
        }
        Ok(session)
    }

    /// Polls `probe` until it yields a value or `timeout` elapses.
    ///
    /// A dead session detected mid-wait is replaced once through
    /// [`Self::ensure_alive`], and the wait starts over on the fresh handle.
    /// Returns `Ok(None)` on timeout.
    pub async fn poll<T, F, Fut>(&self, label: &str, timeout: Duration, mut probe: F) -> Result<Option<T>>
    where
        F: FnMut(Arc<dyn BrowserSession>) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let mut recovered = false;
        loop {
            let session = self.session().await?;
            match wait_until(timeout, self.poll_interval, || probe(session.clone())).await {
                Ok(found) => return Ok(found),
                Err(err) if err.is_session_dead() && !recovered => {
                    tracing::warn!(target: "session", locator = label, error = %err, "Session died during wait");
                    recovered = true;
                    let target = self.last_url().await;
                    self.ensure_alive(target.as_deref()).await?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// [`Self::poll`] that treats a timeout as an error and notes it in the
    /// audit trail.
    pub async fn wait_for<T, F, Fut>(&self, label: &str, timeout: Duration, probe: F) -> Result<T>
    where
        F: FnMut(Arc<dyn BrowserSession>) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        match self.poll(label, timeout, probe).await? {
            Some(value) => Ok(value),
            None => {
                self.record_nav(Some(&format!("wait timeout locator={label}"))).await;
                Err(ShopdeskError::element_timeout(label, timeout))
            }
        }
    }

    /// Waits until any strategy of `chain` matches; returns the element.
    pub async fn find(
        &self,
        chain: &LocatorChain,
        scope: Option<&ElementHandle>,
        timeout: Duration,
    ) -> Result<ElementHandle> {
        self.wait_for(chain.label(), timeout, |session| async move {
            let found = chain.probe(session.as_ref(), scope).await?;
            Ok::<_, ShopdeskError>(found.map(|(_, element)| element))
        })
        .await
    }

    /// Optional lookup: absence within `timeout` is `None` and is not
    /// audited.
    pub async fn find_optional(
        &self,
        chain: &LocatorChain,
        scope: Option<&ElementHandle>,
        timeout: Duration,
    ) -> Result<Option<ElementHandle>> {
        self.poll(chain.label(), timeout, |session| async move {
            let found = chain.probe(session.as_ref(), scope).await?;
            Ok::<_, ShopdeskError>(found.map(|(_, element)| element))
        })
        .await
    }

    pub async fn navigate(&self, url: &str, note: Option<&str>) -> Result<()> {
        let session = self.session().await?;
        session.navigate(url).await?;
        self.record_nav(note).await;
        Ok(())
    }

    pub async fn current_url(&self) -> Result<String> {
        self.session().await?.current_url().await
    }

    /// Appends the current location to the audit trail when it changed or
    /// a note is given. Never fails.
    pub async fn record_nav(&self, note: Option<&str>) {
        let current = self.slot.lock().await.session.clone();
        let Some(session) = current else {
            return;
        };
        let url = match session.current_url().await {
            Ok(url) => url,
            Err(err) => {
                tracing::debug!(target: "session", error = %err, "Cannot read location for audit");
                return;
            }
        };
        let title = session.title().await.unwrap_or_default();
        let referrer = session
            .execute_script("return document.referrer || ''", Vec::new())
            .await
            .ok()
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_default();

        {
            let mut slot = self.slot.lock().await;
            if note.is_none() && slot.last_url.as_deref() == Some(url.as_str()) {
                return;
            }
            slot.last_url = Some(url.clone());
        }

        let mut record = NavRecord::new(url, title, referrer);
        if let Some(note) = note {
            record = record.with_note(note);
        }
        if let Err(err) = self.audit.append(&record) {
            tracing::warn!(target: "session", error = %err, "Failed to append audit record");
        }
    }

    /// Re-injects stored cookies and opens the chat page.
    ///
    /// Returns how many cookies the browser accepted; zero when nothing was
    /// stored.
    pub async fn restore_cookies(&self, store: &dyn CookieStore, console: &ConsoleConfig) -> Result<usize> {
        let cookies = match store.load().await? {
            Some(cookies) if !cookies.is_empty() => cookies,
            _ => return Ok(0),
        };
        let session = self.session().await?;
        // Cookies can only be set for the domain currently open.
        session.navigate(&console.seller_origin).await?;

        let mut accepted = 0;
        for cookie in cookies {
            let name = cookie.name.clone();
            match session
                .add_cookie(&cookie.sanitized_for_restore(&console.cookie_domain_hint))
                .await
            {
                Ok(()) => accepted += 1,
                Err(err) if err.is_session_dead() => return Err(err),
                Err(err) => {
                    tracing::debug!(target: "session", cookie = %name, error = %err, "Browser rejected cookie");
                }
            }
        }

        session.navigate(&console.chat_url).await?;
        self.record_nav(Some("cookies restored")).await;
        tracing::info!(target: "session", accepted, "Restored stored cookies");
        Ok(accepted)
    }

    pub async fn persist_cookies(&self, store: &dyn CookieStore) -> Result<usize> {
        let cookies = self.session().await?.cookies().await?;
        store.save(&cookies).await?;
        tracing::info!(target: "session", count = cookies.len(), "Persisted session cookies");
        Ok(cookies.len())
    }

    /// Notes a failure in the audit trail together with a screenshot, when
    /// a diagnostics directory is configured. Never fails.
    pub async fn capture_diagnostics(&self, reason: &str) -> Option<PathBuf> {
        let path = self.save_screenshot().await;
        let note = match &path {
            Some(path) => format!("failure: {reason} screenshot={}", path.display()),
            None => format!("failure: {reason}"),
        };
        self.record_nav(Some(&note)).await;
        path
    }

    async fn save_screenshot(&self) -> Option<PathBuf> {
        let dir = self.diagnostics_dir.clone()?;
        let session = self.slot.lock().await.session.clone()?;

        let bytes = match session.screenshot().await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(target: "session", error = %err, "Screenshot failed");
                return None;
            }
        };
        let path = dir.join(format!("failure-{}.png", Local::now().format("%Y%m%d-%H%M%S")));
        let written = async {
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::write(&path, bytes).await
        }
        .await;
        match written {
            Ok(()) => Some(path),
            Err(err) => {
                tracing::warn!(target: "session", error = %err, path = %path.display(), "Failed to save screenshot");
                None
            }
        }
    }

    /// Brings a tab showing one of `patterns` to the front. Tabs are tried
    /// newest first.
    pub async fn switch_to_window_matching(&self, patterns: &[String]) -> Result<bool> {
        let session = self.session().await?;
        let handles = session.window_handles().await?;
        for handle in handles.iter().rev() {
            if let Err(err) = session.switch_to_window(handle).await {
                if err.is_session_dead() {
                    return Err(err);
                }
                continue;
            }
            let url = match session.current_url().await {
                Ok(url) => url,
                Err(err) if err.is_session_dead() => return Err(err),
                Err(_) => continue,
            };
            if patterns.iter().any(|p| url.contains(p.as_str())) {
                self.record_nav(Some("switched to verification tab")).await;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Quits the browser, if one is running.
    pub async fn shutdown(&self) {
        let session = self.slot.lock().await.session.take();
        if let Some(session) = session {
            if let Err(err) = session.quit().await {
                tracing::debug!(target: "session", error = %err, "Ignoring quit failure");
            }
            tracing::info!(target: "session", "Browser session closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use shopdesk_core::browser::{Cookie, Locator};

    use super::*;
    use crate::test_support::{FakeBrowser, FakeLauncher, RecordingAudit};

    fn controller(launcher: Arc<FakeLauncher>, audit: Arc<RecordingAudit>) -> SessionController {
        SessionController::new(launcher, BrowserProfile::default(), audit)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ensure_alive_keeps_healthy_session() {
        let launcher = Arc::new(FakeLauncher::new());
        let ctrl = controller(launcher.clone(), Arc::new(RecordingAudit::default()));
        ctrl.session().await.unwrap();
        ctrl.ensure_alive(None).await.unwrap();
        assert_eq!(launcher.launch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ensure_alive_restarts_dead_session_and_restores_target() {
        let launcher = Arc::new(FakeLauncher::new());
        let audit = Arc::new(RecordingAudit::default());
        let ctrl = controller(launcher.clone(), audit.clone());
        ctrl.session().await.unwrap();
        launcher.browser(0).kill();

        ctrl.ensure_alive(Some("https://seller.shopee.tw/new-webchat/conversations"))
            .await
            .unwrap();

        assert_eq!(launcher.launch_count(), 2);
        assert_eq!(
            launcher.browser(1).url(),
            "https://seller.shopee.tw/new-webchat/conversations"
        );
        assert_eq!(audit.banners().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_recovers_from_invalid_session() {
        let launcher = Arc::new(FakeLauncher::new());
        let ctrl = controller(launcher.clone(), Arc::new(RecordingAudit::default()));
        ctrl.session().await.unwrap();
        launcher.browser(0).kill();
        launcher.on_launch(|browser: &FakeBrowser| {
            browser.add_element(&Locator::css(".ready"), "ready-1");
        });

        let element = ctrl
            .find(
                &LocatorChain::new("ready marker", [Locator::css(".ready")]),
                None,
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert_eq!(element.id(), "ready-1");
        assert_eq!(launcher.launch_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_timeout_is_audited() {
        let launcher = Arc::new(FakeLauncher::new());
        let audit = Arc::new(RecordingAudit::default());
        let ctrl = controller(launcher, audit.clone());
        ctrl.navigate("https://seller.shopee.tw/", None).await.unwrap();

        let err = ctrl
            .find(
                &LocatorChain::new("composer", [Locator::class_name("E2MWg3w8y6")]),
                None,
                Duration::from_secs(3),
            )
            .await
            .unwrap_err();

        assert!(err.is_element_timeout());
        let notes = audit.notes();
        assert_eq!(notes.last().map(String::as_str), Some("wait timeout locator=composer"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_matching_strategy_wins() {
        let launcher = Arc::new(FakeLauncher::new());
        let ctrl = controller(launcher.clone(), Arc::new(RecordingAudit::default()));
        ctrl.session().await.unwrap();
        launcher.browser(0).add_element(&Locator::css("input[name='loginKey']"), "second");
        launcher.browser(0).add_element(&Locator::xpath("//input"), "third");

        let chain = LocatorChain::new(
            "account",
            [
                Locator::name("loginKey"),
                Locator::css("input[name='loginKey']"),
                Locator::xpath("//input"),
            ],
        );
        let element = ctrl.find(&chain, None, Duration::from_secs(1)).await.unwrap();
        assert_eq!(element.id(), "second");
    }

    #[tokio::test(start_paused = true)]
    async fn test_nav_records_are_deduplicated_by_url() {
        let launcher = Arc::new(FakeLauncher::new());
        let audit = Arc::new(RecordingAudit::default());
        let ctrl = controller(launcher, audit.clone());

        ctrl.navigate("https://seller.shopee.tw/", None).await.unwrap();
        ctrl.record_nav(None).await;
        ctrl.record_nav(None).await;
        ctrl.record_nav(Some("explicit")).await;

        let records = audit.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].note.as_deref(), Some("explicit"));
    }

    struct MemoryCookies(StdMutex<Option<Vec<Cookie>>>);

    #[async_trait::async_trait]
    impl CookieStore for MemoryCookies {
        async fn load(&self) -> Result<Option<Vec<Cookie>>> {
            Ok(self.0.lock().unwrap().clone())
        }

        async fn save(&self, cookies: &[Cookie]) -> Result<()> {
            *self.0.lock().unwrap() = Some(cookies.to_vec());
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cookie_restore_skips_rejected_cookies() {
        let launcher = Arc::new(FakeLauncher::new());
        let ctrl = controller(launcher.clone(), Arc::new(RecordingAudit::default()));
        ctrl.session().await.unwrap();
        launcher.browser(0).reject_cookie("broken");

        let mut good = Cookie::new("SPC_EC", "token");
        good.same_site = Some("None".into());
        let store = MemoryCookies(StdMutex::new(Some(vec![good, Cookie::new("broken", "x")])));

        let accepted = ctrl.restore_cookies(&store, &ConsoleConfig::default()).await.unwrap();

        assert_eq!(accepted, 1);
        let browser = launcher.browser(0);
        let cookies = browser.stored_cookies();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].same_site, None);
        assert_eq!(cookies[0].domain.as_deref(), Some(".shopee.tw"));
        assert_eq!(
            browser.navigations(),
            vec![
                "https://seller.shopee.tw".to_string(),
                "https://seller.shopee.tw/new-webchat/conversations".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cookie_restore_without_store_contents_is_noop() {
        let launcher = Arc::new(FakeLauncher::new());
        let ctrl = controller(launcher.clone(), Arc::new(RecordingAudit::default()));
        let store = MemoryCookies(StdMutex::new(None));
        assert_eq!(ctrl.restore_cookies(&store, &ConsoleConfig::default()).await.unwrap(), 0);
        assert_eq!(launcher.launch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_diagnostics_writes_png_and_note() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let launcher = Arc::new(FakeLauncher::new());
        let audit = Arc::new(RecordingAudit::default());
        let ctrl = controller(launcher, audit.clone()).with_diagnostics_dir(temp_dir.path().join("diag"));
        ctrl.navigate("https://accounts.shopee.tw/seller/login", None).await.unwrap();

        let path = ctrl.capture_diagnostics("login timeout").await.unwrap();

        assert!(path.exists());
        let note = audit.notes().pop().unwrap();
        assert!(note.starts_with("failure: login timeout screenshot="));
    }

    #[tokio::test(start_paused = true)]
    async fn test_switches_to_verification_tab() {
        let launcher = Arc::new(FakeLauncher::new());
        let ctrl = controller(launcher.clone(), Arc::new(RecordingAudit::default()));
        ctrl.session().await.unwrap();
        let browser = launcher.browser(0);
        browser.open_window("w-verify", "https://shopee.tw/verify/ivs?is_initial=true");
        browser.open_window("w-blank", "about:blank");

        let switched = ctrl
            .switch_to_window_matching(&["/verify".to_string()])
            .await
            .unwrap();

        assert!(switched);
        assert_eq!(browser.url(), "https://shopee.tw/verify/ivs?is_initial=true");
    }
}

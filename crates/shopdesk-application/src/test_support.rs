//! In-memory fakes for unit tests: browser, launcher, audit sink, chat
//! console, throttle table and reply generator.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use shopdesk_core::audit::{AuditSink, NavRecord};
use shopdesk_core::browser::{
    BrowserLauncher, BrowserProfile, BrowserSession, Cookie, ElementHandle, Locator,
};
use shopdesk_core::reply::{ChatMessage, ReplyGenerator};
use shopdesk_core::throttle::{LedgerEntry, LedgerStamp, ThrottleRepository};
use shopdesk_core::{Result, ShopdeskError};
use tokio::time::Instant;

use crate::console::{ChatConsole, ScrollMetrics};

#[derive(Default)]
struct PageState {
    alive: bool,
    windows: Vec<(String, String)>,
    current_window: usize,
    timeline: VecDeque<(Instant, String)>,
    elements: HashMap<String, Vec<String>>,
    hidden: HashSet<String>,
    attributes: HashMap<(String, String), String>,
    texts: HashMap<String, String>,
    click_targets: HashMap<String, String>,
    clicks: Vec<String>,
    typed: Vec<(String, String)>,
    typing_failures: VecDeque<ShopdeskError>,
    navigations: Vec<String>,
    refreshes: u32,
    cookies: Vec<Cookie>,
    rejected_cookies: HashSet<String>,
    script_results: Vec<(String, Value)>,
    scripts: Vec<String>,
}

impl PageState {
    fn check_alive(&self) -> Result<()> {
        if self.alive {
            Ok(())
        } else {
            Err(ShopdeskError::session_dead("invalid session id"))
        }
    }

    fn apply_timeline(&mut self) {
        let now = Instant::now();
        while let Some((at, _)) = self.timeline.front() {
            if *at > now {
                break;
            }
            if let Some((_, url)) = self.timeline.pop_front() {
                self.set_url(url);
            }
        }
    }

    fn set_url(&mut self, url: String) {
        let index = self.current_window;
        if let Some(window) = self.windows.get_mut(index) {
            window.1 = url;
        }
    }

    fn url(&self) -> String {
        self.windows
            .get(self.current_window)
            .map(|(_, url)| url.clone())
            .unwrap_or_default()
    }
}

fn element_key(locator: &Locator, scope: Option<&ElementHandle>) -> String {
    match scope {
        Some(scope) => format!("{}>{}", scope.id(), locator),
        None => locator.to_string(),
    }
}

/// Scriptable browser. Clones share the same page.
#[derive(Clone)]
pub(crate) struct FakeBrowser {
    state: Arc<Mutex<PageState>>,
    created_at: Instant,
}

impl FakeBrowser {
    pub(crate) fn new() -> Self {
        let state = PageState {
            alive: true,
            windows: vec![("w-main".to_string(), "about:blank".to_string())],
            ..PageState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            created_at: Instant::now(),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut PageState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub(crate) fn kill(&self) {
        self.with_state(|s| s.alive = false);
    }

    pub(crate) fn url(&self) -> String {
        self.with_state(|s| s.url())
    }

    pub(crate) fn set_url(&self, url: &str) {
        self.with_state(|s| s.set_url(url.to_string()));
    }

    /// The active tab shows `url` once `after` has elapsed since launch.
    pub(crate) fn schedule_url(&self, after: Duration, url: &str) {
        let at = self.created_at + after;
        self.with_state(|s| s.timeline.push_back((at, url.to_string())));
    }

    pub(crate) fn add_element(&self, locator: &Locator, id: &str) {
        self.add_scoped_element(None, locator, id);
    }

    pub(crate) fn add_scoped_element(&self, scope: Option<&str>, locator: &Locator, id: &str) {
        let key = element_key(locator, scope.map(|s| ElementHandle(s.to_string())).as_ref());
        self.with_state(|s| s.elements.entry(key).or_default().push(id.to_string()));
    }

    pub(crate) fn hide(&self, id: &str) {
        self.with_state(|s| s.hidden.insert(id.to_string()));
    }

    pub(crate) fn set_attribute(&self, id: &str, name: &str, value: &str) {
        self.with_state(|s| {
            s.attributes
                .insert((id.to_string(), name.to_string()), value.to_string())
        });
    }

    pub(crate) fn set_text(&self, id: &str, text: &str) {
        self.with_state(|s| s.texts.insert(id.to_string(), text.to_string()));
    }

    /// Clicking `id` opens `url` in the active tab.
    pub(crate) fn navigate_on_click(&self, id: &str, url: &str) {
        self.with_state(|s| s.click_targets.insert(id.to_string(), url.to_string()));
    }

    pub(crate) fn open_window(&self, handle: &str, url: &str) {
        self.with_state(|s| s.windows.push((handle.to_string(), url.to_string())));
    }

    /// The next `type_text` call fails with `error`.
    pub(crate) fn fail_next_typing(&self, error: ShopdeskError) {
        self.with_state(|s| s.typing_failures.push_back(error));
    }

    pub(crate) fn reject_cookie(&self, name: &str) {
        self.with_state(|s| s.rejected_cookies.insert(name.to_string()));
    }

    /// Scripts containing `marker` return `value`.
    pub(crate) fn script_result(&self, marker: &str, value: Value) {
        self.with_state(|s| s.script_results.push((marker.to_string(), value)));
    }

    pub(crate) fn stored_cookies(&self) -> Vec<Cookie> {
        self.with_state(|s| s.cookies.clone())
    }

    pub(crate) fn navigations(&self) -> Vec<String> {
        self.with_state(|s| s.navigations.clone())
    }

    pub(crate) fn clicks(&self) -> Vec<String> {
        self.with_state(|s| s.clicks.clone())
    }

    pub(crate) fn typed(&self) -> Vec<(String, String)> {
        self.with_state(|s| s.typed.clone())
    }

    pub(crate) fn refreshes(&self) -> u32 {
        self.with_state(|s| s.refreshes)
    }

    pub(crate) fn scripts(&self) -> Vec<String> {
        self.with_state(|s| s.scripts.clone())
    }
}

#[async_trait]
impl BrowserSession for FakeBrowser {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.with_state(|s| {
            s.check_alive()?;
            s.navigations.push(url.to_string());
            s.set_url(url.to_string());
            Ok(())
        })
    }

    async fn refresh(&self) -> Result<()> {
        self.with_state(|s| {
            s.check_alive()?;
            s.refreshes += 1;
            Ok(())
        })
    }

    async fn current_url(&self) -> Result<String> {
        self.with_state(|s| {
            s.check_alive()?;
            s.apply_timeline();
            Ok(s.url())
        })
    }

    async fn title(&self) -> Result<String> {
        self.with_state(|s| s.check_alive().map(|_| "Shopee".to_string()))
    }

    async fn find_element(&self, locator: &Locator, scope: Option<&ElementHandle>) -> Result<Option<ElementHandle>> {
        Ok(self.find_elements(locator, scope).await?.into_iter().next())
    }

    async fn find_elements(&self, locator: &Locator, scope: Option<&ElementHandle>) -> Result<Vec<ElementHandle>> {
        let key = element_key(locator, scope);
        self.with_state(|s| {
            s.check_alive()?;
            Ok(s.elements
                .get(&key)
                .map(|ids| ids.iter().cloned().map(ElementHandle).collect())
                .unwrap_or_default())
        })
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        self.with_state(|s| {
            s.check_alive()?;
            s.clicks.push(element.id().to_string());
            if let Some(url) = s.click_targets.get(element.id()).cloned() {
                s.set_url(url);
            }
            Ok(())
        })
    }

    async fn clear(&self, _element: &ElementHandle) -> Result<()> {
        self.with_state(|s| s.check_alive())
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> Result<()> {
        self.with_state(|s| {
            s.check_alive()?;
            if let Some(error) = s.typing_failures.pop_front() {
                return Err(error);
            }
            s.typed.push((element.id().to_string(), text.to_string()));
            Ok(())
        })
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        self.with_state(|s| {
            s.check_alive()?;
            Ok(s.attributes.get(&(element.id().to_string(), name.to_string())).cloned())
        })
    }

    async fn text(&self, element: &ElementHandle) -> Result<String> {
        self.with_state(|s| {
            s.check_alive()?;
            Ok(s.texts.get(element.id()).cloned().unwrap_or_default())
        })
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool> {
        self.with_state(|s| {
            s.check_alive()?;
            Ok(!s.hidden.contains(element.id()))
        })
    }

    async fn execute_script(&self, script: &str, _args: Vec<Value>) -> Result<Value> {
        self.with_state(|s| {
            s.check_alive()?;
            s.scripts.push(script.to_string());
            if script == "return 1" {
                return Ok(Value::from(1));
            }
            Ok(s.script_results
                .iter()
                .find(|(marker, _)| script.contains(marker.as_str()))
                .map(|(_, value)| value.clone())
                .unwrap_or(Value::Null))
        })
    }

    fn element_arg(&self, element: &ElementHandle) -> Value {
        Value::String(element.id().to_string())
    }

    async fn cookies(&self) -> Result<Vec<Cookie>> {
        self.with_state(|s| {
            s.check_alive()?;
            Ok(s.cookies.clone())
        })
    }

    async fn add_cookie(&self, cookie: &Cookie) -> Result<()> {
        self.with_state(|s| {
            s.check_alive()?;
            if s.rejected_cookies.contains(&cookie.name) {
                return Err(ShopdeskError::browser("invalid cookie domain"));
            }
            s.cookies.push(cookie.clone());
            Ok(())
        })
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.with_state(|s| s.check_alive().map(|_| b"\x89PNG fake".to_vec()))
    }

    async fn window_handles(&self) -> Result<Vec<String>> {
        self.with_state(|s| {
            s.check_alive()?;
            Ok(s.windows.iter().map(|(handle, _)| handle.clone()).collect())
        })
    }

    async fn switch_to_window(&self, handle: &str) -> Result<()> {
        self.with_state(|s| {
            s.check_alive()?;
            let index = s
                .windows
                .iter()
                .position(|(h, _)| h == handle)
                .ok_or_else(|| ShopdeskError::browser("no such window"))?;
            s.current_window = index;
            Ok(())
        })
    }

    async fn quit(&self) -> Result<()> {
        self.with_state(|s| s.alive = false);
        Ok(())
    }
}

type LaunchHook = Box<dyn Fn(&FakeBrowser) + Send + Sync>;

/// Hands out a fresh [`FakeBrowser`] per launch and keeps them for
/// inspection.
pub(crate) struct FakeLauncher {
    browsers: Mutex<Vec<FakeBrowser>>,
    hook: Mutex<Option<LaunchHook>>,
}

impl FakeLauncher {
    pub(crate) fn new() -> Self {
        Self {
            browsers: Mutex::new(Vec::new()),
            hook: Mutex::new(None),
        }
    }

    /// Runs `hook` on every browser launched from now on.
    pub(crate) fn on_launch(&self, hook: impl Fn(&FakeBrowser) + Send + Sync + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub(crate) fn launch_count(&self) -> usize {
        self.browsers.lock().unwrap().len()
    }

    pub(crate) fn browser(&self, index: usize) -> FakeBrowser {
        self.browsers.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, _profile: &BrowserProfile) -> Result<Box<dyn BrowserSession>> {
        let browser = FakeBrowser::new();
        if let Some(hook) = self.hook.lock().unwrap().as_ref() {
            hook(&browser);
        }
        self.browsers.lock().unwrap().push(browser.clone());
        Ok(Box::new(browser))
    }
}

/// Keeps every audit line in memory.
#[derive(Default)]
pub(crate) struct RecordingAudit {
    records: Mutex<Vec<NavRecord>>,
    banners: Mutex<Vec<String>>,
}

impl RecordingAudit {
    pub(crate) fn records(&self) -> Vec<NavRecord> {
        self.records.lock().unwrap().clone()
    }

    pub(crate) fn notes(&self) -> Vec<String> {
        self.records().into_iter().filter_map(|r| r.note).collect()
    }

    pub(crate) fn banners(&self) -> Vec<String> {
        self.banners.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingAudit {
    fn append(&self, record: &NavRecord) -> Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn banner(&self, text: &str) -> Result<()> {
        self.banners.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct ConsoleState {
    ready: bool,
    list_present: bool,
    unreplied_active: bool,
    on_login: bool,
    endless: bool,
    pages: Vec<Vec<String>>,
    step: usize,
    transcript: Vec<ChatMessage>,
    open_failures: HashMap<String, ShopdeskError>,
    list_failures: VecDeque<ShopdeskError>,
    vanished: HashSet<String>,
    prepares: usize,
    opened: Vec<String>,
    current: Option<String>,
    submitted: Vec<(String, String)>,
}

/// Scripted chat console. Page `i` of the list is visible after `i` scroll
/// steps; the last page is the bottom unless the list is endless.
pub(crate) struct FakeConsole {
    state: Mutex<ConsoleState>,
}

impl FakeConsole {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(ConsoleState {
                ready: true,
                list_present: true,
                unreplied_active: true,
                pages: vec![Vec::new()],
                ..ConsoleState::default()
            }),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ConsoleState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub(crate) fn set_pages(&self, pages: &[&[&str]]) {
        self.with_state(|s| {
            s.pages = pages
                .iter()
                .map(|page| page.iter().map(|name| name.to_string()).collect())
                .collect();
            if s.pages.is_empty() {
                s.pages.push(Vec::new());
            }
        });
    }

    pub(crate) fn set_ready(&self, ready: bool) {
        self.with_state(|s| s.ready = ready);
    }

    pub(crate) fn set_list_present(&self, present: bool) {
        self.with_state(|s| s.list_present = present);
    }

    pub(crate) fn set_unreplied_active(&self, active: bool) {
        self.with_state(|s| s.unreplied_active = active);
    }

    pub(crate) fn set_on_login(&self, on_login: bool) {
        self.with_state(|s| s.on_login = on_login);
    }

    pub(crate) fn set_endless(&self) {
        self.with_state(|s| s.endless = true);
    }

    pub(crate) fn set_transcript(&self, transcript: Vec<ChatMessage>) {
        self.with_state(|s| s.transcript = transcript);
    }

    pub(crate) fn fail_open(&self, customer: &str, error: ShopdeskError) {
        self.with_state(|s| s.open_failures.insert(customer.to_string(), error));
    }

    /// The next read of the visible rows fails with `error`.
    pub(crate) fn fail_next_list_read(&self, error: ShopdeskError) {
        self.with_state(|s| s.list_failures.push_back(error));
    }

    pub(crate) fn vanish(&self, customer: &str) {
        self.with_state(|s| s.vanished.insert(customer.to_string()));
    }

    pub(crate) fn prepares(&self) -> usize {
        self.with_state(|s| s.prepares)
    }

    pub(crate) fn opened(&self) -> Vec<String> {
        self.with_state(|s| s.opened.clone())
    }

    /// `(customer, text)` per submitted reply.
    pub(crate) fn submitted(&self) -> Vec<(String, String)> {
        self.with_state(|s| s.submitted.clone())
    }
}

#[async_trait]
impl ChatConsole for FakeConsole {
    async fn prepare(&self) -> Result<bool> {
        Ok(self.with_state(|s| {
            s.prepares += 1;
            s.step = 0;
            s.ready
        }))
    }

    async fn select_unreplied_filter(&self) -> Result<bool> {
        Ok(self.with_state(|s| s.ready))
    }

    async fn unreplied_view_active(&self) -> Result<bool> {
        Ok(self.with_state(|s| s.unreplied_active))
    }

    async fn has_conversation_list(&self) -> Result<bool> {
        Ok(self.with_state(|s| s.list_present))
    }

    async fn visible_customers(&self) -> Result<Vec<String>> {
        self.with_state(|s| {
            if let Some(error) = s.list_failures.pop_front() {
                return Err(error);
            }
            let index = s.step.min(s.pages.len() - 1);
            Ok(s.pages[index].clone())
        })
    }

    async fn open_conversation(&self, customer: &str) -> Result<bool> {
        self.with_state(|s| {
            if let Some(error) = s.open_failures.get(customer) {
                return Err(error.clone());
            }
            if s.vanished.contains(customer) {
                return Ok(false);
            }
            s.opened.push(customer.to_string());
            s.current = Some(customer.to_string());
            Ok(true)
        })
    }

    async fn read_transcript(&self) -> Result<Vec<ChatMessage>> {
        Ok(self.with_state(|s| s.transcript.clone()))
    }

    async fn submit_reply(&self, text: &str) -> Result<()> {
        self.with_state(|s| {
            let customer = s.current.clone().unwrap_or_default();
            s.submitted.push((customer, text.to_string()));
        });
        Ok(())
    }

    async fn scroll_list(&self) -> Result<ScrollMetrics> {
        Ok(self.with_state(|s| {
            let last = s.pages.len() - 1;
            s.step += 1;
            if !s.endless {
                s.step = s.step.min(last);
            }
            let scroll_top = s.step as f64 * 50.0;
            let scroll_height = if s.endless {
                scroll_top + 1000.0
            } else {
                last as f64 * 50.0 + 100.0
            };
            ScrollMetrics {
                scroll_top,
                client_height: 100.0,
                scroll_height,
            }
        }))
    }

    async fn on_login_page(&self) -> Result<bool> {
        Ok(self.with_state(|s| s.on_login))
    }
}

/// Throttle table kept in memory.
#[derive(Default)]
pub(crate) struct MemoryRepository {
    rows: Mutex<Vec<LedgerEntry>>,
}

impl MemoryRepository {
    pub(crate) fn with_rows(rows: &[(&str, &str)]) -> Self {
        let repository = Self::default();
        *repository.rows.lock().unwrap() = rows
            .iter()
            .map(|(name, stamp)| LedgerEntry::new(*name, LedgerStamp::parse(stamp)))
            .collect();
        repository
    }

    pub(crate) fn rows(&self) -> Vec<LedgerEntry> {
        self.rows.lock().unwrap().clone()
    }

    pub(crate) fn stamp_of(&self, customer: &str) -> Option<String> {
        self.rows()
            .into_iter()
            .find(|row| row.customer == customer)
            .map(|row| row.last_reply.to_stored())
    }
}

#[async_trait]
impl ThrottleRepository for MemoryRepository {
    async fn load_all(&self) -> Result<Vec<LedgerEntry>> {
        Ok(self.rows())
    }

    async fn save_all(&self, entries: &[LedgerEntry]) -> Result<()> {
        *self.rows.lock().unwrap() = entries.to_vec();
        Ok(())
    }
}

/// Replays queued answers, then keeps answering with a fixed text.
pub(crate) struct ScriptedGenerator {
    answers: Mutex<VecDeque<Result<Option<String>>>>,
    histories: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedGenerator {
    pub(crate) const DEFAULT_ANSWER: &'static str = "generated reply";

    pub(crate) fn new() -> Self {
        Self {
            answers: Mutex::new(VecDeque::new()),
            histories: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn push(&self, answer: Result<Option<String>>) {
        self.answers.lock().unwrap().push_back(answer);
    }

    pub(crate) fn histories(&self) -> Vec<Vec<ChatMessage>> {
        self.histories.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplyGenerator for ScriptedGenerator {
    async fn generate(&self, history: &[ChatMessage]) -> Result<Option<String>> {
        self.histories.lock().unwrap().push(history.to_vec());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Some(Self::DEFAULT_ANSWER.to_string())))
    }
}

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::cookie::Cookie;
use super::locator::Locator;
use crate::error::Result;

/// Opaque reference to a DOM element inside one live session.
///
/// References become stale when the page re-renders; identity of business
/// objects (customers) must never be derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Special keys understood by `type_text`.
pub mod keys {
    pub const ENTER: char = '\u{E007}';
    pub const SHIFT: char = '\u{E008}';
    pub const NULL: char = '\u{E000}';
}

/// Launch parameters of the automation browser.
///
/// The profile directory is reused across restarts so cookies and local
/// storage survive a crashed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserProfile {
    /// Empty means "use the default data directory".
    #[serde(default)]
    pub user_data_dir: PathBuf,
    #[serde(default = "default_profile_directory")]
    pub profile_directory: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_window_size")]
    pub window_size: (u32, u32),
    #[serde(default)]
    pub headless: bool,
}

fn default_profile_directory() -> String {
    "Default".to_string()
}

fn default_language() -> String {
    "zh-TW".to_string()
}

fn default_window_size() -> (u32, u32) {
    (1280, 860)
}

const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

impl BrowserProfile {
    pub fn new(user_data_dir: impl Into<PathBuf>) -> Self {
        Self {
            user_data_dir: user_data_dir.into(),
            profile_directory: default_profile_directory(),
            user_agent: Some(DESKTOP_USER_AGENT.to_string()),
            language: default_language(),
            window_size: default_window_size(),
            headless: false,
        }
    }
}

impl Default for BrowserProfile {
    fn default() -> Self {
        Self::new(PathBuf::new())
    }
}

/// Primitive operations on one live automation context.
///
/// Implementations must report an invalidated or crashed session as
/// `ShopdeskError::SessionDead`; every other automation fault is
/// `ShopdeskError::Browser`.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn refresh(&self) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn title(&self) -> Result<String>;

    /// Returns `Ok(None)` when nothing matches.
    async fn find_element(
        &self,
        locator: &Locator,
        scope: Option<&ElementHandle>,
    ) -> Result<Option<ElementHandle>>;

    async fn find_elements(
        &self,
        locator: &Locator,
        scope: Option<&ElementHandle>,
    ) -> Result<Vec<ElementHandle>>;

    async fn click(&self, element: &ElementHandle) -> Result<()>;

    async fn clear(&self, element: &ElementHandle) -> Result<()>;

    /// Types `text`; characters from [`keys`] act as key presses.
    async fn type_text(&self, element: &ElementHandle, text: &str) -> Result<()>;

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>>;

    async fn text(&self, element: &ElementHandle) -> Result<String>;

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool>;

    /// Runs `script` with `args` bound to `arguments`. Element handles are
    /// passed via [`BrowserSession::element_arg`].
    async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value>;

    /// Encodes an element handle as a script argument.
    fn element_arg(&self, element: &ElementHandle) -> Value;

    async fn cookies(&self) -> Result<Vec<Cookie>>;

    async fn add_cookie(&self, cookie: &Cookie) -> Result<()>;

    /// PNG bytes of the current viewport.
    async fn screenshot(&self) -> Result<Vec<u8>>;

    async fn window_handles(&self) -> Result<Vec<String>>;

    async fn switch_to_window(&self, handle: &str) -> Result<()>;

    /// Ends the session; errors from an already dead session are ignored.
    async fn quit(&self) -> Result<()>;
}

/// Creates fresh automation sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, profile: &BrowserProfile) -> Result<Box<dyn BrowserSession>>;
}

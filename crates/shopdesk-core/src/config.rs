//! Aggregate configuration of the responder.
//!
//! The core only ever sees this in-memory struct; loading and saving lives in
//! `shopdesk-infrastructure`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::{AuthTimings, Credentials};
use crate::browser::BrowserProfile;
use crate::conversation::DEFAULT_SEEN_CAPACITY;
use crate::error::{Result, ShopdeskError};
use crate::reply::ReplyConfig;
use crate::schedule::ScheduleConfig;
use crate::throttle::DEFAULT_COOLDOWN_SECS;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub credentials: Credentials,
    pub schedule: ScheduleConfig,
    pub reply: ReplyConfig,
    pub console: ConsoleConfig,
    pub auth: AuthTimings,
    pub dispatch: DispatchConfig,
    pub driver: DriverConfig,
    pub webdriver: WebDriverConfig,
    pub assistant: AssistantConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        self.schedule.validate()?;
        if self.dispatch.seen_capacity == 0 {
            return Err(ShopdeskError::config("dispatch.seen_capacity must be positive"));
        }
        if self.driver.interval_secs == 0 {
            return Err(ShopdeskError::config("driver.interval_secs must be positive"));
        }
        if self.auth.poll_min_ms > self.auth.poll_max_ms {
            return Err(ShopdeskError::config(format!(
                "auth.poll_min_ms ({}) exceeds auth.poll_max_ms ({})",
                self.auth.poll_min_ms, self.auth.poll_max_ms
            )));
        }
        if self.console.verification_patterns.is_empty() {
            return Err(ShopdeskError::config("console.verification_patterns is empty"));
        }
        Ok(())
    }
}

/// Addresses of the seller console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Origin visited before cookies can be restored.
    pub seller_origin: String,
    pub chat_url: String,
    /// Login page; the chat URL is appended as `next`.
    pub login_url: String,
    pub verification_entry_url: String,
    pub login_domain: String,
    pub chat_domain: String,
    /// Substrings of a URL that mark a verification page.
    pub verification_patterns: Vec<String>,
    /// Domain given to restored cookies that carry none.
    pub cookie_domain_hint: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            seller_origin: "https://seller.shopee.tw".to_string(),
            chat_url: "https://seller.shopee.tw/new-webchat/conversations".to_string(),
            login_url: "https://accounts.shopee.tw/seller/login".to_string(),
            verification_entry_url: "https://shopee.tw/verify/ivs?is_initial=true".to_string(),
            login_domain: "accounts.shopee.tw".to_string(),
            chat_domain: "seller.shopee.tw".to_string(),
            verification_patterns: ["/verify", "/challenge", "captcha", "/portal/sgw"]
                .into_iter()
                .map(String::from)
                .collect(),
            cookie_domain_hint: ".shopee.tw".to_string(),
        }
    }
}

/// Limits of one dispatch cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub seen_capacity: usize,
    pub cooldown_secs: i64,
    pub max_cycle_secs: u64,
    /// No-new-entry period that ends the list scan once at the bottom.
    pub list_quiet_secs: u64,
    /// No-new-entry period that ends transcript history loading.
    pub transcript_quiet_secs: u64,
    pub list_scroll_step_px: f64,
    pub transcript_scroll_step_px: f64,
    /// Pause after each list scroll so rows can render.
    pub list_settle_ms: u64,
    pub element_timeout_secs: u64,
    /// Attempts of the page-readiness check before the cycle gives up.
    pub ready_attempts: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            seen_capacity: DEFAULT_SEEN_CAPACITY,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            max_cycle_secs: 600,
            list_quiet_secs: 5,
            transcript_quiet_secs: 10,
            list_scroll_step_px: 50.0,
            transcript_scroll_step_px: 100.0,
            list_settle_ms: 3000,
            element_timeout_secs: 10,
            ready_attempts: 4,
        }
    }
}

impl DispatchConfig {
    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cooldown_secs)
    }

    pub fn max_cycle(&self) -> Duration {
        Duration::from_secs(self.max_cycle_secs)
    }

    pub fn list_quiet(&self) -> Duration {
        Duration::from_secs(self.list_quiet_secs)
    }

    pub fn transcript_quiet(&self) -> Duration {
        Duration::from_secs(self.transcript_quiet_secs)
    }

    pub fn list_settle(&self) -> Duration {
        Duration::from_millis(self.list_settle_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub interval_secs: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl DriverConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Connection to the WebDriver endpoint and the browser it launches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverConfig {
    pub endpoint: String,
    pub request_timeout_secs: u64,
    /// Budget of the `return 1` liveness probe.
    pub probe_timeout_secs: u64,
    pub profile: BrowserProfile,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9515".to_string(),
            request_timeout_secs: 60,
            probe_timeout_secs: 5,
            profile: BrowserProfile::default(),
        }
    }
}

impl WebDriverConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// OpenAI access used by the reply generators.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// With an assistant id the Assistants API is used, otherwise Chat
    /// Completions with `model`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,
    pub base_url: String,
    pub model: String,
    pub instructions: String,
    pub run_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            assistant_id: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            instructions: "You are the seller; help the customer resolve their issue.".to_string(),
            run_timeout_secs: 90,
            poll_interval_ms: 1000,
        }
    }
}

impl std::fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("assistant_id", &self.assistant_id)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("run_timeout_secs", &self.run_timeout_secs)
            .finish()
    }
}

impl AssistantConfig {
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

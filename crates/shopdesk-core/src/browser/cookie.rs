use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A browser cookie in WebDriver's JSON shape.
///
/// Unknown attributes are preserved in `extra` so that a dump/restore cycle
/// does not lose information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            secure: None,
            http_only: None,
            expiry: None,
            same_site: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Prepares a stored cookie for re-injection: drops `sameSite`, which
    /// browsers frequently reject, and fills a missing domain.
    pub fn sanitized_for_restore(mut self, domain_hint: &str) -> Self {
        self.same_site = None;
        if self.domain.as_deref().is_none_or(str::is_empty) {
            self.domain = Some(domain_hint.to_string());
        }
        self
    }
}

/// Durable storage for session cookies.
#[async_trait]
pub trait CookieStore: Send + Sync {
    /// Returns `None` when nothing has been stored yet.
    async fn load(&self) -> Result<Option<Vec<Cookie>>>;

    async fn save(&self, cookies: &[Cookie]) -> Result<()>;
}

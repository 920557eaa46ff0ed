//! JSON-backed CookieStore.

use std::path::PathBuf;

use async_trait::async_trait;
use shopdesk_core::Result;
use shopdesk_core::browser::{Cookie, CookieStore};

use crate::storage::AtomicFile;

/// Stores the cookie jar as a pretty-printed JSON array.
pub struct JsonCookieStore {
    file: AtomicFile,
}

impl JsonCookieStore {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            file: AtomicFile::new(path),
        }
    }
}

#[async_trait]
impl CookieStore for JsonCookieStore {
    async fn load(&self) -> Result<Option<Vec<Cookie>>> {
        let Some(content) = self.file.read_to_string()? else {
            return Ok(None);
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        let cookies: Vec<Cookie> = serde_json::from_str(&content)?;
        Ok(Some(cookies))
    }

    async fn save(&self, cookies: &[Cookie]) -> Result<()> {
        let json = serde_json::to_string_pretty(cookies)?;
        self.file.write(json.as_bytes())?;
        tracing::debug!(target: "session", "Persisted {} cookies", cookies.len());
        Ok(())
    }
}

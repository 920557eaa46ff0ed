//! Creates Chrome sessions through a WebDriver endpoint.

use std::fs;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};
use shopdesk_core::browser::{BrowserLauncher, BrowserProfile, BrowserSession};
use shopdesk_core::{Result, ShopdeskError};

use super::client::WebDriverClient;
use super::session::WebDriverSession;

/// Starts a new Chrome session per `launch` call against one endpoint
/// (typically a local `chromedriver`).
pub struct WebDriverLauncher {
    client: WebDriverClient,
}

impl WebDriverLauncher {
    pub fn new(endpoint: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: WebDriverClient::new(endpoint, request_timeout)?,
        })
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self, profile: &BrowserProfile) -> Result<Box<dyn BrowserSession>> {
        fs::create_dir_all(&profile.user_data_dir)?;
        repair_profile(&profile.user_data_dir, &profile.profile_directory);

        let value = self
            .client
            .command(Method::POST, "/session", Some(capabilities(profile)))
            .await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| ShopdeskError::browser(format!("New session response without id: {}", value)))?;

        tracing::info!(
            target: "session",
            endpoint = self.client.endpoint(),
            session_id,
            "Browser session started"
        );
        Ok(Box::new(WebDriverSession::new(self.client.clone(), session_id)))
    }
}

/// Chrome capabilities for `profile`.
pub(crate) fn capabilities(profile: &BrowserProfile) -> Value {
    let (width, height) = profile.window_size;
    let mut args = vec![
        format!("--user-data-dir={}", profile.user_data_dir.display()),
        format!("--profile-directory={}", profile.profile_directory),
        format!("--lang={}", profile.language),
        format!("--window-size={},{}", width, height),
    ];
    if let Some(agent) = &profile.user_agent {
        args.push(format!("--user-agent={}", agent));
    }
    if profile.headless {
        args.push("--headless=new".to_string());
    }

    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "goog:chromeOptions": {
                    "args": args,
                    "prefs": {
                        "profile.default_content_setting_values.notifications": 2,
                        "intl.accept_languages": profile.language,
                    }
                }
            }
        }
    })
}

/// Chrome refuses to start on a profile whose preference files are not valid
/// JSON. Corrupt files are moved to `*.bak` and replaced with `{}`.
pub(crate) fn repair_profile(user_data_dir: &Path, profile_directory: &str) {
    let profile_dir = user_data_dir.join(profile_directory);
    let candidates = [
        profile_dir.join("Preferences"),
        profile_dir.join("Secure Preferences"),
        user_data_dir.join("Local State"),
    ];
    for path in candidates {
        let Ok(content) = fs::read_to_string(&path) else {
            continue;
        };
        if serde_json::from_str::<Value>(&content).is_ok() {
            continue;
        }
        tracing::warn!(target: "session", path = %path.display(), "Replacing corrupt browser preference file");
        let mut backup = path.clone().into_os_string();
        backup.push(".bak");
        let _ = fs::rename(&path, &backup);
        if let Err(e) = fs::write(&path, "{}") {
            tracing::warn!(target: "session", "Failed to reset {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_capabilities_carry_profile() {
        let profile = BrowserProfile::new("/tmp/shopdesk-profile");
        let caps = capabilities(&profile);
        let args = caps["capabilities"]["alwaysMatch"]["goog:chromeOptions"]["args"]
            .as_array()
            .unwrap();
        let args: Vec<&str> = args.iter().filter_map(Value::as_str).collect();
        assert!(args.contains(&"--user-data-dir=/tmp/shopdesk-profile"));
        assert!(args.contains(&"--profile-directory=Default"));
        assert!(args.contains(&"--lang=zh-TW"));
        assert!(args.contains(&"--window-size=1280,860"));
        assert!(args.iter().any(|a| a.starts_with("--user-agent=")));
        assert!(!args.contains(&"--headless=new"));
    }

    #[test]
    fn test_repair_profile_resets_corrupt_preferences() {
        let temp_dir = TempDir::new().unwrap();
        let default_dir = temp_dir.path().join("Default");
        fs::create_dir_all(&default_dir).unwrap();
        fs::write(default_dir.join("Preferences"), "{not json").unwrap();
        fs::write(temp_dir.path().join("Local State"), "{\"ok\":true}").unwrap();

        repair_profile(temp_dir.path(), "Default");

        assert_eq!(fs::read_to_string(default_dir.join("Preferences")).unwrap(), "{}");
        assert_eq!(
            fs::read_to_string(default_dir.join("Preferences.bak")).unwrap(),
            "{not json"
        );
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("Local State")).unwrap(),
            "{\"ok\":true}"
        );
    }
}

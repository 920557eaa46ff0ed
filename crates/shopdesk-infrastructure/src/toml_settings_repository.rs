//! TOML-backed application settings.

use std::path::{Path, PathBuf};

use shopdesk_core::Result;
use shopdesk_core::config::AppConfig;

use crate::paths::ShopdeskPaths;
use crate::storage::AtomicTomlFile;

pub const ENV_ACCOUNT: &str = "SHOPDESK_ACCOUNT";
pub const ENV_PASSWORD: &str = "SHOPDESK_PASSWORD";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_OPENAI_ASSISTANT_ID: &str = "OPENAI_ASSISTANT_ID";

/// Loads and saves [`AppConfig`].
///
/// Responsibilities:
/// - Read `config.toml`, falling back to defaults when it is absent
/// - Apply secret overrides from the environment
/// - Point an unset browser profile at the data directory
pub struct TomlSettingsRepository {
    file: AtomicTomlFile<AppConfig>,
    paths: ShopdeskPaths,
}

impl TomlSettingsRepository {
    /// Uses `paths.config_file()`.
    pub fn new(paths: ShopdeskPaths) -> Self {
        Self {
            file: AtomicTomlFile::new(paths.config_file()),
            paths,
        }
    }

    /// Custom config file (from `--config`), data files still under `paths`.
    pub fn with_path(path: impl Into<PathBuf>, paths: ShopdeskPaths) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
            paths,
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn load(&self) -> Result<AppConfig> {
        self.load_with_env(|key| std::env::var(key).ok())
    }

    /// Like [`load`](Self::load) with an explicit environment lookup.
    pub fn load_with_env<F>(&self, env: F) -> Result<AppConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match self.file.load()? {
            Some(config) => config,
            None => {
                tracing::info!(
                    target: "config",
                    "No config at {}; using defaults",
                    self.file.path().display()
                );
                AppConfig::default()
            }
        };

        apply_env_overrides(&mut config, env);
        if config.webdriver.profile.user_data_dir.as_os_str().is_empty() {
            config.webdriver.profile.user_data_dir = self.paths.browser_profile_dir();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &AppConfig) -> Result<()> {
        config.validate()?;
        self.file.save(config)
    }

    /// Writes a default config unless one exists. Returns whether a file was
    /// written.
    pub fn init_template(&self, force: bool) -> Result<bool> {
        if self.file.path().exists() && !force {
            return Ok(false);
        }
        self.file.save(&AppConfig::default())?;
        Ok(true)
    }
}

fn apply_env_overrides<F>(config: &mut AppConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| env(key).filter(|value| !value.trim().is_empty());

    if let Some(account) = non_empty(ENV_ACCOUNT) {
        config.credentials.account = account;
    }
    if let Some(password) = non_empty(ENV_PASSWORD) {
        config.credentials.password = password;
    }
    if let Some(key) = non_empty(ENV_OPENAI_API_KEY) {
        config.assistant.api_key = Some(key);
    }
    if let Some(id) = non_empty(ENV_OPENAI_ASSISTANT_ID) {
        config.assistant.assistant_id = Some(id);
    }
}

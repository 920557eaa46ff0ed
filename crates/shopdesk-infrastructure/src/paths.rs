//! Unified path management for shopdesk files.
//!
//! ```text
//! ~/.config/shopdesk/          # Config directory
//! └── config.toml              # AppConfig
//!
//! ~/.local/share/shopdesk/     # Data directory
//! ├── reply_whitelist.csv      # Throttle ledger
//! ├── cookies.json             # Persisted session cookies
//! ├── nav.log                  # Navigation audit trail
//! ├── chrome-profile/          # Persistent browser profile
//! ├── diagnostics/             # Failure screenshots
//! └── logs/                    # tracing output
//!     └── shopdesk.log.YYYY-MM-DD
//! ```

use std::path::{Path, PathBuf};

use shopdesk_core::ShopdeskError;

const APP_DIR: &str = "shopdesk";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for ShopdeskError {
    fn from(err: PathError) -> Self {
        ShopdeskError::config(err.to_string())
    }
}

/// Locations of every file the responder owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopdeskPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl ShopdeskPaths {
    /// Platform defaults (XDG on Linux).
    pub fn resolve() -> Result<Self, PathError> {
        let config_dir = dirs::config_dir().ok_or(PathError::HomeDirNotFound)?.join(APP_DIR);
        let data_dir = dirs::data_dir().ok_or(PathError::HomeDirNotFound)?.join(APP_DIR);
        Ok(Self { config_dir, data_dir })
    }

    /// Everything under one directory (for tests and portable installs).
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            config_dir: root.to_path_buf(),
            data_dir: root.to_path_buf(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn ledger_file(&self) -> PathBuf {
        self.data_dir.join("reply_whitelist.csv")
    }

    pub fn cookie_file(&self) -> PathBuf {
        self.data_dir.join("cookies.json")
    }

    pub fn nav_log_file(&self) -> PathBuf {
        self.data_dir.join("nav.log")
    }

    pub fn browser_profile_dir(&self) -> PathBuf {
        self.data_dir.join("chrome-profile")
    }

    pub fn diagnostics_dir(&self) -> PathBuf {
        self.data_dir.join("diagnostics")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    /// Creates the config, data, diagnostics and logs directories.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.config_dir.clone(),
            self.data_dir.clone(),
            self.diagnostics_dir(),
            self.logs_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_with_root_layout() {
        let temp_dir = TempDir::new().unwrap();
        let paths = ShopdeskPaths::with_root(temp_dir.path());
        assert_eq!(paths.ledger_file(), temp_dir.path().join("reply_whitelist.csv"));
        assert_eq!(paths.cookie_file(), temp_dir.path().join("cookies.json"));

        paths.ensure_dirs().unwrap();
        assert!(paths.logs_dir().is_dir());
        assert!(paths.diagnostics_dir().is_dir());
    }
}

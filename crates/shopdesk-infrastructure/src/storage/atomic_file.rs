//! Crash-safe whole-file replacement.
//!
//! Every write goes to a sibling temp file, is fsynced, and is renamed over
//! the target, so readers see either the old or the new content. Writers are
//! serialized through an `fs2` lock file next to the target.

use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use shopdesk_core::{Result, ShopdeskError};

/// A file replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct AtomicFile {
    path: PathBuf,
}

impl AtomicFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when the file does not exist.
    pub fn read_to_string(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces the file with `bytes`.
    pub fn write(&self, bytes: &[u8]) -> Result<()> {
        let _lock = FileLock::acquire(&self.path)?;
        self.write_unlocked(bytes)
    }

    /// Read-modify-write under the lock.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(Option<String>) -> Result<Vec<u8>>,
    {
        let _lock = FileLock::acquire(&self.path)?;
        let next = f(self.read_to_string()?)?;
        self.write_unlocked(&next)
    }

    fn write_unlocked(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(bytes)?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn temp_path(&self) -> Result<PathBuf> {
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| ShopdeskError::io(format!("{} has no file name", self.path.display())))?;
        let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
        Ok(self.path.with_file_name(tmp_name))
    }
}

/// A TOML document stored through [`AtomicFile`].
pub struct AtomicTomlFile<T> {
    file: AtomicFile,
    _phantom: PhantomData<T>,
}

impl<T> AtomicTomlFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: AtomicFile::new(path),
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// `None` when the file is missing or blank.
    pub fn load(&self) -> Result<Option<T>> {
        match self.file.read_to_string()? {
            Some(content) if !content.trim().is_empty() => Ok(Some(toml::from_str(&content)?)),
            _ => Ok(None),
        }
    }

    pub fn save(&self, data: &T) -> Result<()> {
        let text = toml::to_string_pretty(data)?;
        self.file.write(text.as_bytes())
    }
}

/// Exclusive lock held for the lifetime of the guard.
struct FileLock {
    #[allow(dead_code)]
    file: File,
    lock_path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self> {
        let lock_path = path.with_extension("lock");
        if let Some(parent) = lock_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()
                .map_err(|e| ShopdeskError::io(format!("Failed to acquire lock: {}", e)))?;
        }

        Ok(FileLock { file, lock_path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

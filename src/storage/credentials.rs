use crate::storage::errors::{Result, StorageError};
use directories::ProjectDirs;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Name/value persistence for login credentials, in the manner of a
/// browser cookie jar
pub trait CredentialStore: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&self, name: &str, value: &str) -> Result<()>;
    fn remove(&self, name: &str) -> Result<()>;
}

/// Process-local store, mostly for tests and one-shot tools
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, name: &str) -> Option<String> {
        self.values.lock().ok()?.get(name).cloned()
    }

    fn set(&self, name: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| StorageError::PathError("credential store lock poisoned".to_string()))?;
        values.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| StorageError::PathError("credential store lock poisoned".to_string()))?;
        values.remove(name);
        Ok(())
    }
}

/// Credentials kept as a flat TOML table on disk
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store under the platform data directory
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(default_credentials_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(toml::from_str(&content)?)
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string(values)?;
        std::fs::write(&self.path, content)?;
        debug!("Wrote {} credential entries to {}", values.len(), self.path.display());
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| StorageError::PathError("credential file lock poisoned".to_string()))?;
        let mut values = self.read_all()?;
        f(&mut values);
        self.write_all(&values)
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, name: &str) -> Option<String> {
        let _guard = self.lock.lock().ok()?;
        match self.read_all() {
            Ok(mut values) => values.remove(name),
            Err(e) => {
                warn!("Ignoring unreadable credential file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn set(&self, name: &str, value: &str) -> Result<()> {
        self.update(|values| {
            values.insert(name.to_string(), value.to_string());
        })
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.update(|values| {
            values.remove(name);
        })
    }
}

/// Default location of the credential file for the current platform
pub fn default_credentials_path() -> Result<PathBuf> {
    ProjectDirs::from("dev", "gambit", "gambit")
        .map(|dirs| dirs.data_dir().join("credentials.toml"))
        .ok_or_else(|| StorageError::PathError("could not determine data directory".to_string()))
}

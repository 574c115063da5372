//! Key/value storage backends
//!
//! Two storage scopes are used by the login flow: durable storage for the
//! bearer tokens and short-lived storage for the in-flight PKCE context.
//! Every write replaces the whole value for a key; nothing is merged.
//!
//! `FileStorage` keeps a JSON object on disk and holds no cache. Each
//! operation re-reads the file, and each mutation is a read-modify-write
//! that replaces the file through a temp file + rename. Separate processes
//! sharing one file therefore converge to the last writer.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// String key/value storage supplied by the host platform.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Store every pair in one write: either all of them land or none do.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()>;

    /// Delete `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Read `key` and delete it in the same call.
    ///
    /// The value is gone from storage before it is returned, so it can be
    /// observed at most once.
    fn take(&self, key: &str) -> Result<Option<String>> {
        let value = self.get(key);
        self.remove(key)?;
        Ok(value)
    }
}

/// Process-local storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_many(&[(key, value)])
    }

    fn set_many(&self, pairs: &[(&str, &str)]) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in pairs {
            entries.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// JSON-file-backed storage.
///
/// The Mutex serializes read-modify-write cycles within this process; the
/// file itself is the only copy of the data.
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Open storage at `path`. A missing file reads as empty; a corrupt one
    /// is rejected here rather than on first use.
    pub fn open(path: PathBuf) -> Result<Self> {
        if path.exists() {
            let entries = read_map(&path)?;
            info!(path = %path.display(), keys = entries.len(), "opened storage");
        } else {
            info!(path = %path.display(), "storage file not found, starting empty");
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to the current file contents and persist the result
    /// if `change` reports a modification.
    fn update(&self, change: impl FnOnce(&mut HashMap<String, String>) -> bool) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = read_map(&self.path)?;
        if change(&mut entries) {
            write_atomic(&self.path, &entries)?;
        }
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        match read_map(&self.path) {
            Ok(mut entries) => entries.remove(key),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "storage unreadable");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_many(&[(key, value)])
    }

    fn set_many(&self, pairs: &[(&str, &str)]) -> Result<()> {
        self.update(|entries| {
            for (key, value) in pairs {
                entries.insert(key.to_string(), value.to_string());
                debug!(key, "stored value");
            }
            true
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| {
            let removed = entries.remove(key).is_some();
            if removed {
                debug!(key, "removed value");
            }
            removed
        })
    }
}

/// Current contents of `path`; a missing file is an empty map.
fn read_map(path: &Path) -> Result<HashMap<String, String>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => return Err(Error::Io(format!("reading storage file: {e}"))),
    };
    serde_json::from_str(&contents)
        .map_err(|e| Error::StorageParse(format!("parsing storage file: {e}")))
}

/// Write the map to `path` atomically with 0600 permissions (unix).
fn write_atomic(path: &Path, data: &HashMap<String, String>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::StorageParse(format!("serializing storage: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("storage path has no parent directory".into()))?;
    std::fs::create_dir_all(dir)
        .map_err(|e| Error::Io(format!("creating storage directory: {e}")))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| Error::Io(format!("creating temp storage file: {e}")))?;
    tmp.write_all(json.as_bytes())
        .map_err(|e| Error::Io(format!("writing temp storage file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(tmp.path(), perms)
            .map_err(|e| Error::Io(format!("setting storage file permissions: {e}")))?;
    }

    tmp.persist(path)
        .map_err(|e| Error::Io(format!("replacing storage file: {}", e.error)))?;

    debug!(path = %path.display(), "persisted storage");
    Ok(())
}

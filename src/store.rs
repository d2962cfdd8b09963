//! Identity persistence behind a storage port.
//!
//! The platform exposes a synchronous key-value storage API; this module
//! models it as the [`IdentityStore`] trait over a single fixed slot so the
//! auth logic can run against any backing (and tests need no platform
//! runtime). Two adapters ship here: an in-process [`MemoryStore`] and a
//! JSON-file [`FileStore`].
//!
//! Reads fail soft everywhere: a missing or unreadable record means "no
//! cached identity", never a crash. Writes replace the record wholesale.
//! Concurrent writers are not coordinated; the later write wins, which is
//! acceptable because every persisted record is valid until its own expiry.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tracing::warn;

use crate::error::{Error, Result};
use crate::identity::IdentityRecord;

/// File name of the persisted identity slot.
const IDENTITY_FILE: &str = "identity.json";

/// Storage port for the persisted identity record.
pub trait IdentityStore: Send + Sync {
    fn load(&self) -> Result<Option<IdentityRecord>>;
    fn save(&self, record: &IdentityRecord) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// In-process store; the default for tests and devtools runs.
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<IdentityRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryStore {
    fn load(&self) -> Result<Option<IdentityRecord>> {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        Ok(slot.clone())
    }

    fn save(&self, record: &IdentityRecord) -> Result<()> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = None;
        Ok(())
    }
}

/// JSON-file store under a base directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: base_dir.into().join(IDENTITY_FILE),
        }
    }

    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::Storage(e.to_string()))?;
        }
        Ok(())
    }
}

impl IdentityStore for FileStore {
    fn load(&self) -> Result<Option<IdentityRecord>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Error::Storage(err.to_string())),
        };
        let record = serde_json::from_str(&raw)?;
        Ok(Some(record))
    }

    fn save(&self, record: &IdentityRecord) -> Result<()> {
        Self::ensure_parent(&self.path)?;
        let json = serde_json::to_string(record)?;
        fs::write(&self.path, json).map_err(|e| Error::Storage(e.to_string()))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::Storage(err.to_string())),
        }
    }
}

/// Build the `Authorization` header map from the persisted identity.
///
/// Yields `Authorization: Bearer <token>` when a record with a non-empty
/// access token is present, an empty map otherwise. Storage failures are
/// logged and treated as "no token"; this never returns an error, so callers
/// merge the result into outgoing headers unconditionally.
pub fn auth_header(store: &dyn IdentityStore) -> HeaderMap {
    let mut headers = HeaderMap::new();
    match store.load() {
        Ok(Some(record)) if !record.token.access_token.is_empty() => {
            match HeaderValue::from_str(&record.token.bearer()) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(e) => warn!("access token not header-safe: {e}"),
            }
        }
        Ok(_) => {}
        Err(e) => warn!("identity read failed, sending unauthenticated: {e}"),
    }
    headers
}

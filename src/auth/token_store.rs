//! Best-effort API token store.
//!
//! The device guards every write endpoint with an optional shared token.
//! [`TokenStore`] keeps that token in durable storage and never lets a
//! storage failure reach its caller: a failed read looks like "no token",
//! a failed write is logged and forgotten.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::LinkError;

/// Header carrying the token on write requests.
pub const TOKEN_HEADER: &str = "X-AP-Token";

/// Durable backing storage for the token.
pub trait TokenStorage: Send + Sync + fmt::Debug {
    /// Reads the stored token, `Ok(None)` if nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the storage cannot be read.
    fn load(&self) -> io::Result<Option<String>>;

    /// Stores `token`, or removes the stored token when `None`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the storage cannot be written.
    fn store(&self, token: Option<&str>) -> io::Result<()>;
}

/// Token kept in a single file. A missing file means no token.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    /// Creates storage backed by `path`. The file need not exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> io::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents.trim().to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn store(&self, token: Option<&str>) -> io::Result<()> {
        match token {
            Some(token) => std::fs::write(&self.path, token),
            None => match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            },
        }
    }
}

/// Process-local storage, for tests and embedders without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStorage {
    /// Creates empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> io::Result<Option<String>> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn store(&self, token: Option<&str>) -> io::Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = token.map(str::to_string);
        Ok(())
    }
}

/// Shared handle to the API token.
///
/// Cheap to clone; all clones see the same storage.
#[derive(Debug, Clone)]
pub struct TokenStore {
    storage: Arc<dyn TokenStorage>,
}

impl TokenStore {
    /// Wraps a storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        Self { storage }
    }

    /// Store backed by a file at `path`.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileTokenStorage::new(path)))
    }

    /// Store backed by process memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStorage::new()))
    }

    /// Reads the token, surfacing storage failures.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Storage`] if the backend cannot be read.
    pub fn try_get(&self) -> Result<Option<String>, LinkError> {
        let token = self.storage.load()?;
        Ok(token.filter(|t| !t.is_empty()))
    }

    /// Stores `token`, surfacing storage failures. `None` or an empty
    /// string clears it.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Storage`] if the backend cannot be written.
    pub fn try_set(&self, token: Option<&str>) -> Result<(), LinkError> {
        self.storage.store(token.filter(|t| !t.is_empty()))?;
        Ok(())
    }

    /// Returns the token, or `None` if none is stored or storage failed.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.try_get().unwrap_or_else(|e| {
            tracing::warn!(code = e.code(), error = %e, "continuing without token");
            None
        })
    }

    /// Stores `token`. `None` or an empty string clears it.
    ///
    /// Storage failures are logged and otherwise ignored.
    pub fn set(&self, token: Option<&str>) {
        if let Err(e) = self.try_set(token) {
            tracing::warn!(code = e.code(), error = %e, "token not saved");
        }
    }

    /// Convenience for `set(None)`.
    pub fn clear(&self) {
        self.set(None);
    }
}

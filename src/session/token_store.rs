//! Token Store — persistent access/refresh token pair plus the advisory flag.
//!
//! ARCHITECTURE
//! ============
//! Storage and the advisory flag are separate seams. The real tokens live in
//! a [`TokenStorage`] backend the gate server cannot see; the flag is a
//! non-sensitive `hasTokens` cookie the gate *can* see on the next
//! navigation. The flag is a redirect hint only and is never used for
//! authorization.
//!
//! ERROR HANDLING
//! ==============
//! The store never returns errors. A failing backend is logged and treated
//! as "no tokens" on read, and as a no-op on write.

#[cfg(test)]
#[path = "token_store_test.rs"]
mod tests;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use super::error::StorageError;
use super::types::{StoredTokens, TokenPair};

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const ADVISORY_COOKIE_NAME: &str = "hasTokens";

// =============================================================================
// SEAMS
// =============================================================================

/// String key/value storage with the semantics of browser local storage.
pub trait TokenStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Write several entries as one unit. Backends that can do this
    /// atomically should override the default.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// Sink for the advisory "a token pair exists" signal.
pub trait AdvisoryFlag: Send + Sync {
    fn set_present(&self, present: bool);
}

/// Build the `hasTokens` cookie. `present = false` yields an expiring cookie
/// that removes the flag.
#[must_use]
pub fn advisory_cookie(present: bool, secure: bool) -> Cookie<'static> {
    let builder = Cookie::build((ADVISORY_COOKIE_NAME, if present { "true" } else { "" }))
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure);
    if present { builder.build() } else { builder.max_age(Duration::ZERO).build() }
}

// =============================================================================
// STORAGE BACKENDS
// =============================================================================

/// Process-local storage. Lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory storage lock poisoned".into()))
    }
}

impl TokenStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut map = self.lock()?;
        for (key, value) in entries {
            map.insert((*key).to_owned(), (*value).to_owned());
        }
        Ok(())
    }
}

/// JSON-file storage so a CLI session survives between invocations.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(HashMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }

    fn update<F>(&self, mutate: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut HashMap<String, String>),
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StorageError::Unavailable("file storage lock poisoned".into()))?;
        let mut entries = self.read_all()?;
        mutate(&mut entries);
        self.write_all(&entries)
    }
}

impl TokenStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.remove(key);
        })
    }

    fn set_many(&self, pairs: &[(&str, &str)]) -> Result<(), StorageError> {
        self.update(|entries| {
            for (key, value) in pairs {
                entries.insert((*key).to_owned(), (*value).to_owned());
            }
        })
    }
}

// =============================================================================
// FLAG SINKS
// =============================================================================

/// In-memory flag, readable back for assertions and the CLI status line.
#[derive(Debug, Default)]
pub struct MemoryFlag {
    present: AtomicBool,
}

impl MemoryFlag {
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.present.load(Ordering::SeqCst)
    }
}

impl AdvisoryFlag for MemoryFlag {
    fn set_present(&self, present: bool) {
        self.present.store(present, Ordering::SeqCst);
    }
}

/// Queues the `hasTokens` cookie for whatever shell owns the cookie jar.
#[derive(Debug, Default)]
pub struct CookieFlag {
    secure: bool,
    pending: Mutex<Option<Cookie<'static>>>,
}

impl CookieFlag {
    #[must_use]
    pub fn new(secure: bool) -> Self {
        Self { secure, pending: Mutex::new(None) }
    }

    /// Take the most recent flag change as a `Set-Cookie` header value.
    pub fn take_set_cookie(&self) -> Option<String> {
        self.pending
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .map(|cookie| cookie.to_string())
    }
}

impl AdvisoryFlag for CookieFlag {
    fn set_present(&self, present: bool) {
        if let Ok(mut slot) = self.pending.lock() {
            *slot = Some(advisory_cookie(present, self.secure));
        }
    }
}

// =============================================================================
// TOKEN STORE
// =============================================================================

/// The only component that touches persistent token storage.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn TokenStorage>,
    flag: Arc<dyn AdvisoryFlag>,
}

impl TokenStore {
    #[must_use]
    pub fn new(storage: Arc<dyn TokenStorage>, flag: Arc<dyn AdvisoryFlag>) -> Self {
        Self { storage, flag }
    }

    /// Memory-backed store with a memory flag.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::default()), Arc::new(MemoryFlag::default()))
    }

    /// Persist both tokens, then raise the advisory flag.
    pub fn save(&self, pair: &TokenPair) {
        let entries = [(ACCESS_TOKEN_KEY, pair.access_token.as_str()), (REFRESH_TOKEN_KEY, pair.refresh_token.as_str())];
        match self.storage.set_many(&entries) {
            Ok(()) => self.flag.set_present(true),
            Err(e) => tracing::warn!(error = %e, "token save failed; keeping previous tokens"),
        }
    }

    /// Current tokens. A failing backend reads as "no tokens".
    #[must_use]
    pub fn load(&self) -> StoredTokens {
        let read = |key: &str| match self.storage.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, key, "token load failed; treating as absent");
                None
            }
        };
        StoredTokens { access_token: read(ACCESS_TOKEN_KEY), refresh_token: read(REFRESH_TOKEN_KEY) }
    }

    /// Remove both tokens and lower the advisory flag.
    pub fn clear(&self) {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(error = %e, key, "token removal failed");
            }
        }
        self.flag.set_present(false);
    }

    #[must_use]
    pub fn has_tokens(&self) -> bool {
        !self.load().is_empty()
    }

    /// Re-derive the advisory flag from what storage actually holds.
    pub fn sync_flag(&self) {
        self.flag.set_present(self.has_tokens());
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}

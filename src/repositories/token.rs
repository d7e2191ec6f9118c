use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::Result;
use crate::models::session::SessionToken;

/// The single well-known key the session token lives under.
pub const TOKEN_KEY: &str = "token";

/// Durable key-value storage for the session token.
///
/// The token is the only client state that survives a restart.
pub trait TokenRepository: Send + Sync {
    /// Reads the stored token, if any.
    fn load(&self) -> Result<Option<SessionToken>>;

    /// Stores the token, replacing any previous one.
    fn save(&self, token: &SessionToken) -> Result<()>;

    /// Removes the stored token. Succeeds when nothing was stored.
    fn remove(&self) -> Result<()>;
}

/// Stores the token in a small JSON object on disk, `0600` on unix.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        match sonic_rs::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!("Ignoring unreadable token file {}: {}", self.path.display(), e);
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if entries.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path)?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, sonic_rs::to_string(entries)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

impl TokenRepository for FileTokenStore {
    fn load(&self) -> Result<Option<SessionToken>> {
        Ok(self
            .read_entries()?
            .remove(TOKEN_KEY)
            .filter(|token| !token.is_empty())
            .map(SessionToken::new))
    }

    fn save(&self, token: &SessionToken) -> Result<()> {
        let mut entries = self.read_entries()?;
        entries.insert(TOKEN_KEY.to_string(), token.expose().to_string());
        self.write_entries(&entries)?;
        tracing::debug!("Session token saved to {}", self.path.display());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        let mut entries = self.read_entries()?;
        if entries.remove(TOKEN_KEY).is_some() {
            self.write_entries(&entries)?;
            tracing::debug!("Session token removed from {}", self.path.display());
        }
        Ok(())
    }
}

/// In-memory storage, for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        let store = Self::default();
        store.entries.lock().insert(TOKEN_KEY.to_string(), token.to_string());
        store
    }

    /// Raw view of what is stored under the token key.
    pub fn stored(&self) -> Option<String> {
        self.entries.lock().get(TOKEN_KEY).cloned()
    }
}

impl TokenRepository for MemoryTokenStore {
    fn load(&self) -> Result<Option<SessionToken>> {
        Ok(self.stored().map(SessionToken::new))
    }

    fn save(&self, token: &SessionToken) -> Result<()> {
        self.entries
            .lock()
            .insert(TOKEN_KEY.to_string(), token.expose().to_string());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        self.entries.lock().remove(TOKEN_KEY);
        Ok(())
    }
}

use std::sync::Arc;

use parking_lot::RwLock;

use crate::api::client::TokenProvider;
use crate::error::Result;
use crate::models::session::{Session, SessionToken};
use crate::repositories::token::TokenRepository;

/// Process-wide owner of the session: the persisted token and the in-memory
/// [`Session`] derived from it. Only the auth controller and the API
/// client's 401 handling write to it.
pub struct SessionStore {
    repository: Arc<dyn TokenRepository>,
    session: RwLock<Session>,
}

impl SessionStore {
    /// Opens the store, restoring a previously persisted token as an
    /// unverified session.
    pub fn open(repository: Arc<dyn TokenRepository>) -> Self {
        let token = match repository.load() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Could not read the stored session token: {}", e);
                None
            }
        };
        if token.is_some() {
            tracing::debug!("Restored a stored session token, verification pending");
        }

        Self {
            repository,
            session: RwLock::new(Session::restored(token)),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.session.read().clone()
    }

    /// Applies `f` to the session under the write lock.
    pub fn update<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        f(&mut self.session.write())
    }

    /// Persists a freshly issued token. The session stays unverified until
    /// the profile has been fetched.
    pub fn store_token(&self, token: SessionToken) -> Result<()> {
        self.repository.save(&token)?;
        self.update(|session| {
            session.token = Some(token);
            session.is_authenticated = false;
            session.user = None;
            session.is_loading = true;
        });
        Ok(())
    }

    /// Forgets the token, on disk and in memory, and resets the session.
    pub fn clear(&self) {
        if let Err(e) = self.repository.remove() {
            tracing::warn!("Could not remove the stored session token: {}", e);
        }
        *self.session.write() = Session::default();
        tracing::debug!("Session cleared");
    }
}

impl TokenProvider for SessionStore {
    fn token(&self) -> Option<SessionToken> {
        self.session.read().token.clone()
    }

    fn on_unauthorized(&self) {
        tracing::info!("Backend rejected the session token, signing out");
        self.clear();
    }
}

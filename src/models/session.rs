use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::models::user::{Role, User};

/// The opaque credential issued at login. Sent verbatim as the
/// `Authorization` header value. Wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// Progress of the current login attempt. Replaces the separate
/// "dialog open" flag and error string the login screen used to juggle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoginState {
    #[default]
    Idle,
    Submitting,
    Failed(String),
    Succeeded,
}

/// Coarse session phase, as seen by the route guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unauthenticated,
    Loading,
    Authenticated,
}

/// Represents the operator's session.
///
/// `is_authenticated` is only ever set together with `user` and `token`;
/// a token on its own still has to be verified.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// The persisted token, verified or not.
    pub token: Option<SessionToken>,
    /// The profile of the signed-in user, once verified.
    pub user: Option<User>,
    /// Whether the token has been verified against the backend.
    pub is_authenticated: bool,
    /// Whether a login or a verification is in progress.
    pub is_loading: bool,
    /// Progress of the last login attempt.
    pub login: LoginState,
}

impl Session {
    /// The session at start-up: a stored token still needs verifying.
    pub fn restored(token: Option<SessionToken>) -> Self {
        Self {
            is_loading: token.is_some(),
            token,
            ..Default::default()
        }
    }

    /// The human-readable reason of the last failed login, if any.
    pub fn error(&self) -> Option<&str> {
        match &self.login {
            LoginState::Failed(reason) => Some(reason.as_str()),
            _ => None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.is_loading {
            SessionPhase::Loading
        } else if self.is_authenticated && self.user.is_some() && self.token.is_some() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Unauthenticated
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|user| user.role)
    }
}

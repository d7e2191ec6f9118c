use std::sync::Arc;

use crate::api::client::ApiClient;
use crate::error::{AppError, Result};
use crate::models::session::LoginState;
use crate::models::user::User;
use crate::services::auth::{self as auth_service, LoginRequest};
use crate::session::SessionStore;
use crate::validation::auth::validate_credentials;

/// Shown when a failed login carries no usable message.
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed. Please try again.";

/// Drives the session through its lifecycle:
/// `Unauthenticated → Loading → Authenticated | Unauthenticated`.
#[derive(Clone)]
pub struct AuthController {
    api: ApiClient,
    session: Arc<SessionStore>,
}

impl AuthController {
    pub fn new(api: ApiClient, session: Arc<SessionStore>) -> Self {
        Self { api, session }
    }

    /// Signs in with the given credentials.
    ///
    /// # Arguments
    ///
    /// * `username` - The username.
    /// * `password` - The password.
    ///
    /// # Returns
    ///
    /// The signed-in `User`. On failure the session's login state carries
    /// the same message as the returned `AppError::Authentication`.
    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        if let Err(e) = validate_credentials(username, password) {
            let message = e.user_message();
            self.session
                .update(|s| s.login = LoginState::Failed(message.clone()));
            return Err(e);
        }

        tracing::info!("🔐 Login attempt for {}", username);
        self.session.update(|s| {
            s.is_loading = true;
            s.login = LoginState::Submitting;
        });

        let credentials = LoginRequest::new(username, password);
        let token = match auth_service::login(&self.api, &credentials).await {
            Ok(token) => token,
            Err(e) => return Err(self.fail(e)),
        };
        if let Err(e) = self.session.store_token(token) {
            return Err(self.fail(e));
        }

        match auth_service::current_user(&self.api).await {
            Ok(user) => {
                self.session.update(|s| {
                    s.user = Some(user.clone());
                    s.is_authenticated = true;
                    s.is_loading = false;
                    s.login = LoginState::Succeeded;
                });
                tracing::info!("✅ Signed in as {} ({})", user.username, user.role);
                Ok(user)
            }
            Err(e) => {
                tracing::warn!("❌ Profile fetch after login failed, dropping the new token");
                self.session.clear();
                Err(self.fail(e))
            }
        }
    }

    fn fail(&self, e: AppError) -> AppError {
        let message = login_failure_message(&e);
        tracing::warn!("❌ Login failed: {}", message);
        self.session.update(|s| {
            s.is_loading = false;
            s.is_authenticated = false;
            s.user = None;
            s.login = LoginState::Failed(message.clone());
        });
        AppError::Authentication(message)
    }

    /// Signs out. The backend call is best effort; the local session is
    /// cleared regardless.
    pub async fn logout(&self) {
        if let Err(e) = auth_service::logout(&self.api).await {
            tracing::warn!("Logout call failed: {}", e);
        }
        self.session.clear();
        tracing::info!("👋 Signed out");
    }

    /// Verifies the stored token against the backend.
    ///
    /// # Returns
    ///
    /// `true` when the session is authenticated afterwards. A rejected token
    /// is cleared without surfacing an error.
    pub async fn check_auth_status(&self) -> bool {
        if self.session.snapshot().token.is_none() {
            self.session.update(|s| {
                s.is_authenticated = false;
                s.user = None;
                s.is_loading = false;
            });
            return false;
        }

        self.session.update(|s| s.is_loading = true);
        match auth_service::current_user(&self.api).await {
            Ok(user) => {
                tracing::debug!("Stored token verified for {}", user.username);
                self.session.update(|s| {
                    s.user = Some(user);
                    s.is_authenticated = true;
                    s.is_loading = false;
                    if matches!(s.login, LoginState::Failed(_)) {
                        s.login = LoginState::Idle;
                    }
                });
                true
            }
            Err(e) => {
                tracing::info!("Stored token rejected: {}", e);
                self.session.clear();
                false
            }
        }
    }

    /// Verifies a token restored at start-up, if one is pending.
    pub async fn restore(&self) -> bool {
        let session = self.session.snapshot();
        if session.token.is_some() && session.is_loading {
            self.check_auth_status().await
        } else {
            session.is_authenticated
        }
    }

    /// Dismisses the last login error. Nothing else changes.
    pub fn clear_auth_error(&self) {
        self.session.update(|s| {
            if matches!(s.login, LoginState::Failed(_)) {
                s.login = LoginState::Idle;
            }
        });
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }
}

fn login_failure_message(e: &AppError) -> String {
    let message = match e {
        AppError::UnexpectedResponse(msg) => Some(msg.clone()),
        AppError::Http(_) | AppError::Io(_) => Some(e.user_message()),
        _ => e.backend_message().map(str::to_string),
    };
    message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| LOGIN_FAILED_MESSAGE.to_string())
}

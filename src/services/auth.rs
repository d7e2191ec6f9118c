use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::api::client::ApiClient;
use crate::error::{AppError, Result};
use crate::models::session::SessionToken;
use crate::models::user::User;

const LOGIN_PATH: &str = "/api/auth/login";
const LOGOUT_PATH: &str = "/api/auth/logout";
const CURRENT_USER_PATH: &str = "/api/users/me";

/// Message used when a 2xx login answer carries no token and no message.
pub const UNEXPECTED_LOGIN_RESPONSE: &str = "Login failed due to an unexpected response format.";

/// Credentials sent to `POST /api/auth/login`. Wiped from memory on drop.
#[derive(Clone, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// The login answer. Some backends send `200 {success: false, message}`
/// instead of a 401, hence everything is optional.
#[derive(Debug, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Exchanges credentials for a session token.
///
/// # Arguments
///
/// * `api` - The API client.
/// * `credentials` - The operator's username and password.
///
/// # Returns
///
/// A `Result` containing the issued `SessionToken`.
pub async fn login(api: &ApiClient, credentials: &LoginRequest) -> Result<SessionToken> {
    tracing::debug!("🔐 Logging in: {}", credentials.username);

    let response: Option<LoginResponse> = api.post(LOGIN_PATH, credentials).await?;
    let response = response.unwrap_or_default();

    match response.token.filter(|token| !token.is_empty()) {
        Some(token) => Ok(SessionToken::new(token)),
        None => {
            tracing::error!("Login answered 2xx without a token");
            Err(AppError::UnexpectedResponse(
                response
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| UNEXPECTED_LOGIN_RESPONSE.to_string()),
            ))
        }
    }
}

/// Tells the backend to invalidate the current token.
pub async fn logout(api: &ApiClient) -> Result<()> {
    api.post_empty(LOGOUT_PATH).await?;
    Ok(())
}

/// Fetches the profile of the signed-in user.
pub async fn current_user(api: &ApiClient) -> Result<User> {
    let user: Option<User> = api.get(CURRENT_USER_PATH, &[]).await?;
    user.ok_or_else(|| AppError::UnexpectedResponse("Empty profile received".to_string()))
}

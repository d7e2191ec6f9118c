use std::sync::Arc;

use crate::api::client::ApiClient;
use crate::config::Config;
use crate::controllers::auth::AuthController;
use crate::error::Result;
use crate::pages::certificates::CertificatesPage;
use crate::pages::users::UsersPage;
use crate::repositories::token::{FileTokenStore, TokenRepository};
use crate::services::certificates::CertificateService;
use crate::services::users::UserService;
use crate::session::SessionStore;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Config,
    /// The session, shared with the API client.
    pub session: Arc<SessionStore>,
    /// The backend client.
    pub api: ApiClient,
    /// Login, logout and session verification.
    pub auth: AuthController,
}

impl AppState {
    /// Creates a new `AppState`, persisting the token in the configured file.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub fn new(config: &Config) -> Result<Self> {
        let repository = Arc::new(FileTokenStore::new(config.token_file.clone()));
        tracing::debug!("Token store at {}", config.token_file.display());
        Self::with_repository(config, repository)
    }

    /// Creates a new `AppState` on top of any token repository.
    pub fn with_repository(config: &Config, repository: Arc<dyn TokenRepository>) -> Result<Self> {
        let session = Arc::new(SessionStore::open(repository));
        let api = ApiClient::new(&config.api_url, config.http_timeout, session.clone())?;
        tracing::debug!("API client ready for {}", api.base_url());
        let auth = AuthController::new(api.clone(), session.clone());

        Ok(AppState {
            config: config.clone(),
            session,
            api,
            auth,
        })
    }

    pub fn certificate_service(&self) -> CertificateService {
        CertificateService::new(self.api.clone())
    }

    pub fn user_service(&self) -> UserService {
        UserService::new(self.api.clone())
    }

    pub fn certificates_page(&self) -> CertificatesPage {
        CertificatesPage::new(self.certificate_service(), &self.config)
    }

    pub fn users_page(&self) -> UsersPage {
        UsersPage::new(self.user_service(), &self.config)
    }
}

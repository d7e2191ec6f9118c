use std::env;
use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Context, Result};

/// Quiet period before a global-search edit triggers a fetch.
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 600;
/// Quiet period before a filter-panel edit is folded into the active filters.
pub const DEFAULT_FILTER_DEBOUNCE_MS: u64 = 350;
/// Timeout applied to every backend request.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// The console's configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the certificate backend, without a trailing slash.
    pub api_url: String,
    /// File holding the persisted session token.
    pub token_file: PathBuf,
    /// Debounce delay for the global search box.
    pub search_debounce: Duration,
    /// Debounce delay for filter-panel fields.
    pub filter_debounce: Duration,
    /// Timeout for backend requests.
    pub http_timeout: Duration,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::load(None, None)
    }

    /// Creates a new `Config` from environment variables, letting command-line
    /// values take precedence for the backend URL and the token file.
    ///
    /// # Arguments
    ///
    /// * `api_url` - Backend URL given on the command line, if any.
    /// * `token_file` - Token file given on the command line, if any.
    pub fn load(api_url: Option<String>, token_file: Option<PathBuf>) -> Result<Self> {
        let api_url = match api_url {
            Some(url) => url,
            None => env::var("CERTCONSOLE_API_URL")
                .context("CERTCONSOLE_API_URL must be set (or pass --api-url)")?,
        };
        let api_url = api_url.trim().trim_end_matches('/').to_string();
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            anyhow::bail!("CERTCONSOLE_API_URL must start with http:// or https://");
        }

        let token_file = match token_file {
            Some(path) => path,
            None => env::var("CERTCONSOLE_TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_token_file()),
        };

        Ok(Self {
            api_url,
            token_file,
            search_debounce: Duration::from_millis(
                env_u64("CERTCONSOLE_SEARCH_DEBOUNCE_MS", DEFAULT_SEARCH_DEBOUNCE_MS)
                    .context("Invalid CERTCONSOLE_SEARCH_DEBOUNCE_MS")?,
            ),
            filter_debounce: Duration::from_millis(
                env_u64("CERTCONSOLE_FILTER_DEBOUNCE_MS", DEFAULT_FILTER_DEBOUNCE_MS)
                    .context("Invalid CERTCONSOLE_FILTER_DEBOUNCE_MS")?,
            ),
            http_timeout: Duration::from_secs(
                env_u64("CERTCONSOLE_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)
                    .context("Invalid CERTCONSOLE_HTTP_TIMEOUT_SECS")?,
            ),
        })
    }

    /// A configuration with the default timings, for the given backend.
    pub fn with_api_url(api_url: &str, token_file: PathBuf) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token_file,
            search_debounce: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
            filter_debounce: Duration::from_millis(DEFAULT_FILTER_DEBOUNCE_MS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

fn env_u64(key: &str, default: u64) -> std::result::Result<u64, std::num::ParseIntError> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
}

fn default_token_file() -> PathBuf {
    match env::var("HOME") {
        Ok(home) if !home.is_empty() => PathBuf::from(home)
            .join(".config")
            .join("certconsole")
            .join("session.json"),
        _ => PathBuf::from(".certconsole").join("session.json"),
    }
}

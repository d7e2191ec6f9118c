use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use http::{Method, StatusCode, header};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AppError, FieldErrors, Result, UNAUTHORIZED_MESSAGE};
use crate::models::session::SessionToken;

/// Gives the API client access to the session without a global header.
///
/// Asked for the token on every call, and told when the backend rejects it.
pub trait TokenProvider: Send + Sync {
    /// The token to attach, if any.
    fn token(&self) -> Option<SessionToken>;

    /// Called synchronously when a response comes back 401, before the
    /// caller sees the error.
    fn on_unauthorized(&self);
}

/// Acknowledgement of a mutation. Tolerates empty bodies, bare strings and
/// objects, with or without a `message`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ack {
    pub message: Option<String>,
}

impl<'de> Deserialize<'de> for Ack {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Object {
                #[serde(default)]
                message: Option<Lenient<String>>,
            },
            Other(IgnoredAny),
        }

        let message = match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Text(text)) => Some(text),
            Some(Raw::Object { message }) => message.and_then(Lenient::into_option),
            Some(Raw::Other(_)) | None => None,
        };
        Ok(Ack {
            message: message.filter(|m| !m.trim().is_empty()),
        })
    }
}

/// A value that is dropped instead of failing the whole decode when it has
/// the wrong shape.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum Lenient<T> {
    Value(T),
    Other(IgnoredAny),
}

impl<T> Lenient<T> {
    pub(crate) fn into_option(self) -> Option<T> {
        match self {
            Lenient::Value(value) => Some(value),
            Lenient::Other(_) => None,
        }
    }
}

/// The error bodies the backend sends: `{message}`, `{error}`, and on
/// validation failures a field-keyed `{errors}` map.
#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    message: Option<Lenient<String>>,
    #[serde(default)]
    error: Option<Lenient<String>>,
    #[serde(default)]
    errors: Option<Lenient<FieldErrors>>,
}

impl ErrorBody {
    fn parse(body: &[u8]) -> Self {
        sonic_rs::from_slice(body).unwrap_or_default()
    }

    fn message(&mut self) -> Option<String> {
        self.message
            .take()
            .and_then(Lenient::into_option)
            .filter(|m| !m.trim().is_empty())
    }

    fn any_message(&mut self) -> Option<String> {
        self.message().or_else(|| {
            self.error
                .take()
                .and_then(Lenient::into_option)
                .filter(|m| !m.trim().is_empty())
        })
    }

    fn field_errors(&mut self) -> Option<FieldErrors> {
        self.errors
            .take()
            .and_then(Lenient::into_option)
            .filter(|errors| !errors.is_empty())
    }
}

/// HTTP client for the certificate backend.
///
/// Attaches the raw session token as the `Authorization` header and turns
/// every non-2xx answer into an [`AppError`]. A 401 clears the session
/// through the [`TokenProvider`] before the error is returned.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
}

impl ApiClient {
    /// Creates a new `ApiClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Backend root, e.g. `https://certs.example.com`.
    /// * `timeout` - Timeout applied to every request.
    /// * `tokens` - Where the session token comes from.
    pub fn new(base_url: &str, timeout: Duration, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("certconsole/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(String, String)]) -> Result<T> {
        let body = self.execute(Method::GET, path, query, None).await?;
        decode(&body)
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, payload: &B) -> Result<T> {
        let encoded = sonic_rs::to_vec(payload)?;
        let body = self.execute(Method::POST, path, &[], Some(encoded)).await?;
        decode(&body)
    }

    /// POST without a request body.
    pub async fn post_empty(&self, path: &str) -> Result<Ack> {
        let body = self.execute(Method::POST, path, &[], None).await?;
        decode(&body)
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, payload: &B) -> Result<T> {
        let encoded = sonic_rs::to_vec(payload)?;
        let body = self.execute(Method::PUT, path, &[], Some(encoded)).await?;
        decode(&body)
    }

    pub async fn delete(&self, path: &str) -> Result<Ack> {
        let body = self.execute(Method::DELETE, path, &[], None).await?;
        decode(&body)
    }

    /// DELETE carrying a JSON body, for endpoints that want a confirmation.
    pub async fn delete_with<B: Serialize>(&self, path: &str, payload: &B) -> Result<Ack> {
        let encoded = sonic_rs::to_vec(payload)?;
        let body = self.execute(Method::DELETE, path, &[], Some(encoded)).await?;
        decode(&body)
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        payload: Option<Vec<u8>>,
    ) -> Result<Vec<u8>> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("→ {} {}", method, path);

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(header::ACCEPT, "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = self.tokens.token() {
            request = request.header(header::AUTHORIZATION, token.expose());
        }
        if let Some(payload) = payload {
            request = request
                .header(header::CONTENT_TYPE, "application/json")
                .body(payload);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        tracing::debug!("← {} {} {}", status.as_u16(), method, path);

        if status.is_success() {
            return Ok(body);
        }
        Err(self.status_error(status, &body))
    }

    fn status_error(&self, status: StatusCode, body: &[u8]) -> AppError {
        let mut parsed = ErrorBody::parse(body);
        match status {
            StatusCode::UNAUTHORIZED => {
                tracing::warn!("❌ 401 from backend, clearing the session");
                self.tokens.on_unauthorized();
                AppError::Unauthorized(
                    parsed
                        .message()
                        .unwrap_or_else(|| UNAUTHORIZED_MESSAGE.to_string()),
                )
            }
            StatusCode::FORBIDDEN => AppError::Forbidden(
                parsed
                    .any_message()
                    .unwrap_or_else(|| "You do not have access to this resource.".to_string()),
            ),
            _ => AppError::Api {
                status: status.as_u16(),
                message: parsed.any_message(),
                field_errors: parsed.field_errors(),
            },
        }
    }
}

/// Decodes a response body; an empty body reads as JSON `null`.
fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(sonic_rs::from_str("null")?);
    }
    Ok(sonic_rs::from_slice(body)?)
}

/// Builds the field-keyed map out of `(field, message)` pairs.
pub fn field_errors<I, K, V>(pairs: I) -> FieldErrors
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect::<BTreeMap<_, _>>()
}

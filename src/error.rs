use std::collections::BTreeMap;
use thiserror::Error;

/// Field name → message, the shape used both by client-side form checks and
/// by the backend's validation responses.
pub type FieldErrors = BTreeMap<String, String>;

/// Message used when a 401 carries no usable `message` of its own.
pub const UNAUTHORIZED_MESSAGE: &str =
    "Session expired, unauthorized access, or invalid credentials.";

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A transport error from the HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] sonic_rs::Error),

    /// The backend answered 401. The session has already been cleared.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The backend answered 403.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Any other non-2xx answer from the backend.
    #[error("Request failed with status {status}")]
    Api {
        status: u16,
        message: Option<String>,
        field_errors: Option<FieldErrors>,
    },

    /// A login attempt failed.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A client-side validation error, keyed by field.
    #[error("Validation error: {}", join_fields(.0))]
    Validation(FieldErrors),

    /// The backend answered 2xx with a body we cannot use.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

fn join_fields(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("{}: {}", field, message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl AppError {
    /// Builds a single-field validation error.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), message.into());
        AppError::Validation(errors)
    }

    /// The message the backend attached to this error, if any.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::Authentication(msg) => Some(msg.as_str()),
            AppError::Api { message, .. } => message.as_deref(),
            _ => None,
        }
        .filter(|msg| !msg.trim().is_empty())
    }

    /// Field-keyed errors from either the client-side checks or the backend.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            AppError::Validation(errors) => Some(errors),
            AppError::Api { field_errors, .. } => field_errors.as_ref(),
            _ => None,
        }
    }

    /// Whether this error means the session is gone.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::Unauthorized(_))
    }

    /// The text shown to the operator for this error.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Http(e) => {
                tracing::error!("HTTP error: {}", e);
                if e.is_timeout() {
                    "The server took too long to answer".to_string()
                } else {
                    "Could not reach the server".to_string()
                }
            }

            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                "File system error".to_string()
            }

            AppError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                "The server sent a response that could not be read".to_string()
            }

            AppError::Unauthorized(msg) => {
                tracing::warn!("Unauthorized: {}", msg);
                msg.clone()
            }

            AppError::Forbidden(msg) => {
                tracing::warn!("Forbidden: {}", msg);
                msg.clone()
            }

            AppError::Api { status, message, .. } => {
                tracing::debug!("API error {}: {:?}", status, message);
                message
                    .clone()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| format!("Request failed ({})", status))
            }

            AppError::Authentication(msg) => {
                tracing::warn!("Authentication failed: {}", msg);
                msg.clone()
            }

            AppError::Validation(errors) => {
                tracing::debug!("Validation error: {:?}", errors);
                format!("Please check the following fields: {}", join_fields(errors))
            }

            AppError::UnexpectedResponse(msg) => {
                tracing::error!("Unexpected response: {}", msg);
                msg.clone()
            }

            AppError::Config(msg) => {
                tracing::error!("Configuration error: {}", msg);
                msg.clone()
            }

            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal error".to_string()
            }
        }
    }
}

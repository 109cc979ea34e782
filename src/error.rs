// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::services::{AdminStatusError, ConfigurationError};

/// Client-facing messages. Upstream detail never appears in these.
pub mod messages {
    pub const NOT_AUTHENTICATED: &str = "Utente non autenticato.";
    pub const USER_ID_UNDETERMINED: &str =
        "Impossibile determinare l'ID utente. Verificare l'autenticazione.";
    pub const TENANT_ID_UNDETERMINED: &str =
        "Impossibile determinare il tenant ID dell'utente. Verificare l'autenticazione.";
    pub const ADMIN_CHECK_FAILED: &str =
        "Errore interno del server durante la verifica dello stato amministratore.";
    pub const CONFIGURATION_SAVE_FAILED: &str = "Failed to save configuration.";
    pub const METHOD_NOT_SUPPORTED: &str = "Invalid HTTP method. Only POST is supported.";
}

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({ "message": self.message() })
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }
}

// Every admin-status failure ends up as 401 or 500; upstream detail is logged only.
impl From<AdminStatusError> for ApiError {
    fn from(err: AdminStatusError) -> Self {
        match err {
            AdminStatusError::MissingPrincipal => {
                tracing::warn!("Missing x-ms-client-principal header");
                ApiError::unauthorized(messages::NOT_AUTHENTICATED)
            }
            AdminStatusError::MissingUserId => {
                tracing::error!("Admin status check failed: {}", err);
                ApiError::internal_server_error(messages::USER_ID_UNDETERMINED)
            }
            AdminStatusError::MissingTenantId => {
                tracing::error!("Admin status check failed: {}", err);
                ApiError::internal_server_error(messages::TENANT_ID_UNDETERMINED)
            }
            AdminStatusError::MalformedPrincipal(ref detail) => {
                tracing::error!("Admin status check failed: malformed principal: {}", detail);
                ApiError::internal_server_error(messages::ADMIN_CHECK_FAILED)
            }
            AdminStatusError::CredentialAcquisition(ref cause) => {
                tracing::error!("Admin status check failed: credential error: {}", cause);
                ApiError::internal_server_error(messages::ADMIN_CHECK_FAILED)
            }
            AdminStatusError::GraphQuery(ref cause) => {
                tracing::error!(
                    status = ?cause.status,
                    code = ?cause.code,
                    request_id = ?cause.request_id,
                    "Admin status check failed: {}",
                    cause.message
                );
                ApiError::internal_server_error(messages::ADMIN_CHECK_FAILED)
            }
            AdminStatusError::Unknown(ref detail) => {
                tracing::error!("Admin status check failed: {}", detail);
                ApiError::internal_server_error(messages::ADMIN_CHECK_FAILED)
            }
        }
    }
}

/// Failure on the configuration route. Same status mapping as `ApiError`,
/// but the body is keyed `error` as configuration clients expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationApiError(pub ApiError);

impl ConfigurationApiError {
    pub fn status_code(&self) -> StatusCode {
        self.0.status_code()
    }

    pub fn to_json(&self) -> Value {
        json!({ "error": self.0.message() })
    }
}

impl From<ConfigurationError> for ConfigurationApiError {
    fn from(err: ConfigurationError) -> Self {
        let api = match err {
            ConfigurationError::Store(cause) => {
                // Don't expose storage errors to clients
                tracing::error!("Error saving configuration: {}", cause);
                ApiError::internal_server_error(messages::CONFIGURATION_SAVE_FAILED)
            }
            ConfigurationError::InvalidJson(ref detail) => {
                tracing::error!("Rejected configuration request: invalid json: {}", detail);
                ApiError::bad_request(err.to_string())
            }
            other => {
                tracing::error!("Rejected configuration request: {}", other);
                ApiError::bad_request(other.to_string())
            }
        };
        ConfigurationApiError(api)
    }
}

impl IntoResponse for ConfigurationApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

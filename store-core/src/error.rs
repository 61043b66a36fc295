use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors produced by the hosted identity/record service client.
///
/// Every variant maps to a defined recovery: connectivity failures degrade
/// to the signed-out state, auth failures are surfaced to the caller,
/// missing role rows are provisioned with a default, and write failures are
/// logged without blocking resolution.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connectivity error: {0}")]
    Connectivity(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("no matching row (code {code})")]
    RowNotFound { code: String },

    #[error("write rejected: {message}")]
    Write {
        code: Option<String>,
        message: String,
    },

    #[error("store error {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },
}

impl StoreError {
    /// True when the error is the explicit not-found code, as opposed to a
    /// connectivity or permission failure.
    pub fn is_row_not_found(&self) -> bool {
        matches!(self, StoreError::RowNotFound { .. })
    }

    /// True for duplicate-key rejections on inserts.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::Write {
                code: Some(code),
                ..
            } if code == "23505"
        )
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Connectivity(err.to_string())
    }
}

/// HTTP-facing application error, mapped onto status codes for handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    #[error("Forbidden: {0}")]
    Forbidden(anyhow::Error),

    #[error("Authentication error: {0}")]
    AuthError(anyhow::Error),

    #[error("Bad Gateway: {0}")]
    BadGateway(String),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Connectivity(msg) => AppError::BadGateway(msg),
            StoreError::Auth(msg) => AppError::AuthError(anyhow::anyhow!(msg)),
            StoreError::RowNotFound { code } => {
                AppError::NotFound(anyhow::anyhow!("no matching row (code {code})"))
            }
            StoreError::Write { message, .. } => AppError::BadGateway(message),
            StoreError::Api {
                status,
                code,
                message,
            } => match status {
                401 | 403 => AppError::AuthError(anyhow::anyhow!(message)),
                404 => AppError::NotFound(anyhow::anyhow!(message)),
                _ => AppError::BadGateway(format!(
                    "store returned {status} ({}): {message}",
                    code.unwrap_or_else(|| "-".to_string())
                )),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        let (status, error_message, details) = match self {
            AppError::ValidationError(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Validation error".to_string(),
                Some(err.to_string()),
            ),
            AppError::BadRequest(err) => (StatusCode::BAD_REQUEST, err.to_string(), None),
            AppError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string(), None),
            AppError::Unauthorized(err) => (StatusCode::UNAUTHORIZED, err.to_string(), None),
            AppError::Forbidden(err) => (StatusCode::FORBIDDEN, err.to_string(), None),
            AppError::AuthError(err) => (StatusCode::UNAUTHORIZED, err.to_string(), None),
            AppError::BadGateway(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("Bad Gateway: {}", msg),
                None,
            ),
            AppError::InternalError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                Some(err.to_string()),
            ),
        };

        (
            status,
            Json(ErrorResponse {
                error: error_message,
                details,
            }),
        )
            .into_response()
    }
}

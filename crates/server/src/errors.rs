use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use service::auth::errors::AuthError;
use service::errors::ServiceError;

/// Error returned by every handler: rendered as `{"error": message}` plus
/// `details` when an upstream call failed.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), details: None }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    fn internal(detail: String) -> Self {
        error!(error = %detail, "internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Error interno del servidor")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({"error": self.message, "details": details}),
            None => json!({"error": self.message}),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        use models::errors::ModelError;
        match e {
            ServiceError::Validation(m) | ServiceError::Conflict(m) => Self::bad_request(m),
            ServiceError::Model(ModelError::Validation(m)) => Self::bad_request(m),
            ServiceError::NotFound(m) => Self::new(StatusCode::NOT_FOUND, m),
            ServiceError::Forbidden(m) => Self::new(StatusCode::FORBIDDEN, m),
            ServiceError::Upstream(details) => Self {
                status: StatusCode::BAD_GATEWAY,
                message: "Error from external API".into(),
                details: Some(details),
            },
            ServiceError::Internal(m) | ServiceError::Db(m) => Self::internal(m),
            ServiceError::Model(ModelError::Db(m)) => Self::internal(m),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Validation(m) | AuthError::Conflict(m) => Self::bad_request(m),
            AuthError::InvalidCredentials => Self::bad_request(e.to_string()),
            AuthError::NotFound(m) => Self::new(StatusCode::NOT_FOUND, m),
            AuthError::Unauthorized => Self::unauthorized(e.to_string()),
            AuthError::HashError(_) | AuthError::TokenError(_) | AuthError::Repository(_) => {
                Self::internal(format!("{} ({})", e, e.code()))
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("runtime check failed: {0}")]
    Runtime(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::Conflict("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ServiceError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ServiceError::Upstream("x".into()), StatusCode::BAD_GATEWAY),
            (ServiceError::Db("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn internal_details_are_hidden() {
        let e = ApiError::from(ServiceError::Db("relation \"users\" does not exist".into()));
        assert_eq!(e.message, "Error interno del servidor");
        assert!(e.details.is_none());
    }

    #[test]
    fn upstream_keeps_details() {
        let e = ApiError::from(ServiceError::Upstream("status 503".into()));
        assert_eq!(e.message, "Error from external API");
        assert_eq!(e.details.as_deref(), Some("status 503"));
    }

    #[test]
    fn bad_credentials_are_a_bad_request() {
        let e = ApiError::from(AuthError::InvalidCredentials);
        assert_eq!(e.status, StatusCode::BAD_REQUEST);
        assert_eq!(e.message, "Username o password incorrectos");
    }
}

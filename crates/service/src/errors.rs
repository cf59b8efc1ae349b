use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// A business rule rejected a duplicate (already reviewed, already a member...).
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("database error: {0}")]
    Db(String),
    #[error("model error: {0}")]
    Model(#[from] models::errors::ModelError),
}

impl From<sea_orm::DbErr> for ServiceError {
    fn from(e: sea_orm::DbErr) -> Self {
        ServiceError::Db(e.to_string())
    }
}

impl From<crate::auth::errors::AuthError> for ServiceError {
    fn from(e: crate::auth::errors::AuthError) -> Self {
        use crate::auth::errors::AuthError;
        match e {
            AuthError::Validation(m) => ServiceError::Validation(m),
            AuthError::Conflict(m) => ServiceError::Conflict(m),
            AuthError::NotFound(m) => ServiceError::NotFound(m),
            AuthError::InvalidCredentials | AuthError::Unauthorized => ServiceError::Validation(e.to_string()),
            AuthError::Repository(m) => ServiceError::Db(m),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_errors_convert() {
        let e: ServiceError = models::errors::ModelError::Validation("bad".into()).into();
        assert!(matches!(e, ServiceError::Model(_)));
    }

    #[test]
    fn auth_errors_keep_their_message() {
        let e: ServiceError = crate::auth::errors::AuthError::NotFound("no user".into()).into();
        assert!(matches!(e, ServiceError::NotFound(ref m) if m == "no user"));
    }
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Failures raised by the query executor and the repositories built on it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Driver-level failure: syntax, constraint violation, connectivity, deadline.
    #[error("query execution failed: {message}")]
    QueryExecution { message: String },

    /// Record materialization requested on a result with neither rows nor columns.
    #[error("cannot build records from an empty result set")]
    EmptyResult,

    #[error("failed to decode row: {0}")]
    Decode(String),

    #[error("unsupported database url scheme: {0}")]
    UnsupportedUrl(String),
}

impl StoreError {
    pub fn execution(message: impl Into<String>) -> Self {
        StoreError::QueryExecution {
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::execution(e.to_string())
    }
}

/// Outcome of a failed permission check.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Token missing, permission unknown or flag not granted. Callers cannot
    /// tell these apart.
    #[error("insufficient permissions: {permission}")]
    PermissionDenied { permission: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("insufficient permissions: {permission}")]
    PermissionDenied { permission: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<VerifyError> for AppError {
    fn from(e: VerifyError) -> Self {
        match e {
            VerifyError::PermissionDenied { permission } => AppError::PermissionDenied { permission },
            VerifyError::Store(e) => AppError::Store(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code, msg) = match &self {
            AppError::PermissionDenied { permission } => (
                StatusCode::FORBIDDEN,
                "permission_error",
                "insufficient_permissions",
                format!("insufficient permissions: {}", permission),
            ),
            AppError::Validation(reason) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_request_error",
                "validation_failed",
                reason.clone(),
            ),
            AppError::Store(e) => {
                tracing::error!("Store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": code,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_message_names_permission() {
        let err = VerifyError::PermissionDenied {
            permission: "hiscore".into(),
        };
        assert_eq!(err.to_string(), "insufficient permissions: hiscore");
    }

    #[test]
    fn test_verify_error_maps_to_forbidden() {
        let err: AppError = VerifyError::PermissionDenied {
            permission: "ban".into(),
        }
        .into();
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_store_error_maps_to_internal() {
        let err: AppError = VerifyError::Store(StoreError::execution("connection refused")).into();
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validation_maps_to_unprocessable() {
        let err = AppError::Validation("page must be >= 1".into());
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}

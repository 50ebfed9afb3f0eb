use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lawbridge_core::error::CoreError;
use lawbridge_core::file_policy::FilePolicyError;
use lawbridge_core::order::OrderAccessError;
use lawbridge_storage::s3::StorageError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain error types and adds HTTP-specific variants. Implements
/// [`IntoResponse`] to produce consistent `{"error", "code"}` JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `lawbridge_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An order visibility or lifecycle guard failure.
    #[error(transparent)]
    OrderAccess(#[from] OrderAccessError),

    /// A file upload or object-storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Order guard failures ---
            // NotFound deliberately covers "exists but not yours": callers
            // outside an order's audience cannot distinguish it from a
            // missing id.
            AppError::OrderAccess(guard) => match guard {
                OrderAccessError::NotFound => (
                    StatusCode::NOT_FOUND,
                    "ORDER_NOT_FOUND",
                    "Order not found".to_string(),
                ),
                OrderAccessError::WrongStatus => (
                    StatusCode::BAD_REQUEST,
                    "ORDER_WRONG_STATUS",
                    "Order status does not permit this action".to_string(),
                ),
            },

            // --- Upload / storage errors ---
            AppError::Storage(storage) => match storage {
                StorageError::Policy(FilePolicyError::ExtensionNotAllowed(ext)) => (
                    StatusCode::BAD_REQUEST,
                    "FILE_EXTENSION_NOT_ALLOWED",
                    format!("File extension '{ext}' is not allowed"),
                ),
                StorageError::Policy(FilePolicyError::TooLarge(size)) => (
                    StatusCode::BAD_REQUEST,
                    "FILE_TOO_LARGE",
                    format!("File of {size} bytes exceeds the upload size limit"),
                ),
                StorageError::UnknownExtension(name) => (
                    StatusCode::BAD_REQUEST,
                    "FILE_EXTENSION_NOT_ALLOWED",
                    format!("Could not determine a file extension for '{name}'"),
                ),
                StorageError::Client(msg) => {
                    tracing::error!(error = %msg, "Object storage error");
                    (
                        StatusCode::FORBIDDEN,
                        "STORAGE_ERROR",
                        "File storage rejected the upload".to_string(),
                    )
                }
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The application's error type.
///
/// Expected auth failures are the typed `Validation` / `Authentication` /
/// `Authorization` variants; everything else reaches clients only as a
/// generic 500 with the detail kept in the logs.
#[derive(Error, Debug)]
pub enum AppError {
    /// A connection-pool error.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// An authentication error.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// An authorization error.
    #[error("Authorization failed: {0}")]
    Authorization(String),

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A resource not found error.
    #[error("Resource not found")]
    NotFound,

    /// A row was missing an expected column.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Builds a JSON `{"error": ...}` response with the given status.
pub fn json_error(status: StatusCode, message: &str) -> Response {
    let body = sonic_rs::to_string(&sonic_rs::json!({
        "error": message
    }))
    .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Pool(ref e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }

            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }

            AppError::Authentication(ref msg) => {
                tracing::debug!("Authentication failed: {}", msg);
                (StatusCode::UNAUTHORIZED, msg.clone())
            }

            AppError::Authorization(ref msg) => {
                tracing::debug!("Authorization failed: {}", msg);
                (StatusCode::FORBIDDEN, msg.clone())
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::NotFound => {
                tracing::debug!("Resource not found");
                (StatusCode::NOT_FOUND, "Resource not found".to_string())
            }

            AppError::MissingData(ref column) => {
                tracing::error!("Missing data in row: {}", column);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        json_error(status, &message)
    }
}

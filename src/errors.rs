use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Failures talking to the backing key-value store. None of these are fatal:
/// the in-memory record list stays the source of truth for the session.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("failed to serialize appointments: {0}")]
    Serialize(serde_json::Error),

    #[error("stored appointments are unreadable: {0}")]
    Parse(serde_json::Error),
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(e: rusqlite::Error) -> Self {
        PersistenceError::Backend(e.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("missing or invalid fields: {}", .fields.join(", "))]
    Validation { fields: Vec<&'static str> },

    #[error("appointment {0} not found")]
    NotFound(i64),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Store(StoreError::Validation { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let mut body = serde_json::json!({ "error": self.to_string() });
        if let AppError::Store(StoreError::Validation { fields }) = &self {
            body["fields"] = serde_json::json!(fields);
        }
        (status, axum::Json(body)).into_response()
    }
}

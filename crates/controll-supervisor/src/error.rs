//! Request-path errors and their HTTP mapping.
//!
//! Every failure renders as `{"error": "<message>"}`. File-system paths
//! and credentials are logged, never returned.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use controll_core::CoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<controll_api::Error> for ApiError {
    fn from(err: controll_api::Error) -> Self {
        Self::Core(CoreError::from(err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_owned()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Core(CoreError::Validation { message }) => (StatusCode::BAD_REQUEST, message),
            ApiError::Core(CoreError::NotFound { what }) => {
                (StatusCode::NOT_FOUND, capitalize(&format!("{what} not found")))
            }
            ApiError::Core(CoreError::Persistence {
                action,
                path,
                source,
            }) => {
                error!(action, path = %path.display(), error = %source, "file-system operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to {action} file"),
                )
            }
            ApiError::Core(e @ (CoreError::Timeout { .. } | CoreError::Transport { .. })) => {
                warn!(error = %e, "upstream call failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn not_found_is_404() {
        let (status, body) = render(ApiError::Core(CoreError::NotFound {
            what: "file".into(),
        }))
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "File not found");
    }

    #[tokio::test]
    async fn persistence_error_hides_path() {
        let (status, body) = render(ApiError::Core(CoreError::Persistence {
            action: "write",
            path: PathBuf::from("/config/secret/configuration.yaml"),
            source: std::io::Error::other("disk full"),
        }))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = body["error"].as_str().unwrap();
        assert_eq!(message, "Failed to write file");
        assert!(!message.contains("/config"));
    }

    #[tokio::test]
    async fn upstream_status_is_500() {
        let (status, body) = render(ApiError::from(controll_api::Error::Status {
            status: 400,
            body: "already installed".into(),
        }))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("already installed"));
    }
}

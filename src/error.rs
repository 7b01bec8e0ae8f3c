use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::params::ParamError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    InvalidParams(#[from] ParamError),

    #[error("user {0} not found")]
    UserNotFound(String),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidParams(_) => StatusCode::BAD_REQUEST,
            AppError::UserNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(err) => {
                error!(error = ?err, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_status_codes() {
        let bad = AppError::from(ParamError::Missing("year")).into_response();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let missing = AppError::UserNotFound("2023UGCS999".to_string()).into_response();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let internal = AppError::from(anyhow::anyhow!("connection reset")).into_response();
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_message_hides_cause() {
        let err = AppError::from(anyhow::anyhow!("password authentication failed"));
        assert_eq!(err.to_string(), "internal error");
    }
}

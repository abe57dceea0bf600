//! Error types for the server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::PredictorError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl From<PredictorError> for ServerError {
    fn from(err: PredictorError) -> Self {
        if err.is_client_error() {
            // Strip the variant prefix so clients see the bare message
            match err {
                PredictorError::InvalidInput(msg) => ServerError::BadRequest(msg),
                other => ServerError::BadRequest(other.to_string()),
            }
        } else {
            ServerError::Internal(err.to_string())
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ServerError::BadRequest(msg) => {
                tracing::warn!(detail = %msg, "Rejected prediction request");
                (StatusCode::BAD_REQUEST, msg)
            }
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_bad_request() {
        let err: ServerError = PredictorError::InvalidInput("No input data provided".to_string()).into();
        assert!(matches!(err, ServerError::BadRequest(ref m) if m == "No input data provided"));

        let err: ServerError = PredictorError::UnknownCategory {
            field: "Condition".to_string(),
            value: "Ruined".to_string(),
        }
        .into();
        assert!(matches!(err, ServerError::BadRequest(ref m) if m.contains("Ruined")));
    }

    #[test]
    fn test_other_errors_map_to_internal() {
        let err: ServerError = PredictorError::ModelNotFitted.into();
        assert!(matches!(err, ServerError::Internal(_)));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

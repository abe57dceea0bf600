//! HTTP request handlers

use std::sync::Arc;
use axum::{body::Bytes, extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::PredictorError;

use super::error::{Result, ServerError};
use super::state::AppState;

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub predicted_price: f64,
}

/// Liveness probe
pub async fn index() -> Json<Value> {
    Json(json!({ "message": "Backend is running!" }))
}

/// Predict the price of one house from a JSON object of field values
pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PredictResponse>> {
    let payload = parse_payload(&body)?;
    let predicted_price = state.artifact().predict_json(&payload)?;
    debug!(predicted_price, "Prediction served");
    Ok(Json(PredictResponse { predicted_price }))
}

fn parse_payload(body: &[u8]) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(PredictorError::InvalidInput("No input data provided".to_string()).into());
    }
    serde_json::from_slice(body).map_err(|e| ServerError::BadRequest(format!("Invalid JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_is_rejected() {
        for body in [&b""[..], &b"  \n"[..]] {
            let err = parse_payload(body).unwrap_err();
            assert!(matches!(err, ServerError::BadRequest(ref m) if m == "No input data provided"));
        }
    }

    #[test]
    fn test_malformed_json_is_bad_request() {
        assert!(matches!(parse_payload(b"{Area:"), Err(ServerError::BadRequest(_))));
    }

    #[test]
    fn test_object_passes_through() {
        let value = parse_payload(br#"{"Area": 1200}"#).unwrap();
        assert_eq!(value["Area"], 1200);
    }
}

//! Integration test: HTTP prediction endpoint

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use house_price::inference::TrainedArtifact;
use house_price::server::{create_router, AppState, ServerConfig};
use house_price::training::{ParamGrid, TrainEngine, TrainingConfig};
use house_price::utils::sample_houses;
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use tower::ServiceExt;

fn artifact() -> &'static TrainedArtifact {
    static ARTIFACT: OnceLock<TrainedArtifact> = OnceLock::new();
    ARTIFACT.get_or_init(|| {
        let df = sample_houses(150, 21).unwrap();
        let config = TrainingConfig::default()
            .with_cv_folds(2)
            .with_baseline_cv(false)
            .with_param_grid(ParamGrid {
                max_depth: vec![Some(4)],
                learning_rate: vec![0.1],
                max_iter: vec![25],
            });
        TrainEngine::new(config).train_dataframe(&df).unwrap().0
    })
}

fn test_app() -> axum::Router {
    let config = ServerConfig::default().with_host("127.0.0.1").with_port(0);
    create_router(Arc::new(AppState::new(config, artifact().clone())))
}

async fn send(method: Method, uri: &str, body: Body) -> (StatusCode, Value) {
    let response = test_app()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_predict(payload: Value) -> (StatusCode, Value) {
    send(Method::POST, "/predict", Body::from(payload.to_string())).await
}

#[tokio::test]
async fn test_root_reports_running() {
    let (status, body) = send(Method::GET, "/", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Backend is running!"}));
}

#[tokio::test]
async fn test_predict_full_record() {
    let payload = json!({
        "Area": 2200,
        "Bedrooms": 4,
        "Bathrooms": 2,
        "Floors": 2,
        "YearBuilt": 2005,
        "Location": "Downtown",
        "Condition": "New",
        "Garage": "Yes"
    });
    let (status, body) = post_predict(payload.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let price = body["predicted_price"].as_f64().unwrap();
    assert!(price.is_finite());
    assert_eq!(price.to_bits(), artifact().predict_json(&payload).unwrap().to_bits());
}

#[tokio::test]
async fn test_predict_partial_record_uses_defaults() {
    let (status, body) = post_predict(json!({"Area": 1200})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["predicted_price"].as_f64().unwrap().is_finite());
}

#[tokio::test]
async fn test_predict_legacy_condition_label() {
    let (_, legacy) = post_predict(json!({"Area": 1500, "Condition": "Excellent"})).await;
    let (_, current) = post_predict(json!({"Area": 1500, "Condition": "New"})).await;
    assert_eq!(legacy["predicted_price"], current["predicted_price"]);
}

#[tokio::test]
async fn test_empty_object_is_rejected() {
    let (status, body) = post_predict(json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No input data provided"}));
}

#[tokio::test]
async fn test_empty_body_is_rejected() {
    let (status, body) = send(Method::POST, "/predict", Body::empty()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No input data provided");
}

#[tokio::test]
async fn test_non_object_is_rejected() {
    let (status, _) = post_predict(json!([1200, 3])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_condition_is_client_error() {
    let (status, body) = post_predict(json!({"Area": 1500, "Condition": "Derelict"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Derelict"));
}

#[tokio::test]
async fn test_unknown_route() {
    let (status, body) = send(Method::GET, "/models", Body::empty()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_concurrent_predictions_agree() {
    let app = test_app();
    let mut handles = Vec::new();
    for _ in 0..8 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let request = Request::builder()
                .method(Method::POST)
                .uri("/predict")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"Area": 1750, "Location": "Urban"}"#))
                .unwrap();
            let response = app.oneshot(request).await.unwrap();
            let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
            serde_json::from_slice::<Value>(&bytes).unwrap()["predicted_price"].clone()
        }));
    }

    let mut prices = Vec::new();
    for handle in handles {
        prices.push(handle.await.unwrap());
    }
    assert!(prices.windows(2).all(|p| p[0] == p[1]));
}

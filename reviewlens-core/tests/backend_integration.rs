//! Integration tests for the HTTP backend client and the dashboard driver.
//!
//! Each test starts a small axum server on an ephemeral port that mimics the
//! classification service: `/analyze`, `/validate`, `/export`, plus a few
//! misbehaving routes.

use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::path::PathBuf;

use reviewlens_core::error::{BackendError, ReviewLensError, SchemaError};
use reviewlens_core::{
    Dashboard, DashboardConfig, DatasetFile, ExportMode, HttpBackend, Review, ReviewId, Screen,
    Sentiment, SentimentBackend, ValidationStep,
};

struct Upload {
    file_name: Option<String>,
    file: Vec<u8>,
    predictions: Option<String>,
}

async fn read_upload(mut multipart: Multipart) -> Upload {
    let mut upload = Upload {
        file_name: None,
        file: Vec::new(),
        predictions: None,
    };
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                upload.file_name = field.file_name().map(str::to_string);
                upload.file = field.bytes().await.unwrap().to_vec();
            }
            Some("predictions_json") => {
                upload.predictions = Some(field.text().await.unwrap());
            }
            _ => {}
        }
    }
    upload
}

/// Labels each data line by keyword; lines without a keyword get no sentiment.
async fn analyze(multipart: Multipart) -> Json<Value> {
    let upload = read_upload(multipart).await;
    let body = String::from_utf8(upload.file).unwrap();
    let reviews: Vec<Value> = body
        .lines()
        .skip(1)
        .enumerate()
        .map(|(i, line)| {
            let (text, source) = line.rsplit_once(',').unwrap_or((line, ""));
            let mut review = json!({"id": i, "text": text, "source": source});
            if text.contains("good") {
                review["sentiment"] = json!("positive");
            } else if text.contains("bad") {
                review["sentiment"] = json!(2);
            }
            review
        })
        .collect();
    Json(json!({
        "total_reviews": reviews.len(),
        "processing_time": "0.01s",
        "source_distribution": [{"name": "yandex", "value": 100.0}],
        "top_words": {"positive": [{"word": "good", "count": 1}], "negative": []},
        "file_name": upload.file_name,
        "reviews": reviews,
    }))
}

/// Echoes the received predictions on the matrix diagonal.
async fn validate(multipart: Multipart) -> Response {
    let upload = read_upload(multipart).await;
    let Some(predictions) = upload.predictions else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": "predictions_json missing"})),
        )
            .into_response();
    };
    let predictions: Vec<Review> = serde_json::from_str(&predictions).unwrap();
    let count = |s: Sentiment| predictions.iter().filter(|r| r.sentiment == s).count();
    Json(json!({
        "f1_macro": 1.0,
        "precision": 1.0,
        "recall": 1.0,
        "accuracy": 1.0,
        "confusion_matrix": {
            "labels": ["Neg", "Neu", "Pos"],
            "matrix": [
                [count(Sentiment::Negative), 0, 0],
                [0, count(Sentiment::Neutral), 0],
                [0, 0, count(Sentiment::Positive)]
            ]
        }
    }))
    .into_response()
}

async fn export() -> &'static str {
    "text,label,src\n\"from server\",positive,yandex"
}

async fn broken() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"detail": "model not loaded"})),
    )
        .into_response()
}

async fn not_an_object() -> Json<Value> {
    Json(json!([1, 2, 3]))
}

async fn spawn_backend() -> String {
    let app = Router::new()
        .route("/api/analyze", post(analyze))
        .route("/api/validate", post(validate))
        .route("/api/export", get(export))
        .route("/api/broken", post(broken))
        .route("/api/garbage", post(not_an_object));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api")
}

fn config(base_url: &str) -> DashboardConfig {
    let mut config = DashboardConfig::default();
    config.backend.base_url = base_url.to_string();
    config.backend.timeout_secs = 10;
    config
}

fn write_dataset(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(
        &path,
        "text,source\ngood food,yandex\nbad service,google\nplain visit,yandex\n",
    )
    .unwrap();
    path
}

#[tokio::test]
async fn test_analyze_parses_and_defaults_sentiment() {
    let base = spawn_backend().await;
    let backend = HttpBackend::new(&config(&base).backend).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let file = DatasetFile::load(&write_dataset(&dir, "reviews.csv"))
        .await
        .unwrap();

    let result = backend.analyze(&file).await.unwrap();
    let sentiments: Vec<Sentiment> = result.reviews.iter().map(|r| r.sentiment).collect();
    assert_eq!(
        sentiments,
        vec![Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral]
    );
    assert_eq!(result.reviews[1].source.as_deref(), Some("google"));
    assert_eq!(result.total_reviews, Some(3));
    assert_eq!(result.top_words.positive[0].word, "good");
}

#[tokio::test]
async fn test_status_error_carries_detail() {
    let base = spawn_backend().await;
    let mut cfg = config(&base);
    cfg.backend.analyze_path = "/broken".into();
    let backend = HttpBackend::new(&cfg.backend).unwrap();
    let file = DatasetFile::new("r.csv", b"text\nx\n".to_vec()).unwrap();

    let err = backend.analyze(&file).await.unwrap_err();
    match err {
        BackendError::Status { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "model not loaded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_payload_is_schema_error() {
    let base = spawn_backend().await;
    let mut cfg = config(&base);
    cfg.backend.analyze_path = "/garbage".into();
    let backend = HttpBackend::new(&cfg.backend).unwrap();
    let file = DatasetFile::new("r.csv", b"text\nx\n".to_vec()).unwrap();

    let err = backend.analyze(&file).await.unwrap_err();
    assert!(matches!(
        err,
        BackendError::Schema(SchemaError::WrongType { .. })
    ));
}

#[tokio::test]
async fn test_unknown_route_is_status_error() {
    let base = spawn_backend().await;
    let mut cfg = config(&base);
    cfg.backend.analyze_path = "/missing".into();
    let backend = HttpBackend::new(&cfg.backend).unwrap();
    let file = DatasetFile::new("r.csv", Vec::new()).unwrap();

    let err = backend.analyze(&file).await.unwrap_err();
    assert!(matches!(err, BackendError::Status { status: 404, .. }));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = HttpBackend::new(&config(&format!("http://{addr}")).backend).unwrap();
    let file = DatasetFile::new("r.csv", Vec::new()).unwrap();
    let err = backend.analyze(&file).await.unwrap_err();
    assert!(matches!(err, BackendError::Transport { .. }));
}

#[tokio::test]
async fn test_remote_export_returns_body() {
    let base = spawn_backend().await;
    let backend = HttpBackend::new(&config(&base).backend).unwrap();
    let csv = backend.export().await.unwrap();
    assert!(csv.contains("from server"));
}

#[tokio::test]
async fn test_dashboard_end_to_end() {
    let base = spawn_backend().await;
    let cfg = config(&base);
    let backend = HttpBackend::new(&cfg.backend).unwrap();
    let mut dash = Dashboard::new(backend, &cfg);
    let dir = tempfile::tempdir().unwrap();

    dash.upload(&write_dataset(&dir, "reviews.csv")).await.unwrap();
    assert_eq!(dash.state().screen(), Screen::Results);
    assert_eq!(dash.state().sentiment_counts().total(), 3);

    dash.state_mut().open_table().unwrap();
    dash.state_mut().table_mut().toggle_source("yandex");
    assert_eq!(dash.state().filtered_reviews().len(), 2);

    dash.correct(&ReviewId::Int(2), Sentiment::Positive).unwrap();
    assert_eq!(dash.state().sentiment_counts().positive, 2);
    dash.state_mut().back_to_results().unwrap();

    dash.validate(&write_dataset(&dir, "golden.csv")).await.unwrap();
    assert_eq!(dash.state().validation_step(), ValidationStep::Results);
    let scores = dash.state().validation().unwrap();
    assert_eq!(scores.confusion_matrix.get("Pos", "Pos"), Some(2));
    assert_eq!(scores.confusion_matrix.total(), 3);

    let csv = dash.export().await.unwrap();
    assert!(csv.contains("\nplain visit,positive,yandex\n"));
}

#[tokio::test]
async fn test_validation_without_predictions_reports_detail() {
    let base = spawn_backend().await;
    let mut cfg = config(&base);
    cfg.backend.send_predictions = false;
    cfg.backend.export_mode = ExportMode::Remote;
    let backend = HttpBackend::new(&cfg.backend).unwrap();
    let mut dash = Dashboard::new(backend, &cfg);
    let dir = tempfile::tempdir().unwrap();

    dash.upload(&write_dataset(&dir, "reviews.csv")).await.unwrap();
    let err = dash
        .validate(&write_dataset(&dir, "golden.csv"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ReviewLensError::Backend(BackendError::Status { status: 422, .. })
    ));
    assert_eq!(dash.state().validation_step(), ValidationStep::Upload);
    assert_eq!(
        dash.state().validation_error(),
        Some("Backend returned 422: predictions_json missing")
    );

    let csv = dash.export().await.unwrap();
    assert!(csv.contains("from server"));
}

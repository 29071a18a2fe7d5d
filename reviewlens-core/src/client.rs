//! Classification backend trait and implementations.
//!
//! The backend owns classification and metric computation. The dashboard
//! uploads files, receives JSON, and validates it on receipt. Requests are
//! issued one at a time and are never retried.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::model::{AnalysisResult, Review, ValidationResult};

/// Multipart field carrying the dataset file.
pub const FILE_FIELD: &str = "file";
/// Multipart field carrying the serialized predictions on validation.
pub const PREDICTIONS_FIELD: &str = "predictions_json";

/// A dataset file ready to upload.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetFile {
    file_name: String,
    bytes: Vec<u8>,
}

impl DatasetFile {
    /// Wrap in-memory content, checking the extension is one the backend reads.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, BackendError> {
        let file_name = file_name.into();
        if mime_for(&file_name).is_none() {
            return Err(BackendError::UnsupportedFile {
                path: PathBuf::from(file_name),
            });
        }
        Ok(Self { file_name, bytes })
    }

    /// Read a dataset from disk. The extension is checked before reading.
    pub async fn load(path: &Path) -> Result<Self, BackendError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if mime_for(&file_name).is_none() {
            return Err(BackendError::UnsupportedFile {
                path: path.to_path_buf(),
            });
        }
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| BackendError::ReadFile {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(Self { file_name, bytes })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &'static str {
        mime_for(&self.file_name).unwrap_or("application/octet-stream")
    }
}

/// MIME type for a supported dataset extension.
fn mime_for(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "csv" => Some("text/csv"),
        "xls" => Some("application/vnd.ms-excel"),
        "xlsx" => Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        _ => None,
    }
}

/// Trait for sentiment classification backends.
#[async_trait]
pub trait SentimentBackend: Send + Sync {
    /// Classify every row of a dataset.
    async fn analyze(&self, dataset: &DatasetFile) -> Result<AnalysisResult, BackendError>;

    /// Score the current predictions against a human-labelled golden dataset.
    async fn validate(
        &self,
        golden: &DatasetFile,
        predictions: &[Review],
    ) -> Result<ValidationResult, BackendError>;

    /// Download the server-side CSV export.
    async fn export(&self) -> Result<String, BackendError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// HTTP backend speaking the analyze/validate/export contract.
pub struct HttpBackend {
    client: Client,
    config: BackendConfig,
}

impl HttpBackend {
    /// Create a new backend from configuration.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Request {
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn file_part(dataset: &DatasetFile) -> Result<reqwest::multipart::Part, BackendError> {
        reqwest::multipart::Part::bytes(dataset.bytes().to_vec())
            .file_name(dataset.file_name().to_string())
            .mime_str(dataset.mime_type())
            .map_err(|e| BackendError::Request {
                message: format!("MIME error: {e}"),
            })
    }

    async fn send(
        &self,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<String, BackendError> {
        let response = request.send().await.map_err(|e| BackendError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| BackendError::Transport {
            url: url.to_string(),
            message: format!("failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            let message = error_detail(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            warn!(url, status = status.as_u16(), %message, "Backend request failed");
            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl SentimentBackend for HttpBackend {
    async fn analyze(&self, dataset: &DatasetFile) -> Result<AnalysisResult, BackendError> {
        let url = self.config.endpoint(&self.config.analyze_path);
        debug!(
            url = %url,
            file = dataset.file_name(),
            bytes = dataset.bytes().len(),
            "Uploading dataset for analysis"
        );
        let started = Instant::now();

        let form = reqwest::multipart::Form::new().part(FILE_FIELD, Self::file_part(dataset)?);
        let body = self.send(&url, self.client.post(&url).multipart(form)).await?;
        let result = AnalysisResult::from_json(&body)?;

        info!(
            reviews = result.reviews.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis received"
        );
        Ok(result)
    }

    async fn validate(
        &self,
        golden: &DatasetFile,
        predictions: &[Review],
    ) -> Result<ValidationResult, BackendError> {
        let url = self.config.endpoint(&self.config.validate_path);
        debug!(
            url = %url,
            file = golden.file_name(),
            predictions = predictions.len(),
            send_predictions = self.config.send_predictions,
            "Uploading golden dataset"
        );

        let mut form = reqwest::multipart::Form::new().part(FILE_FIELD, Self::file_part(golden)?);
        if self.config.send_predictions {
            let predictions_json =
                serde_json::to_string(predictions).map_err(|e| BackendError::Request {
                    message: format!("failed to serialize predictions: {e}"),
                })?;
            form = form.text(PREDICTIONS_FIELD, predictions_json);
        }

        let body = self.send(&url, self.client.post(&url).multipart(form)).await?;
        let result = ValidationResult::from_json(&body)?;
        info!(f1_macro = result.f1_macro, "Validation received");
        Ok(result)
    }

    async fn export(&self) -> Result<String, BackendError> {
        let url = self.config.endpoint(&self.config.export_path);
        debug!(url = %url, "Downloading server-side export");
        self.send(&url, self.client.get(&url)).await
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Extract a human-readable message from an error response body.
///
/// Prefers the `detail` field of a JSON body; falls back to the trimmed text.
fn error_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(json) = serde_json::from_str::<Value>(trimmed) {
        match json.get("detail") {
            Some(Value::String(s)) => return Some(s.clone()),
            Some(other) if !other.is_null() => return Some(other.to_string()),
            _ => {}
        }
    }
    Some(trimmed.chars().take(200).collect())
}

/// A mock backend for testing.
pub struct MockBackend {
    analyze_responses: Mutex<VecDeque<Result<AnalysisResult, BackendError>>>,
    validate_responses: Mutex<VecDeque<Result<ValidationResult, BackendError>>>,
    export_responses: Mutex<VecDeque<Result<String, BackendError>>>,
    last_predictions: Mutex<Option<Vec<Review>>>,
    call_count: AtomicUsize,
}

impl MockBackend {
    /// Create a new mock that fails every call (no responses queued).
    pub fn new() -> Self {
        Self {
            analyze_responses: Mutex::new(VecDeque::new()),
            validate_responses: Mutex::new(VecDeque::new()),
            export_responses: Mutex::new(VecDeque::new()),
            last_predictions: Mutex::new(None),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn with_analysis(self, response: Result<AnalysisResult, BackendError>) -> Self {
        lock(&self.analyze_responses).push_back(response);
        self
    }

    pub fn with_validation(self, response: Result<ValidationResult, BackendError>) -> Self {
        lock(&self.validate_responses).push_back(response);
        self
    }

    pub fn with_export(self, response: Result<String, BackendError>) -> Self {
        lock(&self.export_responses).push_back(response);
        self
    }

    /// Number of backend calls made so far.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Predictions received by the most recent `validate` call.
    pub fn last_predictions(&self) -> Option<Vec<Review>> {
        lock(&self.last_predictions).clone()
    }

    fn next<T>(&self, queue: &Mutex<VecDeque<Result<T, BackendError>>>) -> Result<T, BackendError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        lock(queue).pop_front().unwrap_or_else(|| {
            Err(BackendError::Transport {
                url: "mock".into(),
                message: "no mock responses queued".into(),
            })
        })
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl SentimentBackend for MockBackend {
    async fn analyze(&self, _dataset: &DatasetFile) -> Result<AnalysisResult, BackendError> {
        self.next(&self.analyze_responses)
    }

    async fn validate(
        &self,
        _golden: &DatasetFile,
        predictions: &[Review],
    ) -> Result<ValidationResult, BackendError> {
        *lock(&self.last_predictions) = Some(predictions.to_vec());
        self.next(&self.validate_responses)
    }

    async fn export(&self) -> Result<String, BackendError> {
        self.next(&self.export_responses)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

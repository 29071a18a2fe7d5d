//! Error types for the ReviewLens core.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering backend payload schemas, backend transport, dashboard state,
//! configuration, review editing, and CSV export.

use std::path::PathBuf;

use crate::model::ReviewId;

/// Top-level error type for the ReviewLens core library.
#[derive(Debug, thiserror::Error)]
pub enum ReviewLensError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Edit error: {0}")]
    Edit(#[from] EditError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

/// A backend payload that does not have the shape the dashboard relies on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("response is not valid JSON: {message}")]
    InvalidJson { message: String },

    #[error("expected {expected} at `{path}`")]
    WrongType { path: String, expected: &'static str },

    #[error("missing required field `{path}`")]
    MissingField { path: String },

    #[error("duplicate review id {id} at `{path}`")]
    DuplicateId { path: String, id: String },

    #[error("value {value} at `{path}` is outside {range}")]
    OutOfRange {
        path: String,
        value: f64,
        range: &'static str,
    },

    #[error("confusion matrix must be {side}x{side}, row {row} has {len} entries")]
    NonSquareMatrix { side: usize, row: usize, len: usize },

    #[error("confusion matrix has {rows} rows for {side} labels")]
    MatrixRowCount { rows: usize, side: usize },
}

/// Errors from talking to the classification backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Malformed backend response: {0}")]
    Schema(#[from] SchemaError),

    #[error("Unsupported dataset file {path}: expected .csv, .xls or .xlsx")]
    UnsupportedFile { path: PathBuf },

    #[error("Failed to read dataset {path}: {message}")]
    ReadFile { path: PathBuf, message: String },

    #[error("Failed to build request: {message}")]
    Request { message: String },
}

/// Errors from the dashboard screen state machine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateError {
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("No analysis result loaded")]
    NoResult,
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// Errors from manual sentiment correction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error("No review with id {id}")]
    ReviewNotFound { id: ReviewId },
}

/// Errors from writing the CSV export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV buffer could not be finalized: {message}")]
    Flush { message: String },

    #[error("CSV output is not valid UTF-8: {message}")]
    Encoding { message: String },
}

/// A type alias for results using the top-level `ReviewLensError`.
pub type Result<T> = std::result::Result<T, ReviewLensError>;

//! # ReviewLens Core
//!
//! Core library for the ReviewLens review-sentiment dashboard.
//! Provides the review model and payload validation, chart aggregation,
//! search/facet filtering with pagination, sentiment correction, CSV export,
//! the classification backend client, the screen state machine, and
//! configuration.

pub mod aggregate;
pub mod client;
pub mod config;
pub mod edit;
pub mod error;
pub mod export;
pub mod filter;
pub mod model;
pub mod session;
pub mod state;

// Re-export commonly used types at the crate root.
pub use aggregate::{ChartEntry, SentimentCounts, aggregate_sentiment, map_source_distribution};
pub use client::{DatasetFile, HttpBackend, MockBackend, SentimentBackend};
pub use config::{BackendConfig, DashboardConfig, TableConfig, load_config};
pub use edit::{resolve_review_id, update_review_sentiment};
pub use error::{Result, ReviewLensError};
pub use export::{ExportMode, export_csv};
pub use filter::{Pagination, ReviewFilter, filter_reviews};
pub use model::{
    AnalysisResult, ConfusionMatrix, Review, ReviewId, Sentiment, SourceShare, TopWords,
    ValidationResult, WordCount,
};
pub use session::Dashboard;
pub use state::{AppState, Screen, TableView, ValidationStep};

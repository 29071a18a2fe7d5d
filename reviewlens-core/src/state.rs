//! Dashboard screen state machine.
//!
//! The dashboard moves through a small set of screens. Every transition is an
//! explicit method that checks the current screen and returns
//! [`StateError::InvalidTransition`] when the move is not allowed. Chart data
//! and table rows are derived from the held result on every call.

use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

use crate::aggregate::{
    self, ChartEntry, SentimentCounts, TOP_WORDS_DISPLAYED, aggregate_sentiment,
};
use crate::edit::update_review_sentiment;
use crate::error::{Result, StateError};
use crate::filter::{self, DEFAULT_PAGE_SIZE, Pagination, ReviewFilter};
use crate::model::{AnalysisResult, Review, ReviewId, Sentiment, ValidationResult, WordCount};

/// Top-level screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    /// Waiting for a dataset.
    Upload,
    /// Dataset sent, waiting for the classifier.
    Loading,
    /// Charts and summary.
    Results,
    /// Searchable, editable review table.
    Table,
    /// Golden-dataset validation.
    Validation,
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Screen::Upload => "upload",
            Screen::Loading => "loading",
            Screen::Results => "results",
            Screen::Table => "table",
            Screen::Validation => "validation",
        })
    }
}

/// Steps inside the validation screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStep {
    Upload,
    Analyzing,
    Results,
}

impl fmt::Display for ValidationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValidationStep::Upload => "upload",
            ValidationStep::Analyzing => "analyzing",
            ValidationStep::Results => "results",
        })
    }
}

/// Filter and pagination state of the review table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub filter: ReviewFilter,
    pub pagination: Pagination,
}

impl TableView {
    pub fn new(page_size: usize) -> Self {
        Self {
            filter: ReviewFilter::default(),
            pagination: Pagination::new(page_size),
        }
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.filter.set_query(query);
    }

    pub fn toggle_sentiment(&mut self, sentiment: Sentiment) {
        self.filter.toggle_sentiment(sentiment);
    }

    pub fn toggle_source(&mut self, source: &str) {
        self.filter.toggle_source(source);
    }

    pub fn load_more(&mut self) {
        self.pagination.load_more();
    }
}

impl Default for TableView {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

/// In-session dashboard state. Has exactly one writer: the event handler.
#[derive(Debug, Clone)]
pub struct AppState {
    screen: Screen,
    result: Option<AnalysisResult>,
    table: TableView,
    validation_step: ValidationStep,
    validation: Option<ValidationResult>,
    upload_error: Option<String>,
    validation_error: Option<String>,
    page_size: usize,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl AppState {
    pub fn new(page_size: usize) -> Self {
        Self {
            screen: Screen::Upload,
            result: None,
            table: TableView::new(page_size),
            validation_step: ValidationStep::Upload,
            validation: None,
            upload_error: None,
            validation_error: None,
            page_size,
        }
    }

    /// Resume a previously saved analysis on the results screen.
    pub fn restored(result: AnalysisResult, page_size: usize) -> Self {
        let mut state = Self::new(page_size);
        state.install_result(result);
        state.screen = Screen::Results;
        state
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    /// Take the result out, e.g. to persist it.
    pub fn into_result(self) -> Option<AnalysisResult> {
        self.result
    }

    pub fn reviews(&self) -> &[Review] {
        self.result.as_ref().map(|r| r.reviews.as_slice()).unwrap_or(&[])
    }

    pub fn table(&self) -> &TableView {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut TableView {
        &mut self.table
    }

    pub fn validation_step(&self) -> ValidationStep {
        self.validation_step
    }

    pub fn validation(&self) -> Option<&ValidationResult> {
        self.validation.as_ref()
    }

    pub fn upload_error(&self) -> Option<&str> {
        self.upload_error.as_deref()
    }

    pub fn validation_error(&self) -> Option<&str> {
        self.validation_error.as_deref()
    }

    fn invalid(&self, to: &str) -> StateError {
        let from = if self.screen == Screen::Validation {
            format!("{}/{}", self.screen, self.validation_step)
        } else {
            self.screen.to_string()
        };
        StateError::InvalidTransition {
            from,
            to: to.to_string(),
        }
    }

    fn expect_screen(&self, allowed: &[Screen], to: &str) -> std::result::Result<(), StateError> {
        if allowed.contains(&self.screen) {
            Ok(())
        } else {
            Err(self.invalid(to))
        }
    }

    fn move_to(&mut self, screen: Screen) {
        info!(from = %self.screen, to = %screen, "Screen transition");
        self.screen = screen;
    }

    fn install_result(&mut self, result: AnalysisResult) {
        let counts = aggregate_sentiment(&result.reviews);
        if let Some(reported) = result.reported_distribution {
            if reported != counts {
                warn!(
                    ?reported,
                    computed = ?counts,
                    "Backend sentiment distribution disagrees with review labels"
                );
            }
        }
        if let Some(total) = result.total_reviews {
            if total != result.reviews.len() {
                warn!(
                    reported = total,
                    received = result.reviews.len(),
                    "Backend review total disagrees with received reviews"
                );
            }
        }
        self.result = Some(result);
        self.table = TableView::new(self.page_size);
        self.validation = None;
        self.validation_step = ValidationStep::Upload;
        self.validation_error = None;
    }

    /// Upload -> Loading.
    pub fn begin_upload(&mut self) -> std::result::Result<(), StateError> {
        self.expect_screen(&[Screen::Upload], "loading")?;
        self.upload_error = None;
        self.move_to(Screen::Loading);
        Ok(())
    }

    /// Loading -> Results, replacing any previous result wholesale.
    pub fn upload_succeeded(
        &mut self,
        result: AnalysisResult,
    ) -> std::result::Result<(), StateError> {
        self.expect_screen(&[Screen::Loading], "results")?;
        info!(reviews = result.reviews.len(), "Analysis loaded");
        self.install_result(result);
        self.move_to(Screen::Results);
        Ok(())
    }

    /// Loading -> Upload with an error message.
    pub fn upload_failed(&mut self, message: impl Into<String>) -> std::result::Result<(), StateError> {
        self.expect_screen(&[Screen::Loading], "upload")?;
        let message = message.into();
        warn!(%message, "Upload failed");
        self.upload_error = Some(message);
        self.move_to(Screen::Upload);
        Ok(())
    }

    /// Results -> Table.
    pub fn open_table(&mut self) -> std::result::Result<(), StateError> {
        self.expect_screen(&[Screen::Results], "table")?;
        self.move_to(Screen::Table);
        Ok(())
    }

    /// Table or Validation -> Results.
    pub fn back_to_results(&mut self) -> std::result::Result<(), StateError> {
        self.expect_screen(&[Screen::Table, Screen::Validation], "results")?;
        if self.screen == Screen::Validation && self.validation_step == ValidationStep::Analyzing {
            return Err(self.invalid("results"));
        }
        self.move_to(Screen::Results);
        Ok(())
    }

    /// Results -> Validation, starting at the upload step.
    pub fn open_validation(&mut self) -> std::result::Result<(), StateError> {
        self.expect_screen(&[Screen::Results], "validation")?;
        self.validation_step = ValidationStep::Upload;
        self.validation = None;
        self.validation_error = None;
        self.move_to(Screen::Validation);
        Ok(())
    }

    /// Validation upload (or a finished run) -> analyzing.
    pub fn begin_validation(&mut self) -> std::result::Result<(), StateError> {
        if self.screen != Screen::Validation || self.validation_step == ValidationStep::Analyzing {
            return Err(self.invalid("validation/analyzing"));
        }
        self.validation_error = None;
        self.validation_step = ValidationStep::Analyzing;
        info!("Validation started");
        Ok(())
    }

    pub fn validation_succeeded(
        &mut self,
        result: ValidationResult,
    ) -> std::result::Result<(), StateError> {
        if self.screen != Screen::Validation || self.validation_step != ValidationStep::Analyzing {
            return Err(self.invalid("validation/results"));
        }
        info!(f1_macro = result.f1_macro, accuracy = result.accuracy, "Validation finished");
        self.validation = Some(result);
        self.validation_step = ValidationStep::Results;
        Ok(())
    }

    /// Analyzing -> validation upload step with an error message.
    pub fn validation_failed(
        &mut self,
        message: impl Into<String>,
    ) -> std::result::Result<(), StateError> {
        if self.screen != Screen::Validation || self.validation_step != ValidationStep::Analyzing {
            return Err(self.invalid("validation/upload"));
        }
        let message = message.into();
        warn!(%message, "Validation failed");
        self.validation_error = Some(message);
        self.validation_step = ValidationStep::Upload;
        Ok(())
    }

    /// Leave the current analysis and return to the upload screen.
    pub fn back_to_upload(&mut self) -> std::result::Result<(), StateError> {
        self.expect_screen(&[Screen::Results, Screen::Table, Screen::Validation], "upload")?;
        if self.screen == Screen::Validation && self.validation_step == ValidationStep::Analyzing {
            return Err(self.invalid("upload"));
        }
        self.result = None;
        self.table = TableView::new(self.page_size);
        self.validation = None;
        self.validation_step = ValidationStep::Upload;
        self.validation_error = None;
        self.upload_error = None;
        self.move_to(Screen::Upload);
        Ok(())
    }

    /// Relabel one review. The pagination cursor is kept.
    pub fn update_review_sentiment(&mut self, id: &ReviewId, sentiment: Sentiment) -> Result<()> {
        let result = self.result.as_mut().ok_or(StateError::NoResult)?;
        result.reviews = update_review_sentiment(&result.reviews, id, sentiment)?;
        info!(%id, %sentiment, "Review sentiment corrected");
        Ok(())
    }

    pub fn sentiment_counts(&self) -> SentimentCounts {
        aggregate_sentiment(self.reviews())
    }

    pub fn sentiment_chart(&self) -> Vec<ChartEntry> {
        aggregate::sentiment_chart(&self.sentiment_counts())
    }

    pub fn source_chart(&self) -> Vec<ChartEntry> {
        self.result
            .as_ref()
            .map(|r| aggregate::map_source_distribution(&r.source_distribution))
            .unwrap_or_default()
    }

    pub fn top_words(&self, sentiment: Sentiment) -> &[WordCount] {
        match &self.result {
            Some(r) => aggregate::top_words_for(&r.top_words, sentiment, TOP_WORDS_DISPLAYED),
            None => &[],
        }
    }

    pub fn unique_sources(&self) -> Vec<String> {
        filter::unique_sources(self.reviews())
    }

    pub fn filtered_reviews(&self) -> Vec<&Review> {
        filter::filter_reviews(self.reviews(), &self.table.filter)
    }

    /// The filtered rows currently revealed by the pagination cursor.
    pub fn visible_reviews(&self) -> Vec<&Review> {
        let filtered = self.filtered_reviews();
        self.table.pagination.window(&filtered).to_vec()
    }

    /// Filtered rows still hidden behind "load more".
    pub fn remaining_rows(&self) -> usize {
        self.table
            .pagination
            .remaining(self.filtered_reviews().len())
    }
}

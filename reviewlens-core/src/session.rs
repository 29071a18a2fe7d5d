//! Dashboard driver: the event handler that owns the state and the backend.
//!
//! Requests take `&mut self`, so at most one is in flight. A failed request
//! leaves the dashboard on the step the user can retry from and is also
//! returned to the caller.

use std::path::Path;
use tracing::debug;

use crate::client::{DatasetFile, SentimentBackend};
use crate::config::DashboardConfig;
use crate::error::{Result, StateError};
use crate::export::{ExportMode, export_csv};
use crate::model::{AnalysisResult, ReviewId, Sentiment};
use crate::state::{AppState, Screen};

pub struct Dashboard<B: SentimentBackend> {
    backend: B,
    state: AppState,
    export_mode: ExportMode,
    page_size: usize,
}

impl<B: SentimentBackend> Dashboard<B> {
    pub fn new(backend: B, config: &DashboardConfig) -> Self {
        Self {
            backend,
            state: AppState::new(config.table.page_size),
            export_mode: config.backend.export_mode,
            page_size: config.table.page_size,
        }
    }

    /// Resume a saved analysis on the results screen.
    pub fn with_result(backend: B, config: &DashboardConfig, result: AnalysisResult) -> Self {
        let mut dashboard = Self::new(backend, config);
        dashboard.state = AppState::restored(result, dashboard.page_size);
        dashboard
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Upload a dataset and load the classified result.
    ///
    /// From the results, table or validation screens the current analysis is
    /// discarded first, as with "upload a new file".
    pub async fn upload(&mut self, path: &Path) -> Result<()> {
        if matches!(
            self.state.screen(),
            Screen::Results | Screen::Table | Screen::Validation
        ) {
            self.state.back_to_upload()?;
        }
        self.state.begin_upload()?;
        debug!(backend = self.backend.name(), path = %path.display(), "Analyze requested");

        let outcome = match DatasetFile::load(path).await {
            Ok(file) => self.backend.analyze(&file).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(result) => {
                self.state.upload_succeeded(result)?;
                Ok(())
            }
            Err(e) => {
                self.state.upload_failed(e.to_string())?;
                Err(e.into())
            }
        }
    }

    /// Score the current predictions against a golden dataset.
    ///
    /// Opens the validation screen when called from the results or table
    /// screen.
    pub async fn validate(&mut self, path: &Path) -> Result<()> {
        if self.state.result().is_none() {
            return Err(StateError::NoResult.into());
        }
        if self.state.screen() == Screen::Table {
            self.state.back_to_results()?;
        }
        if self.state.screen() == Screen::Results {
            self.state.open_validation()?;
        }
        self.state.begin_validation()?;
        debug!(backend = self.backend.name(), path = %path.display(), "Validation requested");

        let outcome = match DatasetFile::load(path).await {
            Ok(file) => self.backend.validate(&file, self.state.reviews()).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(result) => {
                self.state.validation_succeeded(result)?;
                Ok(())
            }
            Err(e) => {
                self.state.validation_failed(e.to_string())?;
                Err(e.into())
            }
        }
    }

    /// Relabel one review; charts reflect it on the next read.
    pub fn correct(&mut self, id: &ReviewId, sentiment: Sentiment) -> Result<()> {
        self.state.update_review_sentiment(id, sentiment)
    }

    /// Produce the CSV export according to the configured mode.
    pub async fn export(&self) -> Result<String> {
        match self.export_mode {
            ExportMode::Local => {
                let result = self.state.result().ok_or(StateError::NoResult)?;
                Ok(export_csv(&result.reviews)?)
            }
            ExportMode::Remote => Ok(self.backend.export().await?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockBackend;
    use crate::error::{BackendError, ReviewLensError};
    use crate::model::{ConfusionMatrix, Review, ValidationResult};
    use crate::state::ValidationStep;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn dataset(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, "text,source\nok,yandex\n").unwrap();
        path
    }

    fn analysis() -> AnalysisResult {
        AnalysisResult {
            reviews: vec![
                Review::new(0, "good", Sentiment::Positive, Some("yandex")),
                Review::new(1, "bad", Sentiment::Negative, None),
            ],
            ..Default::default()
        }
    }

    fn scores() -> ValidationResult {
        ValidationResult {
            f1_macro: 0.5,
            precision: 0.5,
            recall: 0.5,
            accuracy: 0.5,
            confusion_matrix: ConfusionMatrix::new(vec![], vec![]).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_upload_success() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockBackend::new().with_analysis(Ok(analysis()));
        let mut dash = Dashboard::new(mock, &DashboardConfig::default());

        dash.upload(&dataset(&dir, "r.csv")).await.unwrap();
        assert_eq!(dash.state().screen(), Screen::Results);
        assert_eq!(dash.state().reviews().len(), 2);
    }

    #[tokio::test]
    async fn test_upload_failure_returns_to_upload() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockBackend::new().with_analysis(Err(BackendError::Status {
            status: 400,
            message: "cannot read file".into(),
        }));
        let mut dash = Dashboard::new(mock, &DashboardConfig::default());

        let err = dash.upload(&dataset(&dir, "r.csv")).await.unwrap_err();
        assert!(matches!(err, ReviewLensError::Backend(BackendError::Status { .. })));
        assert_eq!(dash.state().screen(), Screen::Upload);
        assert_eq!(
            dash.state().upload_error(),
            Some("Backend returned 400: cannot read file")
        );
    }

    #[tokio::test]
    async fn test_unsupported_file_never_reaches_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut dash = Dashboard::new(MockBackend::new(), &DashboardConfig::default());
        let err = dash.upload(&dataset(&dir, "r.pdf")).await.unwrap_err();
        assert!(matches!(
            err,
            ReviewLensError::Backend(BackendError::UnsupportedFile { .. })
        ));
        assert_eq!(dash.backend().call_count(), 0);
        assert_eq!(dash.state().screen(), Screen::Upload);
    }

    #[tokio::test]
    async fn test_new_upload_replaces_result() {
        let dir = tempfile::tempdir().unwrap();
        let second = AnalysisResult {
            reviews: vec![Review::new(9, "only", Sentiment::Neutral, None)],
            ..Default::default()
        };
        let mock = MockBackend::new()
            .with_analysis(Ok(analysis()))
            .with_analysis(Ok(second));
        let mut dash = Dashboard::new(mock, &DashboardConfig::default());
        dash.upload(&dataset(&dir, "a.csv")).await.unwrap();
        dash.state_mut().open_table().unwrap();
        dash.upload(&dataset(&dir, "b.csv")).await.unwrap();
        assert_eq!(dash.state().reviews().len(), 1);
        assert_eq!(dash.state().screen(), Screen::Results);
    }

    #[tokio::test]
    async fn test_validate_sends_corrected_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockBackend::new().with_validation(Ok(scores()));
        let mut dash = Dashboard::with_result(mock, &DashboardConfig::default(), analysis());

        dash.correct(&ReviewId::Int(1), Sentiment::Neutral).unwrap();
        dash.validate(&dataset(&dir, "golden.xlsx")).await.unwrap();

        assert_eq!(dash.state().screen(), Screen::Validation);
        assert_eq!(dash.state().validation_step(), ValidationStep::Results);
        let sent = dash.backend().last_predictions().unwrap();
        assert_eq!(sent[1].sentiment, Sentiment::Neutral);
    }

    #[tokio::test]
    async fn test_validate_failure_stays_on_validation_upload() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockBackend::new();
        let mut dash = Dashboard::with_result(mock, &DashboardConfig::default(), analysis());

        assert!(dash.validate(&dataset(&dir, "golden.csv")).await.is_err());
        assert_eq!(dash.state().screen(), Screen::Validation);
        assert_eq!(dash.state().validation_step(), ValidationStep::Upload);
        assert!(dash.state().validation_error().is_some());
        assert_eq!(dash.state().reviews().len(), 2);
    }

    #[tokio::test]
    async fn test_validate_from_table_screen() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockBackend::new().with_validation(Ok(scores()));
        let mut dash = Dashboard::with_result(mock, &DashboardConfig::default(), analysis());
        dash.state_mut().open_table().unwrap();

        dash.validate(&dataset(&dir, "golden.csv")).await.unwrap();
        assert_eq!(dash.state().screen(), Screen::Validation);
        assert_eq!(dash.state().validation_step(), ValidationStep::Results);
    }

    #[tokio::test]
    async fn test_validate_without_result() {
        let dir = tempfile::tempdir().unwrap();
        let mut dash = Dashboard::new(MockBackend::new(), &DashboardConfig::default());
        let err = dash.validate(&dataset(&dir, "g.csv")).await.unwrap_err();
        assert!(matches!(err, ReviewLensError::State(StateError::NoResult)));
    }

    #[tokio::test]
    async fn test_export_local_reflects_corrections() {
        let mut dash =
            Dashboard::with_result(MockBackend::new(), &DashboardConfig::default(), analysis());
        dash.correct(&ReviewId::Int(0), Sentiment::Negative).unwrap();
        let csv = dash.export().await.unwrap();
        assert!(csv.contains("\ngood,negative,yandex\n"));
        assert_eq!(dash.backend().call_count(), 0);
    }

    #[tokio::test]
    async fn test_export_remote_uses_backend() {
        let mut config = DashboardConfig::default();
        config.backend.export_mode = ExportMode::Remote;
        let mock = MockBackend::new().with_export(Ok("text,label\n".into()));
        let dash = Dashboard::with_result(mock, &config, analysis());
        assert_eq!(dash.export().await.unwrap(), "text,label\n");
        assert_eq!(dash.backend().call_count(), 1);
    }
}

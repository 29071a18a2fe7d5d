//! Configuration system for ReviewLens.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> explicit config file -> environment. Configuration
//! is loaded from `~/.config/reviewlens/config.toml` and/or
//! `.reviewlens/config.toml` in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::export::ExportMode;
use crate::filter::DEFAULT_PAGE_SIZE;

/// Top-level configuration for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub backend: BackendConfig,
    pub table: TableConfig,
}

/// Where the classification service lives and how to talk to it.
///
/// The two known backend deployments disagree on base path, port and on
/// whether export happens server-side, so all of it is configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL, e.g. `http://localhost:8000` or `http://localhost:8080/api`.
    pub base_url: String,
    pub analyze_path: String,
    pub validate_path: String,
    pub export_path: String,
    /// Request timeout in seconds. Classification of large files is slow.
    pub timeout_secs: u64,
    /// Send the current predictions alongside the golden dataset.
    pub send_predictions: bool,
    pub export_mode: ExportMode,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            analyze_path: "/analyze".to_string(),
            validate_path: "/validate".to_string(),
            export_path: "/export".to_string(),
            timeout_secs: 120,
            send_predictions: true,
            export_mode: ExportMode::Local,
        }
    }
}

impl BackendConfig {
    /// Join the base URL and an endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.base_url).map_err(|e| ConfigError::Invalid {
            message: format!("backend.base_url '{}': {e}", self.base_url),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                message: format!(
                    "backend.base_url must use http or https, got '{}'",
                    url.scheme()
                ),
            });
        }
        for (name, path) in [
            ("analyze_path", &self.analyze_path),
            ("validate_path", &self.validate_path),
            ("export_path", &self.export_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid {
                    message: format!("backend.{name} must start with '/', got '{path}'"),
                });
            }
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "backend.timeout_secs must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

/// Review table presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Rows revealed per "load more" step.
    pub page_size: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl DashboardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backend.validate()?;
        if self.table.page_size == 0 {
            return Err(ConfigError::Invalid {
                message: "table.page_size must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "reviewlens", "reviewlens")
}

/// `~/.config/reviewlens/config.toml` (platform equivalent).
pub fn user_config_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join("config.toml"))
}

/// `<workspace>/.reviewlens/config.toml`.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".reviewlens").join("config.toml")
}

/// Directory for rolling log files.
pub fn log_dir() -> PathBuf {
    project_dirs()
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `REVIEWLENS_`, `__` between sections)
/// 2. Explicit config file (`--config`)
/// 3. Workspace-local config (`.reviewlens/config.toml`)
/// 4. User config (`~/.config/reviewlens/config.toml`)
/// 5. Built-in defaults
///
/// The merged result is validated before it is returned.
pub fn load_config(
    workspace: Option<&Path>,
    explicit: Option<&Path>,
) -> Result<DashboardConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(DashboardConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        figment = figment.merge(Toml::file(path));
    }

    // REVIEWLENS_BACKEND__BASE_URL, REVIEWLENS_TABLE__PAGE_SIZE, etc.
    figment = figment.merge(Env::prefixed("REVIEWLENS_").split("__"));

    let config: DashboardConfig = figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

/// Write the default configuration to the workspace config file.
///
/// Returns `Ok(None)` when a file already exists; it is never overwritten.
pub fn write_default_config(workspace: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let path = workspace_config_path(workspace);
    if path.exists() {
        return Ok(None);
    }
    let toml_str =
        toml::to_string_pretty(&DashboardConfig::default()).map_err(|e| ConfigError::Invalid {
            message: e.to_string(),
        })?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::Invalid {
            message: format!("cannot create {}: {e}", parent.display()),
        })?;
    }
    std::fs::write(&path, toml_str).map_err(|e| ConfigError::Invalid {
        message: format!("cannot write {}: {e}", path.display()),
    })?;
    Ok(Some(path))
}

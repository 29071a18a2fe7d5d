//! CLI subcommand handlers.

use crate::{Cli, Commands, ConfigAction};
use anyhow::Context;
use reviewlens_core::{
    AnalysisResult, AppState, Dashboard, DashboardConfig, HttpBackend, ReviewId, Sentiment,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// Handle a CLI subcommand.
pub async fn handle_command(cli: Cli, workspace: &Path) -> anyhow::Result<()> {
    let settings = Settings {
        workspace: workspace.to_path_buf(),
        config: cli.config,
        base_url: cli.base_url,
        quiet: cli.quiet,
    };
    match cli.command {
        Commands::Analyze {
            file,
            save,
            csv,
            json,
        } => handle_analyze(&settings, &file, save.as_deref(), csv.as_deref(), json).await,
        Commands::Table {
            result,
            query,
            sentiments,
            sources,
            pages,
        } => handle_table(&settings, &result, query, sentiments, sources, pages),
        Commands::Edit {
            result,
            id,
            sentiment,
        } => handle_edit(&settings, &result, &id, sentiment),
        Commands::Export { result, output } => handle_export(&settings, &result, &output).await,
        Commands::Validate {
            result,
            golden,
            json,
        } => handle_validate(&settings, &result, &golden, json).await,
        Commands::Config { action } => handle_config(&settings, action),
    }
}

struct Settings {
    workspace: PathBuf,
    config: Option<PathBuf>,
    base_url: Option<String>,
    quiet: bool,
}

impl Settings {
    fn load(&self) -> anyhow::Result<DashboardConfig> {
        let mut config =
            reviewlens_core::load_config(Some(&self.workspace), self.config.as_deref())
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        if let Some(base_url) = &self.base_url {
            config.backend.base_url = base_url.clone();
            config
                .backend
                .validate()
                .map_err(|e| anyhow::anyhow!("Invalid --base-url: {}", e))?;
        }
        Ok(config)
    }

    fn dashboard(
        &self,
        config: &DashboardConfig,
        result: Option<AnalysisResult>,
    ) -> anyhow::Result<Dashboard<HttpBackend>> {
        let backend = HttpBackend::new(&config.backend)?;
        Ok(match result {
            Some(result) => Dashboard::with_result(backend, config, result),
            None => Dashboard::new(backend, config),
        })
    }

    fn note(&self, message: &str) {
        if !self.quiet {
            println!("{message}");
        }
    }
}

fn read_result(path: &Path) -> anyhow::Result<AnalysisResult> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    AnalysisResult::from_json(&body)
        .with_context(|| format!("{} is not a saved analysis", path.display()))
}

fn write_result(path: &Path, result: &AnalysisResult) -> anyhow::Result<()> {
    let body = result.to_json_pretty()?;
    std::fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))
}

async fn handle_analyze(
    settings: &Settings,
    file: &Path,
    save: Option<&Path>,
    csv: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let config = settings.load()?;
    let mut dash = settings.dashboard(&config, None)?;
    dash.upload(file)
        .await
        .with_context(|| format!("Analysis of {} failed", file.display()))?;

    let state = dash.state();
    let result = state
        .result()
        .context("Backend returned no analysis")?;
    info!(reviews = result.reviews.len(), "Analysis loaded");
    if json {
        println!("{}", result.to_json_pretty()?);
    } else {
        print!("{}", crate::render::summary(state));
    }

    if let Some(path) = save {
        write_result(path, result)?;
        settings.note(&format!("Saved analysis to: {}", path.display()));
    }
    if let Some(path) = csv {
        let body = dash.export().await?;
        std::fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))?;
        settings.note(&format!("Exported CSV to: {}", path.display()));
    }
    Ok(())
}

fn handle_table(
    settings: &Settings,
    path: &Path,
    query: Option<String>,
    sentiments: Vec<Sentiment>,
    sources: Vec<String>,
    pages: usize,
) -> anyhow::Result<()> {
    let config = settings.load()?;
    let mut state = AppState::restored(read_result(path)?, config.table.page_size);
    state.open_table()?;

    let table = state.table_mut();
    if let Some(query) = query {
        table.set_query(query);
    }
    for sentiment in sentiments.into_iter().collect::<BTreeSet<_>>() {
        table.toggle_sentiment(sentiment);
    }
    for source in sources.iter().collect::<BTreeSet<_>>() {
        table.toggle_source(source);
    }
    for _ in 1..pages.max(1) {
        table.load_more();
    }

    let matched = state.filtered_reviews().len();
    print!(
        "{}",
        crate::render::table(
            &state.visible_reviews(),
            matched,
            state.remaining_rows(),
            state.table().filter.active_facets()
        )
    );
    Ok(())
}

fn handle_edit(
    settings: &Settings,
    path: &Path,
    id: &ReviewId,
    sentiment: Sentiment,
) -> anyhow::Result<()> {
    let config = settings.load()?;
    let mut state = AppState::restored(read_result(path)?, config.table.page_size);
    let id = reviewlens_core::resolve_review_id(state.reviews(), id)
        .cloned()
        .unwrap_or_else(|| id.clone());
    state.update_review_sentiment(&id, sentiment)?;

    let result = state.result().context("No analysis loaded")?;
    write_result(path, result)?;
    info!(%id, sentiment = sentiment.as_str(), "Review relabelled");

    let counts = state.sentiment_counts();
    settings.note(&format!(
        "Review {id} set to {}. Now {} positive, {} neutral, {} negative.",
        sentiment.as_str(),
        counts.positive,
        counts.neutral,
        counts.negative
    ));
    Ok(())
}

async fn handle_export(settings: &Settings, path: &Path, output: &Path) -> anyhow::Result<()> {
    let config = settings.load()?;
    let dash = settings.dashboard(&config, Some(read_result(path)?))?;
    let body = dash.export().await?;
    std::fs::write(output, body).with_context(|| format!("Failed to write {}", output.display()))?;
    settings.note(&format!("Exported CSV to: {}", output.display()));
    Ok(())
}

async fn handle_validate(
    settings: &Settings,
    path: &Path,
    golden: &Path,
    json: bool,
) -> anyhow::Result<()> {
    let config = settings.load()?;
    let mut dash = settings.dashboard(&config, Some(read_result(path)?))?;
    dash.validate(golden)
        .await
        .with_context(|| format!("Validation against {} failed", golden.display()))?;

    let scores = dash
        .state()
        .validation()
        .context("Backend returned no validation scores")?;
    if json {
        println!("{}", serde_json::to_string_pretty(scores)?);
    } else {
        print!("{}", crate::render::metrics(scores));
    }
    Ok(())
}

fn handle_config(settings: &Settings, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            match reviewlens_core::config::write_default_config(&settings.workspace)? {
                Some(path) => println!("Created default configuration at: {}", path.display()),
                None => println!(
                    "Configuration file already exists at: {}",
                    reviewlens_core::config::workspace_config_path(&settings.workspace).display()
                ),
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = settings.load()?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}

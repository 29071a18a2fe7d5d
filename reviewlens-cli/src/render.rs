//! Plain-text rendering of the dashboard views.

use reviewlens_core::aggregate::{NO_DATA_LABEL, TOP_WORDS_DISPLAYED};
use reviewlens_core::{AppState, ChartEntry, Review, Sentiment, ValidationResult};
use std::fmt::Write;

const BAR_WIDTH: usize = 40;
const TEXT_WIDTH: usize = 60;

/// What the values of a chart represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartValues {
    /// Raw counts; the percentage shown is each entry's share of the total.
    Counts,
    /// Percentages supplied by the backend, shown as given.
    Percentages,
}

/// Horizontal bar chart.
pub fn chart(title: &str, entries: &[ChartEntry], values: ChartValues) -> String {
    let mut out = format!("{title}\n");
    let total: f64 = entries.iter().map(|e| e.value).sum();
    let label_width = entries.iter().map(|e| e.name.chars().count()).max().unwrap_or(0);
    for entry in entries {
        if entry.name == NO_DATA_LABEL {
            let _ = writeln!(out, "  {:<label_width$}  (no reviews)", entry.name);
            continue;
        }
        let percent = match values {
            ChartValues::Counts if total > 0.0 => entry.value * 100.0 / total,
            ChartValues::Counts => 0.0,
            ChartValues::Percentages => entry.value,
        };
        let filled = (percent.clamp(0.0, 100.0) / 100.0 * BAR_WIDTH as f64).round() as usize;
        let _ = writeln!(
            out,
            "  {:<label_width$}  {:<BAR_WIDTH$}  {:>5.1}%  {}",
            entry.name,
            "=".repeat(filled),
            percent,
            entry.color
        );
    }
    out
}

/// Results screen: totals, both charts and the top words.
pub fn summary(state: &AppState) -> String {
    let counts = state.sentiment_counts();
    let mut out = format!("Reviews analyzed: {}\n", counts.total());
    if let Some(time) = state.result().and_then(|r| r.processing_time.as_deref()) {
        let _ = writeln!(out, "Processing time:  {time}");
    }
    for (sentiment, pct) in counts.percentages() {
        let _ = writeln!(
            out,
            "  {:<9} {:>6}  ({pct:.1}%)",
            sentiment.display_name(),
            counts.get(sentiment)
        );
    }
    out.push('\n');
    out.push_str(&chart(
        "Sentiment",
        &state.sentiment_chart(),
        ChartValues::Counts,
    ));

    let sources = state.source_chart();
    if !sources.is_empty() {
        out.push('\n');
        out.push_str(&chart("Sources", &sources, ChartValues::Percentages));
    }

    for sentiment in [Sentiment::Positive, Sentiment::Negative] {
        let words = state.top_words(sentiment);
        if words.is_empty() {
            continue;
        }
        let listed: Vec<String> = words
            .iter()
            .take(TOP_WORDS_DISPLAYED)
            .map(|w| format!("{} ({})", w.word, w.count))
            .collect();
        let _ = write!(
            out,
            "\nTop {} words: {}",
            sentiment.as_str(),
            listed.join(", ")
        );
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn truncate(text: &str, width: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if flat.chars().count() <= width {
        return flat;
    }
    let mut cut: String = flat.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Review table with a footer describing the hidden rows and active facets.
pub fn table(rows: &[&Review], matched: usize, remaining: usize, facets: usize) -> String {
    let id_width = rows
        .iter()
        .map(|r| r.id.to_string().chars().count())
        .max()
        .unwrap_or(2)
        .max(2);
    let mut out = format!(
        "{:<id_width$}  {:<TEXT_WIDTH$}  {:<9}  source\n",
        "id", "text", "sentiment"
    );
    for review in rows {
        let _ = writeln!(
            out,
            "{:<id_width$}  {:<TEXT_WIDTH$}  {:<9}  {}",
            review.id.to_string(),
            truncate(&review.text, TEXT_WIDTH),
            review.sentiment.as_str(),
            review.source.as_deref().unwrap_or("-")
        );
    }
    if rows.is_empty() {
        out.push_str("(no reviews match)\n");
    }
    let _ = write!(out, "\nShowing {} of {matched} matching reviews", rows.len());
    if remaining > 0 {
        let _ = write!(out, " ({remaining} more, use --pages)");
    }
    match facets {
        0 => {}
        1 => out.push_str(", 1 facet active"),
        n => {
            let _ = write!(out, ", {n} facets active");
        }
    }
    out.push('\n');
    out
}

/// Validation report: metric values and the confusion matrix grid.
pub fn metrics(result: &ValidationResult) -> String {
    let mut out = String::new();
    for (name, value) in [
        ("F1 (macro)", result.f1_macro),
        ("Precision", result.precision),
        ("Recall", result.recall),
        ("Accuracy", result.accuracy),
    ] {
        let _ = writeln!(out, "{name:<11} {:>6.1}%", value * 100.0);
    }

    let matrix = &result.confusion_matrix;
    if matrix.side() == 0 {
        return out;
    }
    let _ = writeln!(
        out,
        "Correct     {} of {}",
        matrix.diagonal(),
        matrix.total()
    );
    let width = matrix
        .labels()
        .iter()
        .map(|l| l.chars().count())
        .chain(matrix.rows().iter().flatten().map(|v| v.to_string().len()))
        .max()
        .unwrap_or(1)
        .max(4);
    let _ = write!(out, "\nConfusion matrix (rows: true, columns: predicted)\n{:>width$}", "");
    for label in matrix.labels() {
        let _ = write!(out, " {label:>width$}");
    }
    out.push('\n');
    for (label, row) in matrix.labels().iter().zip(matrix.rows()) {
        let _ = write!(out, "{label:>width$}");
        for value in row {
            let _ = write!(out, " {value:>width$}");
        }
        out.push('\n');
    }
    out
}

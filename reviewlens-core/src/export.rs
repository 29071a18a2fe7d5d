//! CSV export of the (possibly corrected) review list.
//!
//! The output opens cleanly in spreadsheet tools: UTF-8 with a byte-order mark,
//! `\n` record terminators, fields quoted only when they contain a delimiter,
//! a quote or a line break.

use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::model::Review;

/// UTF-8 byte-order mark prepended to every export.
pub const BOM: char = '\u{FEFF}';

/// Column header of the exported file.
pub const HEADER: [&str; 3] = ["text", "sentiment", "source"];

/// Where the CSV file comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// Generated from the in-memory reviews, including manual corrections.
    #[default]
    Local,
    /// Downloaded from the backend export endpoint.
    Remote,
}

/// Render reviews as CSV text. A missing source is written as an empty field.
pub fn export_csv(reviews: &[Review]) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::with_capacity(32 + reviews.len() * 64));

    writer.write_record(HEADER)?;
    for review in reviews {
        writer.write_record([
            review.text.as_str(),
            review.sentiment.as_str(),
            review.source.as_deref().unwrap_or(""),
        ])?;
    }

    let body = writer.into_inner().map_err(|e| ExportError::Flush {
        message: e.error().to_string(),
    })?;
    let body = String::from_utf8(body).map_err(|e| ExportError::Encoding {
        message: e.to_string(),
    })?;

    let mut out = String::with_capacity(BOM.len_utf8() + body.len());
    out.push(BOM);
    out.push_str(&body);
    Ok(out)
}

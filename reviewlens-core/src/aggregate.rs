//! Chart-ready summaries derived from the review list.
//!
//! Nothing here is cached: every function recomputes from the slice it is
//! given, so a manual sentiment correction is reflected the next time a view
//! asks for counts.

use serde::{Deserialize, Serialize};

use crate::model::{Review, Sentiment, SourceShare, TopWords, WordCount};

/// Lime accent used for positive reviews.
pub const COLOR_POSITIVE: &str = "#ccff00";
/// Purple accent used for neutral reviews.
pub const COLOR_NEUTRAL: &str = "#b026ff";
/// Red accent used for negative reviews.
pub const COLOR_NEGATIVE: &str = "#ff4d4f";
/// Fill for the "no data" placeholder slice.
pub const COLOR_PLACEHOLDER: &str = "#333333";

/// Palette cycled over source distribution entries.
pub const SOURCE_PALETTE: [&str; 6] = [
    COLOR_POSITIVE,
    COLOR_NEUTRAL,
    COLOR_NEGATIVE,
    "#3b82f6",
    "#f59e0b",
    "#10b981",
];

/// Label of the placeholder slice drawn when there is nothing to chart.
pub const NO_DATA_LABEL: &str = "No data";

/// Number of words the dashboard shows per sentiment class.
pub const TOP_WORDS_DISPLAYED: usize = 5;

/// Per-class review counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl SentimentCounts {
    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }

    pub fn get(&self, sentiment: Sentiment) -> usize {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
        }
    }

    fn bump(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Negative => self.negative += 1,
            Sentiment::Neutral => self.neutral += 1,
        }
    }

    /// Share of each class in percent (negative, neutral, positive order).
    /// An empty set yields zeros.
    pub fn percentages(&self) -> [(Sentiment, f64); 3] {
        let total = self.total();
        Sentiment::ALL.map(|s| {
            let pct = if total == 0 {
                0.0
            } else {
                self.get(s) as f64 * 100.0 / total as f64
            };
            (s, pct)
        })
    }
}

/// One slice of a pie chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartEntry {
    pub name: String,
    pub value: f64,
    pub color: &'static str,
}

/// Count reviews per sentiment class. The counts always sum to `reviews.len()`.
pub fn aggregate_sentiment(reviews: &[Review]) -> SentimentCounts {
    reviews.iter().fold(SentimentCounts::default(), |mut acc, r| {
        acc.bump(r.sentiment);
        acc
    })
}

/// Color associated with a sentiment class.
pub fn sentiment_color(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::Positive => COLOR_POSITIVE,
        Sentiment::Neutral => COLOR_NEUTRAL,
        Sentiment::Negative => COLOR_NEGATIVE,
    }
}

/// Pie entries for the sentiment distribution.
///
/// Zero-count classes are dropped from the chart; when every class is empty a
/// single placeholder slice of value 1 is returned instead.
pub fn sentiment_chart(counts: &SentimentCounts) -> Vec<ChartEntry> {
    let chart: Vec<ChartEntry> = Sentiment::ALL
        .iter()
        .filter(|s| counts.get(**s) > 0)
        .map(|s| ChartEntry {
            name: s.display_name().to_string(),
            value: counts.get(*s) as f64,
            color: sentiment_color(*s),
        })
        .collect();

    if chart.is_empty() {
        return vec![ChartEntry {
            name: NO_DATA_LABEL.to_string(),
            value: 1.0,
            color: COLOR_PLACEHOLDER,
        }];
    }
    chart
}

/// Decorate backend-supplied source shares with palette colors.
pub fn map_source_distribution(distribution: &[SourceShare]) -> Vec<ChartEntry> {
    distribution
        .iter()
        .enumerate()
        .map(|(index, share)| ChartEntry {
            name: share.name.clone(),
            value: share.value,
            color: SOURCE_PALETTE[index % SOURCE_PALETTE.len()],
        })
        .collect()
}

/// The display slice of the pre-computed word list for a class.
///
/// Only positive and negative classes carry word lists.
pub fn top_words_for(top_words: &TopWords, sentiment: Sentiment, limit: usize) -> &[WordCount] {
    let list = match sentiment {
        Sentiment::Positive => top_words.positive.as_slice(),
        Sentiment::Negative => top_words.negative.as_slice(),
        Sentiment::Neutral => &[],
    };
    &list[..list.len().min(limit)]
}

//! Review data model and backend payload validation.
//!
//! Backend responses are opaque JSON owned by the classification service.
//! They are checked against an explicit shape on receipt: malformed structure is
//! rejected with a [`SchemaError`] naming the offending field, while missing or
//! unrecognised sentiment labels degrade to [`Sentiment::Neutral`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::aggregate::SentimentCounts;
use crate::error::SchemaError;

/// Sentiment class assigned to a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

impl Sentiment {
    /// All classes in chart order.
    pub const ALL: [Sentiment; 3] = [Sentiment::Negative, Sentiment::Neutral, Sentiment::Positive];

    /// Lowercase wire label.
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Positive => "positive",
        }
    }

    /// Human-readable label used by chart legends.
    pub fn display_name(self) -> &'static str {
        match self {
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
            Sentiment::Positive => "Positive",
        }
    }

    /// Recognise a label or numeric class code, returning `None` when unknown.
    ///
    /// Codes follow the classifier's encoding: `0` neutral, `1` positive,
    /// `2` (or `-1`) negative.
    pub fn recognize(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "positive" | "pos" | "1" | "1.0" => Some(Sentiment::Positive),
            "negative" | "neg" | "2" | "2.0" | "-1" => Some(Sentiment::Negative),
            "neutral" | "neu" | "0" | "0.0" => Some(Sentiment::Neutral),
            _ => None,
        }
    }

    /// Decode a sentiment from an arbitrary JSON value. Never fails.
    pub fn from_wire(value: Option<&Value>) -> Self {
        let label = match value {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Sentiment::Neutral,
        };
        Self::recognize(&label).unwrap_or(Sentiment::Neutral)
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a sentiment from user input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown sentiment '{0}' (expected positive, neutral or negative)")]
pub struct ParseSentimentError(pub String);

impl FromStr for Sentiment {
    type Err = ParseSentimentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::recognize(s).ok_or_else(|| ParseSentimentError(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for Sentiment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Sentiment::from_wire(Some(&value)))
    }
}

/// Review identifier. Backends send either integer row indices or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReviewId {
    Int(i64),
    Text(String),
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewId::Int(n) => write!(f, "{n}"),
            ReviewId::Text(s) => f.write_str(s),
        }
    }
}

impl FromStr for ReviewId {
    type Err = std::convert::Infallible;

    /// Numeric input becomes an integer id, anything else a text id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(s.parse::<i64>()
            .map(ReviewId::Int)
            .unwrap_or_else(|_| ReviewId::Text(s.to_string())))
    }
}

impl From<i64> for ReviewId {
    fn from(n: i64) -> Self {
        ReviewId::Int(n)
    }
}

/// A single classified review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub text: String,
    pub sentiment: Sentiment,
    #[serde(default)]
    pub source: Option<String>,
}

impl Review {
    pub fn new(
        id: impl Into<ReviewId>,
        text: impl Into<String>,
        sentiment: Sentiment,
        source: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            sentiment,
            source: source.map(str::to_string),
        }
    }
}

/// Share of reviews coming from one source, in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceShare {
    pub name: String,
    pub value: f64,
}

/// A word and how often it occurs in one sentiment class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordCount {
    pub word: String,
    pub count: u64,
}

/// Pre-computed word frequency lists supplied by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TopWords {
    pub positive: Vec<WordCount>,
    pub negative: Vec<WordCount>,
}

/// The classified dataset returned by the analyze endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub reviews: Vec<Review>,
    pub source_distribution: Vec<SourceShare>,
    pub top_words: TopWords,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<String>,
    /// Server-side class counts. Informational only; display counts are
    /// always recomputed from `reviews`.
    #[serde(
        rename = "sentiment_distribution",
        skip_serializing_if = "Option::is_none"
    )]
    pub reported_distribution: Option<SentimentCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_reviews: Option<usize>,
}

impl AnalysisResult {
    /// Parse and validate an analyze response body.
    pub fn from_json(body: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(body).map_err(|e| SchemaError::InvalidJson {
            message: e.to_string(),
        })?;
        Self::from_value(&value)
    }

    /// Validate an already-parsed analyze response.
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        let root = ObjectView::root(value)?;

        let raw_reviews = root
            .array("reviews")?
            .ok_or_else(|| SchemaError::MissingField {
                path: "reviews".into(),
            })?;

        let mut seen = HashSet::with_capacity(raw_reviews.len());
        let mut reviews = Vec::with_capacity(raw_reviews.len());
        for (index, raw) in raw_reviews.iter().enumerate() {
            let path = format!("reviews[{index}]");
            let review = parse_review(raw, &path, index)?;
            if !seen.insert(review.id.clone()) {
                return Err(SchemaError::DuplicateId {
                    path: format!("{path}.id"),
                    id: review.id.to_string(),
                });
            }
            reviews.push(review);
        }

        let mut source_distribution = Vec::new();
        if let Some(entries) = root.array("source_distribution")? {
            for (index, raw) in entries.iter().enumerate() {
                let entry = ObjectView::new(raw, format!("source_distribution[{index}]"))?;
                let name = entry
                    .loose_string("name")?
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| "Unknown".to_string());
                let value = entry.non_negative("value")?;
                source_distribution.push(SourceShare { name, value });
            }
        }

        let top_words = match root.object("top_words")? {
            Some(words) => TopWords {
                positive: parse_word_list(&words, "positive")?,
                negative: parse_word_list(&words, "negative")?,
            },
            None => TopWords::default(),
        };

        let processing_time = match root.get("processing_time") {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(format!("{n}s")),
            Some(_) => {
                return Err(root.wrong_type("processing_time", "a string"));
            }
        };

        let reported_distribution = match root.object("sentiment_distribution")? {
            Some(dist) => Some(SentimentCounts {
                positive: dist.count("positive")?.unwrap_or(0),
                negative: dist.count("negative")?.unwrap_or(0),
                neutral: dist.count("neutral")?.unwrap_or(0),
            }),
            None => None,
        };

        let total_reviews = root.count("total_reviews")?;

        Ok(Self {
            reviews,
            source_distribution,
            top_words,
            processing_time,
            reported_distribution,
            total_reviews,
        })
    }

    /// Serialize in the same shape the analyze endpoint returns, so saved
    /// results round-trip through [`AnalysisResult::from_json`].
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Confusion matrix: `matrix[i][j]` counts true class `i` predicted as `j`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    labels: Vec<String>,
    matrix: Vec<Vec<u64>>,
}

impl ConfusionMatrix {
    /// Build a matrix, checking that it is square with side `labels.len()`.
    pub fn new(labels: Vec<String>, matrix: Vec<Vec<u64>>) -> Result<Self, SchemaError> {
        let side = labels.len();
        if matrix.len() != side {
            return Err(SchemaError::MatrixRowCount {
                rows: matrix.len(),
                side,
            });
        }
        if let Some((row, r)) = matrix.iter().enumerate().find(|(_, r)| r.len() != side) {
            return Err(SchemaError::NonSquareMatrix {
                side,
                row,
                len: r.len(),
            });
        }
        Ok(Self { labels, matrix })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Matrix rows in label order.
    pub fn rows(&self) -> &[Vec<u64>] {
        &self.matrix
    }

    pub fn side(&self) -> usize {
        self.labels.len()
    }

    /// Total number of scored rows.
    pub fn total(&self) -> u64 {
        self.matrix.iter().flatten().sum()
    }

    /// Number of correctly classified rows.
    pub fn diagonal(&self) -> u64 {
        self.matrix
            .iter()
            .enumerate()
            .filter_map(|(i, row)| row.get(i))
            .sum()
    }

    /// Count for a `(true, predicted)` label pair, if both labels exist.
    pub fn get(&self, true_label: &str, predicted_label: &str) -> Option<u64> {
        let i = self.labels.iter().position(|l| l == true_label)?;
        let j = self.labels.iter().position(|l| l == predicted_label)?;
        self.matrix.get(i)?.get(j).copied()
    }
}

/// Scores returned by the validate endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub f1_macro: f64,
    pub precision: f64,
    pub recall: f64,
    pub accuracy: f64,
    pub confusion_matrix: ConfusionMatrix,
}

impl ValidationResult {
    /// Parse and validate a validate response body.
    pub fn from_json(body: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(body).map_err(|e| SchemaError::InvalidJson {
            message: e.to_string(),
        })?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        let root = ObjectView::root(value)?;
        let f1_macro = root.unit_interval("f1_macro")?;
        let precision = root.unit_interval("precision")?;
        let recall = root.unit_interval("recall")?;
        let accuracy = root.unit_interval("accuracy")?;

        let cm = root
            .object("confusion_matrix")?
            .ok_or_else(|| SchemaError::MissingField {
                path: "confusion_matrix".into(),
            })?;

        let labels = cm
            .array("labels")?
            .ok_or_else(|| SchemaError::MissingField {
                path: cm.child_path("labels"),
            })?
            .iter()
            .enumerate()
            .map(|(i, l)| match l {
                Value::String(s) => Ok(s.clone()),
                _ => Err(SchemaError::WrongType {
                    path: format!("{}[{i}]", cm.child_path("labels")),
                    expected: "a string",
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rows = cm
            .array("matrix")?
            .ok_or_else(|| SchemaError::MissingField {
                path: cm.child_path("matrix"),
            })?;
        let mut matrix = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let row_path = format!("{}[{i}]", cm.child_path("matrix"));
            let cells = row.as_array().ok_or_else(|| SchemaError::WrongType {
                path: row_path.clone(),
                expected: "an array",
            })?;
            let parsed = cells
                .iter()
                .enumerate()
                .map(|(j, c)| {
                    c.as_u64().ok_or_else(|| SchemaError::WrongType {
                        path: format!("{row_path}[{j}]"),
                        expected: "a non-negative integer",
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            matrix.push(parsed);
        }

        Ok(Self {
            f1_macro,
            precision,
            recall,
            accuracy,
            confusion_matrix: ConfusionMatrix::new(labels, matrix)?,
        })
    }
}

fn parse_review(raw: &Value, path: &str, index: usize) -> Result<Review, SchemaError> {
    let obj = ObjectView::new(raw, path)?;
    let id = match obj.get("id") {
        None => ReviewId::Int(index as i64),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => ReviewId::Int(i),
            None => return Err(obj.wrong_type("id", "an integer or string")),
        },
        Some(Value::String(s)) => ReviewId::Text(s.clone()),
        Some(_) => return Err(obj.wrong_type("id", "an integer or string")),
    };
    let text = obj.loose_string("text")?.unwrap_or_default();
    let sentiment = Sentiment::from_wire(obj.get("sentiment"));
    let source = obj
        .loose_string("source")?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    Ok(Review {
        id,
        text,
        sentiment,
        source,
    })
}

fn parse_word_list(words: &ObjectView<'_>, key: &str) -> Result<Vec<WordCount>, SchemaError> {
    let Some(entries) = words.array(key)? else {
        return Ok(Vec::new());
    };
    entries
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let entry = ObjectView::new(raw, format!("{}[{i}]", words.child_path(key)))?;
            let word = entry
                .loose_string("word")?
                .ok_or_else(|| SchemaError::MissingField {
                    path: entry.child_path("word"),
                })?;
            let count = entry.count("count")?.unwrap_or(0) as u64;
            Ok(WordCount { word, count })
        })
        .collect()
}

/// Borrowed view of a JSON object that remembers where it sits in the payload.
struct ObjectView<'a> {
    path: String,
    map: &'a Map<String, Value>,
}

impl<'a> ObjectView<'a> {
    fn root(value: &'a Value) -> Result<Self, SchemaError> {
        Self::new(value, "")
    }

    fn new(value: &'a Value, path: impl Into<String>) -> Result<Self, SchemaError> {
        let path = path.into();
        match value {
            Value::Object(map) => Ok(Self { path, map }),
            _ => Err(SchemaError::WrongType {
                path: if path.is_empty() { "$".into() } else { path },
                expected: "an object",
            }),
        }
    }

    fn child_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", self.path)
        }
    }

    fn wrong_type(&self, key: &str, expected: &'static str) -> SchemaError {
        SchemaError::WrongType {
            path: self.child_path(key),
            expected,
        }
    }

    /// Field value; JSON `null` counts as absent.
    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    fn array(&self, key: &str) -> Result<Option<&'a Vec<Value>>, SchemaError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Array(a)) => Ok(Some(a)),
            Some(_) => Err(self.wrong_type(key, "an array")),
        }
    }

    fn object(&self, key: &str) -> Result<Option<ObjectView<'a>>, SchemaError> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => ObjectView::new(v, self.child_path(key)).map(Some),
        }
    }

    /// String field, accepting numbers and booleans in their textual form.
    fn loose_string(&self, key: &str) -> Result<Option<String>, SchemaError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(_) => Err(self.wrong_type(key, "a string")),
        }
    }

    fn count(&self, key: &str) -> Result<Option<usize>, SchemaError> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_u64()
                .map(|n| Some(n as usize))
                .ok_or_else(|| self.wrong_type(key, "a non-negative integer")),
        }
    }

    fn number(&self, key: &str) -> Result<f64, SchemaError> {
        let value = self.get(key).ok_or_else(|| SchemaError::MissingField {
            path: self.child_path(key),
        })?;
        value
            .as_f64()
            .filter(|f| f.is_finite())
            .ok_or_else(|| self.wrong_type(key, "a finite number"))
    }

    fn non_negative(&self, key: &str) -> Result<f64, SchemaError> {
        let value = self.number(key)?;
        if value < 0.0 {
            return Err(SchemaError::OutOfRange {
                path: self.child_path(key),
                value,
                range: "[0, inf)",
            });
        }
        Ok(value)
    }

    fn unit_interval(&self, key: &str) -> Result<f64, SchemaError> {
        let value = self.number(key)?;
        if !(0.0..=1.0).contains(&value) {
            return Err(SchemaError::OutOfRange {
                path: self.child_path(key),
                value,
                range: "[0, 1]",
            });
        }
        Ok(value)
    }
}

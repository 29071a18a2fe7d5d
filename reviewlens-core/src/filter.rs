//! Free-text search, sentiment/source facets and incremental pagination.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::{Review, Sentiment};

/// Rows revealed per "load more" step.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Search query plus facet selections.
///
/// Values inside one facet are OR-ed, the query and the facets are AND-ed.
/// An empty facet places no constraint on its dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewFilter {
    pub query: String,
    pub sentiments: BTreeSet<Sentiment>,
    pub sources: BTreeSet<String>,
}

impl ReviewFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_sentiment(mut self, sentiment: Sentiment) -> Self {
        self.sentiments.insert(sentiment);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.sources.insert(source.into());
        self
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Select the sentiment if absent, deselect it otherwise.
    pub fn toggle_sentiment(&mut self, sentiment: Sentiment) {
        if !self.sentiments.remove(&sentiment) {
            self.sentiments.insert(sentiment);
        }
    }

    /// Select the source if absent, deselect it otherwise.
    pub fn toggle_source(&mut self, source: &str) {
        if !self.sources.remove(source) {
            self.sources.insert(source.to_string());
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// True when the filter constrains nothing.
    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.sentiments.is_empty() && self.sources.is_empty()
    }

    /// Number of selected facet values, for the filter badge.
    pub fn active_facets(&self) -> usize {
        self.sentiments.len() + self.sources.len()
    }

    pub fn matches(&self, review: &Review) -> bool {
        if !self.query.is_empty()
            && !review
                .text
                .to_lowercase()
                .contains(&self.query.to_lowercase())
        {
            return false;
        }
        if !self.sentiments.is_empty() && !self.sentiments.contains(&review.sentiment) {
            return false;
        }
        if !self.sources.is_empty() {
            match &review.source {
                Some(src) if self.sources.contains(src) => {}
                _ => return false,
            }
        }
        true
    }
}

/// Stable filter: matching reviews in their original order.
pub fn filter_reviews<'a>(reviews: &'a [Review], filter: &ReviewFilter) -> Vec<&'a Review> {
    reviews.iter().filter(|r| filter.matches(r)).collect()
}

/// Distinct non-empty sources, sorted, for the source facet picker.
pub fn unique_sources(reviews: &[Review]) -> Vec<String> {
    reviews
        .iter()
        .filter_map(|r| r.source.as_deref())
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Visible-row cursor over a filtered list.
///
/// Grows by `page_size` on demand and only shrinks through [`Pagination::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    page_size: usize,
    visible: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Pagination {
    /// A zero page size is bumped to one so the cursor always advances.
    pub fn new(page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            page_size,
            visible: page_size,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn visible(&self) -> usize {
        self.visible
    }

    pub fn load_more(&mut self) {
        self.visible = self.visible.saturating_add(self.page_size);
    }

    pub fn reset(&mut self) {
        self.visible = self.page_size;
    }

    pub fn has_more(&self, total: usize) -> bool {
        self.visible < total
    }

    /// Rows still hidden behind the cursor.
    pub fn remaining(&self, total: usize) -> usize {
        total.saturating_sub(self.visible)
    }

    /// The visible prefix of `rows`.
    pub fn window<'a, T>(&self, rows: &'a [T]) -> &'a [T] {
        &rows[..rows.len().min(self.visible)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Vec<Review> {
        vec![
            Review::new(0, "Great delivery", Sentiment::Positive, Some("yandex")),
            Review::new(1, "Slow courier", Sentiment::Negative, Some("google")),
            Review::new(2, "It was ok", Sentiment::Neutral, None),
            Review::new(3, "GREAT support", Sentiment::Positive, Some("google")),
            Review::new(4, "Broken on arrival", Sentiment::Negative, Some("yandex")),
        ]
    }

    fn ids(rows: &[&Review]) -> Vec<String> {
        rows.iter().map(|r| r.id.to_string()).collect()
    }

    #[test]
    fn test_empty_filter_is_identity() {
        let reviews = sample();
        let out = filter_reviews(&reviews, &ReviewFilter::new());
        assert_eq!(out.len(), reviews.len());
        assert!(out.iter().zip(&reviews).all(|(a, b)| *a == b));
    }

    #[test]
    fn test_query_is_case_insensitive_substring() {
        let reviews = sample();
        let out = filter_reviews(&reviews, &ReviewFilter::new().with_query("great"));
        assert_eq!(ids(&out), vec!["0", "3"]);
    }

    #[test]
    fn test_sentiment_facet_preserves_order() {
        let reviews = sample();
        let out = filter_reviews(
            &reviews,
            &ReviewFilter::new().with_sentiment(Sentiment::Positive),
        );
        assert_eq!(ids(&out), vec!["0", "3"]);
    }

    #[test]
    fn test_facets_or_within_and_across() {
        let reviews = sample();
        let filter = ReviewFilter::new()
            .with_sentiment(Sentiment::Positive)
            .with_sentiment(Sentiment::Negative)
            .with_source("yandex");
        assert_eq!(ids(&filter_reviews(&reviews, &filter)), vec!["0", "4"]);
    }

    #[test]
    fn test_source_facet_excludes_missing_source() {
        let reviews = sample();
        let filter = ReviewFilter::new().with_source("google");
        assert_eq!(ids(&filter_reviews(&reviews, &filter)), vec!["1", "3"]);
    }

    #[test]
    fn test_all_constraints_combined() {
        let reviews = sample();
        let filter = ReviewFilter::new()
            .with_query("slow")
            .with_sentiment(Sentiment::Positive);
        assert!(filter_reviews(&reviews, &filter).is_empty());
    }

    #[test]
    fn test_toggle_facets() {
        let mut filter = ReviewFilter::new();
        filter.toggle_sentiment(Sentiment::Neutral);
        filter.toggle_source("yandex");
        assert_eq!(filter.active_facets(), 2);
        filter.toggle_sentiment(Sentiment::Neutral);
        assert!(filter.sentiments.is_empty());
        filter.toggle_source("yandex");
        assert!(filter.is_empty());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut filter = ReviewFilter::new()
            .with_query("x")
            .with_source("google")
            .with_sentiment(Sentiment::Negative);
        assert!(!filter.is_empty());
        filter.clear();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_unique_sources_sorted_and_deduped() {
        assert_eq!(unique_sources(&sample()), vec!["google", "yandex"]);
    }

    #[test]
    fn test_pagination_grows_by_page() {
        let rows: Vec<u32> = (0..120).collect();
        let mut page = Pagination::default();
        assert_eq!(page.window(&rows).len(), 50);
        assert!(page.has_more(rows.len()));
        assert_eq!(page.remaining(rows.len()), 70);

        page.load_more();
        assert_eq!(page.window(&rows).len(), 100);
        page.load_more();
        assert_eq!(page.window(&rows).len(), 120);
        assert!(!page.has_more(rows.len()));
        assert_eq!(page.remaining(rows.len()), 0);

        page.reset();
        assert_eq!(page.visible(), 50);
    }

    #[test]
    fn test_pagination_zero_page_size() {
        let mut page = Pagination::new(0);
        assert_eq!(page.page_size(), 1);
        page.load_more();
        assert_eq!(page.visible(), 2);
    }
}

//! Manual sentiment correction.

use crate::error::EditError;
use crate::model::{Review, ReviewId, Sentiment};

/// Return a copy of `reviews` with the review `id` relabelled.
///
/// Order, ids, texts and sources are untouched. An unknown id is an error and
/// leaves the caller's data as it was.
pub fn update_review_sentiment(
    reviews: &[Review],
    id: &ReviewId,
    sentiment: Sentiment,
) -> Result<Vec<Review>, EditError> {
    if !reviews.iter().any(|r| &r.id == id) {
        return Err(EditError::ReviewNotFound { id: id.clone() });
    }
    Ok(reviews
        .iter()
        .map(|r| {
            if &r.id == id {
                Review {
                    sentiment,
                    ..r.clone()
                }
            } else {
                r.clone()
            }
        })
        .collect())
}

/// Find the stored id a user-typed id refers to.
///
/// An exact match wins. Otherwise ids are compared by their printed form, so
/// `17` typed on a command line reaches a review stored with the text id `"17"`.
pub fn resolve_review_id<'a>(reviews: &'a [Review], id: &ReviewId) -> Option<&'a ReviewId> {
    reviews
        .iter()
        .map(|r| &r.id)
        .find(|candidate| *candidate == id)
        .or_else(|| {
            let printed = id.to_string();
            reviews
                .iter()
                .map(|r| &r.id)
                .find(|candidate| candidate.to_string() == printed)
        })
}

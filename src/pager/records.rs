//! Server-sourced review records and the page envelope.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::{ReconError, Result};
use crate::stats::RatingBucket;

/// Maximum length of a review comment, in characters.
pub const MAX_COMMENT_LEN: usize = 280;

/// Public profile of a review author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingAuthor {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// One review row as the backend returns it.
///
/// Rows are owned by the backend; the client never originates an `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub id: String,
    pub rating: RatingBucket,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Absent when the author profile row is gone.
    pub author: Option<RatingAuthor>,
}

/// One fetched page plus the authoritative total from the same request.
///
/// Carrying the count on the page itself (instead of a second query)
/// closes the race window between the list and its counter.
#[derive(Debug, Clone, Default)]
pub struct RatingsPage {
    pub records: Vec<RatingRecord>,
    /// Authoritative server-side row count, when the backend reported one.
    pub total: Option<u64>,
}

/// Validate a comment before it is posted.
pub fn validate_comment(comment: &str) -> Result<()> {
    let length = comment.chars().count();
    if length > MAX_COMMENT_LEN {
        return Err(ReconError::CommentTooLong {
            length,
            max: MAX_COMMENT_LEN,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{MAX_COMMENT_LEN, RatingRecord, validate_comment};

    #[test]
    fn comment_at_limit_is_accepted() {
        let comment = "x".repeat(MAX_COMMENT_LEN);
        validate_comment(&comment).expect("280 characters is within the limit");
    }

    #[test]
    fn comment_over_limit_is_rejected() {
        let comment = "x".repeat(MAX_COMMENT_LEN + 1);
        let err = validate_comment(&comment).expect_err("281 characters must be rejected");
        assert_eq!(err.code(), "SPR-2101");
    }

    #[test]
    fn limit_counts_characters_not_bytes() {
        // 280 multibyte characters is still within the limit.
        let comment = "é".repeat(MAX_COMMENT_LEN);
        validate_comment(&comment).expect("character count governs the limit");
    }

    #[test]
    fn record_deserializes_from_backend_row() {
        let record: RatingRecord = serde_json::from_value(serde_json::json!({
            "id": "r-1",
            "rating": 4,
            "comment": null,
            "created_at": "2026-01-05T12:00:00Z",
            "updated_at": "2026-01-05T12:00:00Z",
            "author": {
                "id": "u-1",
                "username": "kickflip",
                "display_name": "Kick Flip",
                "avatar_url": null
            }
        }))
        .expect("well-formed row deserializes");
        assert_eq!(record.rating.value(), 4);
        assert!(record.comment.is_none());
    }

    #[test]
    fn out_of_range_rating_fails_deserialization() {
        let result: Result<RatingRecord, _> = serde_json::from_value(serde_json::json!({
            "id": "r-2",
            "rating": 9,
            "comment": null,
            "created_at": "2026-01-05T12:00:00Z",
            "updated_at": "2026-01-05T12:00:00Z",
            "author": null
        }));
        assert!(result.is_err());
    }
}

//! Paginated accumulation of review records with dedup merge and
//! generation-tagged stale-response discard.

pub mod loader;
pub mod records;

pub use loader::{
    LoadMode, MergeOutcome, PageRequest, PagerPhase, RatingsBackend, RatingsPager,
};
pub use records::{MAX_COMMENT_LEN, RatingAuthor, RatingRecord, RatingsPage, validate_comment};

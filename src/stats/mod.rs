//! Pure rating-aggregate maintenance: histogram normalization, healing of
//! partial backend aggregates, and incremental optimistic mutations.

pub mod distribution;
pub mod summary;

pub use distribution::{RatingBucket, RatingDistribution, normalize_distribution};
pub use summary::{
    AggregateSnapshot, RatingMutation, RatingSummary, apply_mutation, build_summary,
    compute_average, reconcile_aggregate_fields, round2, summarize_ratings,
};

//! Rating-summary construction and optimistic mutation application.
//!
//! Everything in this file is pure and total: no I/O, no panics, and no
//! NaN in any output. A wrong-but-bounded number is the intended failure
//! mode, because these values render directly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::distribution::{RatingBucket, RatingDistribution, normalize_distribution};

/// Aggregate view of one target's ratings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingSummary {
    /// Weighted mean, rounded to two decimals. Zero when `count` is zero.
    pub average: f64,
    /// Total number of ratings.
    pub count: u64,
    /// Per-bucket histogram; always sums to `count`.
    pub distribution: RatingDistribution,
}

impl Default for RatingSummary {
    fn default() -> Self {
        Self {
            average: 0.0,
            count: 0,
            distribution: RatingDistribution::default(),
        }
    }
}

/// A single local optimistic change to one user's rating of one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingMutation {
    /// A rating that did not exist before.
    Create {
        /// The new rating.
        rating: RatingBucket,
    },
    /// An existing rating changed value.
    ///
    /// `previous` is a required field: an update that cannot name the
    /// rating it replaces is a caller contract violation, and making the
    /// field mandatory keeps that violation unrepresentable.
    Update {
        /// The new rating.
        rating: RatingBucket,
        /// The rating being replaced.
        previous: RatingBucket,
    },
    /// An existing rating was removed.
    Delete {
        /// The rating being removed.
        rating: RatingBucket,
    },
}

/// Raw aggregate fields as a backend row supplies them.
///
/// All three fields are independently nullable and may disagree;
/// [`build_summary`] reconciles them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AggregateSnapshot {
    /// Loosely-typed histogram blob.
    pub rating_distribution: Option<Value>,
    /// Server-maintained rating count.
    pub rating_count: Option<i64>,
    /// Server-maintained weighted average.
    pub rating_average: Option<f64>,
}

/// Round to two decimals, half-up.
///
/// The 1e-9 adjustment pushes exact `.xx5` values that binary floats
/// represent as `.xx4999…` back over the rounding boundary.
#[must_use]
pub fn round2(value: f64) -> f64 {
    ((value + 1e-9) * 100.0).round() / 100.0
}

/// Weighted mean of a histogram, rounded to two decimals.
///
/// Returns exactly `0.0` for an empty histogram. Callers render this
/// value directly, so NaN is contractually impossible here.
#[must_use]
pub fn compute_average(distribution: &RatingDistribution) -> f64 {
    let total = distribution.total();
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = distribution.weighted_sum() as f64 / total as f64;
    round2(mean)
}

/// Precedence policy for the three independently-sourced aggregate fields.
///
/// - `count`: the scalar field wins when it is positive; otherwise the
///   count is healed from the histogram total.
/// - `average`: the scalar field wins when it is finite (re-rounded);
///   otherwise the average is healed from the histogram.
///
/// The precedence is a documented contract, kept out of
/// [`build_summary`] so it can be tested on its own.
#[must_use]
pub fn reconcile_aggregate_fields(
    distribution: &RatingDistribution,
    count_field: Option<i64>,
    average_field: Option<f64>,
) -> (u64, f64) {
    let count = match count_field {
        Some(provided) if provided > 0 => provided.unsigned_abs(),
        _ => distribution.total(),
    };

    let average = match average_field {
        Some(provided) if provided.is_finite() => round2(provided),
        _ => compute_average(distribution),
    };

    (count, average)
}

/// Build a renderable summary from a possibly-partial backend row.
///
/// Tolerates any combination of missing or stale aggregate fields; the
/// result is always internally consistent enough to render (no NaN, all
/// buckets present).
#[must_use]
pub fn build_summary(snapshot: &AggregateSnapshot) -> RatingSummary {
    let distribution = normalize_distribution(snapshot.rating_distribution.as_ref());
    let (count, average) =
        reconcile_aggregate_fields(&distribution, snapshot.rating_count, snapshot.rating_average);
    RatingSummary {
        average,
        count,
        distribution,
    }
}

/// Apply one optimistic mutation, returning the updated summary.
///
/// Non-mutating. Decrements clamp at zero; `count` and `average` are
/// recomputed from the updated histogram rather than adjusted
/// incrementally, so they can never drift from it.
#[must_use]
pub fn apply_mutation(summary: &RatingSummary, mutation: RatingMutation) -> RatingSummary {
    let mut distribution = summary.distribution;

    match mutation {
        RatingMutation::Create { rating } => {
            distribution.increment(rating);
        }
        RatingMutation::Update { rating, previous } => {
            distribution.saturating_decrement(previous);
            distribution.increment(rating);
        }
        RatingMutation::Delete { rating } => {
            distribution.saturating_decrement(rating);
        }
    }

    RatingSummary {
        average: compute_average(&distribution),
        count: distribution.total(),
        distribution,
    }
}

/// Fold a set of raw ratings into a summary.
pub fn summarize_ratings(ratings: impl IntoIterator<Item = RatingBucket>) -> RatingSummary {
    ratings.into_iter().fold(RatingSummary::default(), |acc, rating| {
        apply_mutation(&acc, RatingMutation::Create { rating })
    })
}

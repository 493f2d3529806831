//! Rating buckets and the per-bucket histogram.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::ReconError;

/// One of the five discrete star-rating values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum RatingBucket {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
}

impl RatingBucket {
    /// All buckets in ascending order.
    pub const ALL: [Self; 5] = [Self::One, Self::Two, Self::Three, Self::Four, Self::Five];

    /// Star value of the bucket, 1 through 5.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Zero-based histogram index.
    #[must_use]
    pub(crate) const fn index(self) -> usize {
        (self as u8 - 1) as usize
    }

    /// Bucket for a raw star value, or `None` when out of range.
    #[must_use]
    pub const fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            3 => Some(Self::Three),
            4 => Some(Self::Four),
            5 => Some(Self::Five),
            _ => None,
        }
    }
}

impl TryFrom<u8> for RatingBucket {
    type Error = ReconError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_value(value).ok_or(ReconError::InvalidBucket {
            value: i64::from(value),
        })
    }
}

impl Serialize for RatingBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.value())
    }
}

impl<'de> Deserialize<'de> for RatingBucket {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        u8::try_from(raw)
            .ok()
            .and_then(Self::from_value)
            .ok_or_else(|| de::Error::custom(format!("rating bucket out of range: {raw}")))
    }
}

/// Histogram mapping each bucket to a rating count.
///
/// Every bucket is always present (zero when unused), so consumers never
/// have to handle a sparse map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RatingDistribution {
    counts: [u64; 5],
}

impl RatingDistribution {
    /// Count for one bucket.
    #[must_use]
    pub const fn get(&self, bucket: RatingBucket) -> u64 {
        self.counts[bucket.index()]
    }

    /// Add one rating to a bucket.
    pub fn increment(&mut self, bucket: RatingBucket) {
        self.counts[bucket.index()] += 1;
    }

    /// Remove one rating from a bucket, clamping at zero.
    ///
    /// The clamp keeps local optimistic state non-negative even when a
    /// decrement is applied twice or reverses a mutation the histogram
    /// never counted.
    pub fn saturating_decrement(&mut self, bucket: RatingBucket) {
        let slot = &mut self.counts[bucket.index()];
        *slot = slot.saturating_sub(1);
    }

    /// Total number of ratings across all buckets.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Sum of `bucket value × count` over all buckets.
    #[must_use]
    pub fn weighted_sum(&self) -> u64 {
        RatingBucket::ALL
            .iter()
            .map(|bucket| u64::from(bucket.value()) * self.get(*bucket))
            .sum()
    }

    /// Iterate buckets in ascending order with their counts.
    pub fn iter(&self) -> impl Iterator<Item = (RatingBucket, u64)> + '_ {
        RatingBucket::ALL.into_iter().map(|bucket| (bucket, self.get(bucket)))
    }
}

impl Serialize for RatingDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5))?;
        for (bucket, count) in self.iter() {
            map.serialize_entry(&bucket.value().to_string(), &count)?;
        }
        map.end()
    }
}

/// Coerce an untrusted aggregate blob into a full histogram.
///
/// Backend rows carry the distribution as a loosely-typed JSON object;
/// keys may be numeric strings and values may be missing, fractional,
/// negative, or non-numeric. Each bucket takes the truncated value when
/// it is a finite positive number, and zero otherwise. Total function:
/// malformed input degrades, it never errors, because the result feeds
/// straight into rendered aggregates.
#[must_use]
pub fn normalize_distribution(raw: Option<&Value>) -> RatingDistribution {
    let mut result = RatingDistribution::default();
    let Some(Value::Object(entries)) = raw else {
        return result;
    };

    for bucket in RatingBucket::ALL {
        let value = entries
            .get(&bucket.value().to_string())
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        if value.is_finite() && value > 0.0 {
            // Truncation here matches the count semantics of the wire
            // field; fractional counts are a backend bug, not data.
            result.counts[bucket.index()] = value.trunc() as u64;
        }
    }

    result
}

//! Aggregate & engagement reconciliation core.
//!
//! Client-side state maintenance for a social/marketplace surface, split
//! into three independent components:
//!
//! - [`stats`] — pure rating-distribution aggregates: histogram
//!   normalization, healing of partial backend aggregate fields, and
//!   incremental optimistic mutations that keep average, count, and
//!   histogram consistent without re-fetching.
//! - [`pager`] — paginated accumulation of review records with
//!   dedup-by-id merging and generation-tagged discard of stale
//!   responses.
//! - [`ledger`] — idempotent participation registration mirrored into
//!   durable local id-sets, with a pending-sync queue for upserts that
//!   failed transiently.
//!
//! The core performs no rendering and owns no sockets: remote queries
//! and writes sit behind the [`pager::RatingsBackend`] and
//! [`ledger::ParticipationBackend`] traits, and hosts drive all
//! scheduling (the crate assumes a single-threaded cooperative event
//! loop and models fetch suspension points as begin/complete pairs).

pub mod core;
pub mod ledger;
pub mod pager;
pub mod stats;

pub use crate::core::config::ReconConfig;
pub use crate::core::errors::{ReconError, Result};

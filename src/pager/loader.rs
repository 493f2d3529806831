//! Page-by-page review loading with dedup merge and stale-response
//! discard.
//!
//! The loader is split sans-I/O: [`RatingsPager::begin`] hands out a
//! generation-tagged [`PageRequest`], the host performs the fetch, and
//! [`RatingsPager::complete`] merges the response. The split exists so a
//! cooperative event loop can interleave loads with other work and a
//! response that arrives after a newer load has started is identifiable
//! and dropped. [`RatingsPager::load_page`] wraps the pair for the common
//! non-interleaved path.

use std::collections::HashSet;

use log::{debug, warn};

use crate::core::errors::{ReconError, Result};

use super::records::{RatingRecord, RatingsPage};

/// How a fetched page combines with the list already on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Discard prior items; used for page 1 and full resets.
    Replace,
    /// Merge new records after the existing ones; used for "load more".
    Append,
}

/// Observable lifecycle of the pager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerPhase {
    /// No fetch in flight; more records may remain.
    Idle,
    /// A fetch is in flight.
    Loading,
    /// Every known record has been loaded.
    Exhausted,
}

/// A generation-tagged fetch ticket.
///
/// The host fetches `limit` records at `offset` and hands the ticket back
/// to [`RatingsPager::complete`] together with the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    generation: u64,
    page: u32,
    mode: LoadMode,
    /// Zero-based record offset of the requested page.
    pub offset: usize,
    /// Records to fetch; always the configured page size.
    pub limit: usize,
}

impl PageRequest {
    /// Generation this request belongs to.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// One-based page number requested.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Merge mode the response will be applied with.
    #[must_use]
    pub const fn mode(&self) -> LoadMode {
        self.mode
    }
}

/// Result of completing a page request.
#[derive(Debug)]
pub enum MergeOutcome {
    /// The page merged into the list.
    Applied {
        /// Records actually added to the list.
        appended: usize,
        /// Fetched records dropped because their id was already present.
        duplicates_dropped: usize,
        /// Whether the list now holds every known record.
        exhausted: bool,
    },
    /// The response belonged to a superseded load and was discarded.
    Stale {
        /// Generation the request carried.
        request_generation: u64,
        /// Generation currently in flight.
        current_generation: u64,
    },
    /// Nothing left to load; no request was issued.
    AlreadyExhausted,
    /// The fetch failed; previously-loaded state is untouched.
    Failed(ReconError),
}

impl MergeOutcome {
    /// Whether the outcome changed (or confirmed) the rendered list.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// The remote paged review query, as the core sees it.
///
/// Implementations fetch `limit` records at `offset`, newest first, and
/// return the authoritative total from the same request when the backend
/// supplies one.
pub trait RatingsBackend {
    /// Fetch one page of review records for a target entity.
    fn fetch_page(&self, target_id: &str, offset: usize, limit: usize) -> Result<RatingsPage>;
}

/// Paginated, deduplicated review list for one target entity.
///
/// One instance per rendered target. Invariants: `items` never contains
/// two records with the same id, and `items.len() <= total` once a total
/// is known.
#[derive(Debug)]
pub struct RatingsPager {
    target_id: String,
    page_size: usize,
    items: Vec<RatingRecord>,
    page: u32,
    total: u64,
    total_known: bool,
    loading: bool,
    generation: u64,
}

impl RatingsPager {
    /// Create an empty pager for one target entity.
    ///
    /// `page_size` of zero is coerced to one; a zero-size page can never
    /// make progress.
    #[must_use]
    pub fn new(target_id: impl Into<String>, page_size: usize) -> Self {
        Self {
            target_id: target_id.into(),
            page_size: page_size.max(1),
            items: Vec::new(),
            page: 0,
            total: 0,
            total_known: false,
            loading: false,
            generation: 0,
        }
    }

    /// Target entity this pager accumulates reviews for.
    #[must_use]
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Records loaded so far, newest first, unique by id.
    #[must_use]
    pub fn items(&self) -> &[RatingRecord] {
        &self.items
    }

    /// Latest authoritative total, or the local count until one is known.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// One-based page number of the most recently merged page.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Whether a fetch is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Generation of the most recent [`Self::begin`] call.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether unloaded records remain, as far as the last total says.
    #[must_use]
    pub fn has_more(&self) -> bool {
        !self.total_known || (self.items.len() as u64) < self.total
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> PagerPhase {
        if self.loading {
            PagerPhase::Loading
        } else if self.total_known && !self.has_more() {
            PagerPhase::Exhausted
        } else {
            PagerPhase::Idle
        }
    }

    /// Start a load, superseding any request still in flight.
    ///
    /// Bumps the generation, so a response to an earlier `begin` will be
    /// discarded by [`Self::complete`] no matter when it resolves.
    pub fn begin(&mut self, page: u32, mode: LoadMode) -> PageRequest {
        let page = page.max(1);
        self.generation += 1;
        self.loading = true;
        PageRequest {
            generation: self.generation,
            page,
            mode,
            offset: (page as usize - 1) * self.page_size,
            limit: self.page_size,
        }
    }

    /// Merge a fetch outcome for a previously issued request.
    ///
    /// `loading` is cleared on every current-generation exit path. A
    /// failed fetch leaves `items` and `total` untouched: rendered state
    /// never regresses because a later request failed.
    pub fn complete(
        &mut self,
        request: &PageRequest,
        outcome: Result<RatingsPage>,
    ) -> MergeOutcome {
        if request.generation != self.generation {
            debug!(
                "discarding stale page response for {} (generation {} < {})",
                self.target_id, request.generation, self.generation
            );
            return MergeOutcome::Stale {
                request_generation: request.generation,
                current_generation: self.generation,
            };
        }

        self.loading = false;

        let fetched = match outcome {
            Ok(page) => page,
            Err(error) => {
                warn!(
                    "page {} fetch failed for {}: {error}",
                    request.page, self.target_id
                );
                return MergeOutcome::Failed(error);
            }
        };

        // Dedup by id against the rendered list (append mode) and within
        // the fetched page itself: a concurrent write shifting offsets
        // can re-surface an id the client already holds.
        let mut seen: HashSet<String> = match request.mode {
            LoadMode::Replace => HashSet::new(),
            LoadMode::Append => self.items.iter().map(|record| record.id.clone()).collect(),
        };

        let mut merged = Vec::with_capacity(fetched.records.len());
        let mut duplicates_dropped = 0usize;
        for record in fetched.records {
            if seen.insert(record.id.clone()) {
                merged.push(record);
            } else {
                duplicates_dropped += 1;
            }
        }

        let appended = merged.len();
        match request.mode {
            LoadMode::Replace => self.items = merged,
            LoadMode::Append => self.items.extend(merged),
        }
        self.page = request.page;

        if let Some(total) = fetched.total {
            self.total = total;
            self.total_known = true;
        }
        // A held or stale total must never undercount what is already
        // rendered; duplicates dropped from a merge do not shrink it.
        self.total = self.total.max(self.items.len() as u64);

        let exhausted = self.total_known && !self.has_more();
        MergeOutcome::Applied {
            appended,
            duplicates_dropped,
            exhausted,
        }
    }

    /// Fetch and merge one page in a single call.
    pub fn load_page(
        &mut self,
        backend: &dyn RatingsBackend,
        page: u32,
        mode: LoadMode,
    ) -> MergeOutcome {
        let request = self.begin(page, mode);
        let outcome = backend.fetch_page(&self.target_id, request.offset, request.limit);
        self.complete(&request, outcome)
    }

    /// Load the next page in append mode.
    pub fn load_next(&mut self, backend: &dyn RatingsBackend) -> MergeOutcome {
        if !self.has_more() {
            return MergeOutcome::AlreadyExhausted;
        }
        self.load_page(backend, self.page + 1, LoadMode::Append)
    }

    /// Reset to page 1, discarding prior items on success.
    ///
    /// Used when the viewer's own rating changes and the list ordering is
    /// no longer trustworthy.
    pub fn refresh(&mut self, backend: &dyn RatingsBackend) -> MergeOutcome {
        self.load_page(backend, 1, LoadMode::Replace)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{LoadMode, MergeOutcome, PagerPhase, RatingsBackend, RatingsPager};
    use crate::core::errors::{ReconError, Result};
    use crate::pager::records::{RatingRecord, RatingsPage};
    use crate::stats::RatingBucket;

    fn record(id: &str) -> RatingRecord {
        let at = Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap();
        RatingRecord {
            id: id.to_string(),
            rating: RatingBucket::Four,
            comment: None,
            created_at: at,
            updated_at: at,
            author: None,
        }
    }

    struct FixedBackend {
        pages: std::cell::RefCell<Vec<Result<RatingsPage>>>,
    }

    impl FixedBackend {
        fn new(pages: Vec<Result<RatingsPage>>) -> Self {
            Self {
                pages: std::cell::RefCell::new(pages),
            }
        }
    }

    impl RatingsBackend for FixedBackend {
        fn fetch_page(&self, _target: &str, _offset: usize, _limit: usize) -> Result<RatingsPage> {
            self.pages.borrow_mut().remove(0)
        }
    }

    fn page(ids: &[&str], total: Option<u64>) -> RatingsPage {
        RatingsPage {
            records: ids.iter().map(|id| record(id)).collect(),
            total,
        }
    }

    #[test]
    fn append_drops_records_already_rendered() {
        let backend = FixedBackend::new(vec![
            Ok(page(&["a", "b", "c", "d", "e"], Some(9))),
            // Concurrent insert shifted offsets; "e" comes back again.
            Ok(page(&["e", "f", "g", "h", "i"], Some(9))),
        ]);
        let mut pager = RatingsPager::new("spot-1", 5);

        assert!(pager.load_page(&backend, 1, LoadMode::Replace).is_applied());
        let outcome = pager.load_next(&backend);
        let MergeOutcome::Applied {
            appended,
            duplicates_dropped,
            exhausted,
        } = outcome
        else {
            panic!("expected applied merge, got {outcome:?}");
        };
        assert_eq!(appended, 4);
        assert_eq!(duplicates_dropped, 1);
        assert!(exhausted);

        let ids: Vec<&str> = pager.items().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c", "d", "e", "f", "g", "h", "i"]);
        assert_eq!(pager.phase(), PagerPhase::Exhausted);
    }

    #[test]
    fn failed_fetch_leaves_rendered_state_intact() {
        let backend = FixedBackend::new(vec![
            Ok(page(&["a", "b"], Some(4))),
            Err(ReconError::remote_transient("fetch_page", "timeout")),
        ]);
        let mut pager = RatingsPager::new("spot-1", 2);

        assert!(pager.load_page(&backend, 1, LoadMode::Replace).is_applied());
        let outcome = pager.load_next(&backend);
        assert!(matches!(outcome, MergeOutcome::Failed(_)));
        assert_eq!(pager.items().len(), 2);
        assert_eq!(pager.total(), 4);
        assert!(!pager.is_loading());
        assert!(pager.has_more());
    }

    #[test]
    fn missing_total_is_held_not_recomputed() {
        let backend = FixedBackend::new(vec![
            Ok(page(&["a", "b"], Some(5))),
            Ok(page(&["b", "c"], None)),
        ]);
        let mut pager = RatingsPager::new("spot-1", 2);

        pager.load_page(&backend, 1, LoadMode::Replace);
        pager.load_next(&backend);
        // One duplicate dropped; the held total must not shrink to 3.
        assert_eq!(pager.items().len(), 3);
        assert_eq!(pager.total(), 5);
    }

    #[test]
    fn stale_generation_response_is_discarded() {
        let mut pager = RatingsPager::new("spot-1", 5);
        let stale = pager.begin(2, LoadMode::Append);
        let fresh = pager.begin(1, LoadMode::Replace);

        let applied = pager.complete(&fresh, Ok(page(&["a"], Some(1))));
        assert!(applied.is_applied());

        let outcome = pager.complete(&stale, Ok(page(&["z"], Some(9))));
        assert!(matches!(outcome, MergeOutcome::Stale { .. }));
        let ids: Vec<&str> = pager.items().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a"]);
        assert_eq!(pager.total(), 1);
        assert!(!pager.is_loading());
    }

    #[test]
    fn load_next_short_circuits_when_exhausted() {
        let backend = FixedBackend::new(vec![Ok(page(&["a"], Some(1)))]);
        let mut pager = RatingsPager::new("spot-1", 5);
        pager.load_page(&backend, 1, LoadMode::Replace);
        assert!(matches!(
            pager.load_next(&backend),
            MergeOutcome::AlreadyExhausted
        ));
    }
}

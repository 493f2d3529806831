//! Idempotent participation registration with a local fallback ledger.
//!
//! A registration is one remote upsert keyed on `(target_id, user_id)`
//! mirrored into a durable local id-set. The local set serves two jobs:
//! idempotent short-circuit (a second click never re-issues the upsert)
//! and degraded-mode fallback (a transiently failed upsert is recorded
//! locally and queued for a later sync sweep instead of blocking the
//! user). A failed remote write is reported as [`RegistrationOutcome::
//! PendingSync`], never silently promoted to a confirmed success, so the
//! failure signal survives long enough to reconcile.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use log::{debug, warn};
use parking_lot::Mutex;
use rand::Rng;

use crate::core::errors::Result;

use super::store::{KvStore, read_id_set, write_id_set};

/// Which participation ledger a registration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngagementKind {
    /// Community challenges.
    Challenge,
    /// Scheduled events.
    Event,
}

impl EngagementKind {
    /// Durable slot holding the registered-id set for this kind.
    #[must_use]
    pub const fn slot(self) -> &'static str {
        match self {
            Self::Challenge => "engagement:challenge-registrations",
            Self::Event => "engagement:event-registrations",
        }
    }

    /// Durable slot holding ids awaiting a successful remote sync.
    #[must_use]
    pub const fn pending_slot(self) -> &'static str {
        match self {
            Self::Challenge => "engagement:challenge-pending-sync",
            Self::Event => "engagement:event-pending-sync",
        }
    }

    /// Remote participation table for this kind.
    #[must_use]
    pub const fn table(self, sponsor: bool) -> &'static str {
        match (self, sponsor) {
            (Self::Challenge, false) => "challenge_participants",
            (Self::Challenge, true) => "sponsor_challenge_participants",
            (Self::Event, false) => "event_registrations",
            (Self::Event, true) => "sponsor_event_registrations",
        }
    }

    const fn noun(self) -> &'static str {
        match self {
            Self::Challenge => "challenge",
            Self::Event => "event",
        }
    }
}

/// Options for one registration attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegisterOptions {
    /// Route the upsert to the sponsor-flavored participation table.
    pub sponsor: bool,
}

/// Outcome of a registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The remote upsert succeeded (or already had).
    Confirmed,
    /// Recorded locally; the remote write failed and awaits a sync sweep.
    PendingSync,
    /// The backend rejected the registration; nothing was recorded.
    Rejected,
}

impl RegistrationOutcome {
    /// Whether the surface may show the user as registered.
    #[must_use]
    pub const fn accepted(self) -> bool {
        matches!(self, Self::Confirmed | Self::PendingSync)
    }
}

/// Outcome plus a user-facing message.
#[derive(Debug, Clone)]
pub struct RegistrationResult {
    /// Tri-state outcome.
    pub outcome: RegistrationOutcome,
    /// Message for the surface to display.
    pub message: String,
}

/// Result of one pending-sync sweep.
#[derive(Debug, Clone, Copy)]
pub struct SyncReport {
    /// Ids promoted out of the pending queue this sweep.
    pub synced: usize,
    /// Ids still awaiting a successful upsert.
    pub still_pending: usize,
    /// Suggested delay before the next sweep, when work remains.
    pub next_retry_in: Option<Duration>,
}

/// The remote participation tables, as the core sees them.
pub trait ParticipationBackend {
    /// Upsert one participation row, keyed on `(target_id, user_id)`.
    ///
    /// Must be safe to repeat: the same logical registration may arrive
    /// from two sessions.
    fn upsert_participation(&self, table: &str, target_id: &str, user_id: &str) -> Result<()>;
}

/// Process-wide registration ledger over a durable slot store.
///
/// Slots are re-read on every call — another surface or process may have
/// written them — and merged with a session cache so ids registered this
/// session survive even when persistence fails.
pub struct EngagementLedger<S: KvStore> {
    store: S,
    session: Mutex<HashMap<&'static str, HashSet<String>>>,
    sweep_attempts: Mutex<HashMap<EngagementKind, u32>>,
    retry_base_secs: u64,
}

impl<S: KvStore> EngagementLedger<S> {
    /// Create a ledger over a slot store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            session: Mutex::new(HashMap::new()),
            sweep_attempts: Mutex::new(HashMap::new()),
            retry_base_secs: 2,
        }
    }

    /// Override the exponential retry base used by [`Self::flush_pending`].
    #[must_use]
    pub fn with_retry_base(mut self, secs: u64) -> Self {
        self.retry_base_secs = secs.max(1);
        self
    }

    fn load_slot(&self, slot: &'static str) -> HashSet<String> {
        let mut ids = read_id_set(&self.store, slot);
        if let Some(cached) = self.session.lock().get(slot) {
            ids.extend(cached.iter().cloned());
        }
        ids
    }

    fn save_slot(&self, slot: &'static str, ids: HashSet<String>) {
        write_id_set(&self.store, slot, &ids);
        self.session.lock().insert(slot, ids);
    }

    /// Ids registered for a kind, local fallback entries included.
    pub fn registered(&self, kind: EngagementKind) -> HashSet<String> {
        self.load_slot(kind.slot())
    }

    /// Ids recorded locally but not yet confirmed remotely, sorted.
    pub fn pending(&self, kind: EngagementKind) -> Vec<String> {
        let mut ids: Vec<String> = self.load_slot(kind.pending_slot()).into_iter().collect();
        ids.sort_unstable();
        ids
    }

    /// Register a user's participation, idempotently.
    ///
    /// Already-registered targets short-circuit without a network call.
    /// A retryable remote failure records the id locally and queues it
    /// for [`Self::flush_pending`]; a non-retryable rejection records
    /// nothing.
    pub fn register(
        &self,
        backend: &dyn ParticipationBackend,
        kind: EngagementKind,
        target_id: &str,
        user_id: &str,
        options: RegisterOptions,
    ) -> RegistrationResult {
        let mut ids = self.load_slot(kind.slot());
        if ids.contains(target_id) {
            // Still idempotent, but a locally-recorded id that never made
            // it to the backend keeps reporting as pending.
            let outcome = if self.load_slot(kind.pending_slot()).contains(target_id) {
                RegistrationOutcome::PendingSync
            } else {
                RegistrationOutcome::Confirmed
            };
            return RegistrationResult {
                outcome,
                message: format!("You are already registered for this {}.", kind.noun()),
            };
        }

        let table = kind.table(options.sponsor);
        match backend.upsert_participation(table, target_id, user_id) {
            Ok(()) => {
                ids.insert(target_id.to_string());
                self.save_slot(kind.slot(), ids);

                let mut pending = self.load_slot(kind.pending_slot());
                if pending.remove(target_id) {
                    self.save_slot(kind.pending_slot(), pending);
                }

                RegistrationResult {
                    outcome: RegistrationOutcome::Confirmed,
                    message: format!("Registration confirmed for this {}.", kind.noun()),
                }
            }
            Err(error) if error.is_retryable() => {
                warn!(
                    "remote {} registration failed, recording locally: {error}",
                    kind.noun()
                );
                ids.insert(target_id.to_string());
                self.save_slot(kind.slot(), ids);

                let mut pending = self.load_slot(kind.pending_slot());
                pending.insert(target_id.to_string());
                self.save_slot(kind.pending_slot(), pending);

                RegistrationResult {
                    outcome: RegistrationOutcome::PendingSync,
                    message: format!(
                        "Registration recorded locally; it will sync to the {} once the \
                         connection recovers.",
                        kind.noun()
                    ),
                }
            }
            Err(error) => RegistrationResult {
                outcome: RegistrationOutcome::Rejected,
                message: format!("Registration was rejected: {error}"),
            },
        }
    }

    /// Retry the remote upsert for every pending id of a kind.
    ///
    /// Successes leave the pending queue; the registered set never
    /// shrinks. When work remains, the report carries a jittered
    /// exponential delay the host can sleep before the next sweep.
    pub fn flush_pending(
        &self,
        backend: &dyn ParticipationBackend,
        kind: EngagementKind,
        user_id: &str,
        options: RegisterOptions,
    ) -> SyncReport {
        let pending = self.pending(kind);
        if pending.is_empty() {
            self.sweep_attempts.lock().remove(&kind);
            return SyncReport {
                synced: 0,
                still_pending: 0,
                next_retry_in: None,
            };
        }

        let table = kind.table(options.sponsor);
        let mut remaining = HashSet::new();
        let mut synced = 0usize;
        for target_id in pending {
            match backend.upsert_participation(table, &target_id, user_id) {
                Ok(()) => {
                    debug!("synced pending {} registration {target_id}", kind.noun());
                    synced += 1;
                }
                Err(error) => {
                    warn!(
                        "pending {} registration {target_id} still unsynced: {error}",
                        kind.noun()
                    );
                    remaining.insert(target_id);
                }
            }
        }

        let still_pending = remaining.len();
        self.save_slot(kind.pending_slot(), remaining);

        let next_retry_in = if still_pending == 0 {
            self.sweep_attempts.lock().remove(&kind);
            None
        } else {
            let mut attempts = self.sweep_attempts.lock();
            let attempt = attempts.entry(kind).or_insert(0);
            *attempt = attempt.saturating_add(1);
            Some(self.retry_delay(*attempt))
        };

        SyncReport {
            synced,
            still_pending,
            next_retry_in,
        }
    }

    /// Jittered exponential delay: `base^attempt` seconds scaled by a
    /// factor in `[0.5, 1.5)`, capped at one hour.
    fn retry_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.min(10);
        let base = self
            .retry_base_secs
            .saturating_pow(exp)
            .min(3600);
        let jitter: f64 = rand::rng().random_range(0.5..1.5);
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_sign_loss,
            clippy::cast_possible_truncation
        )]
        let millis = ((base as f64) * jitter * 1000.0) as u64;
        Duration::from_millis(millis)
    }
}

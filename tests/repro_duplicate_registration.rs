//! Repro: double-clicking "register" while the backend is flapping must
//! not produce duplicate ledger mutations or a visible failure.
//!
//! Sequence under test: first click fails transiently and falls back to
//! the local ledger; second click arrives before any sync sweep. Both
//! clicks must report accepted, exactly one upsert may reach the wire,
//! and the pending queue must hold the id exactly once.

use std::cell::Cell;

use spot_recon::ReconError;
use spot_recon::core::errors::Result;
use spot_recon::ledger::{
    EngagementKind, EngagementLedger, MemoryStore, ParticipationBackend, RegisterOptions,
    RegistrationOutcome,
};

struct FlappingBackend {
    failures_left: Cell<u32>,
    upserts: Cell<u32>,
}

impl ParticipationBackend for FlappingBackend {
    fn upsert_participation(&self, _table: &str, _target: &str, _user: &str) -> Result<()> {
        self.upserts.set(self.upserts.get() + 1);
        if self.failures_left.get() > 0 {
            self.failures_left.set(self.failures_left.get() - 1);
            return Err(ReconError::remote_transient("upsert", "gateway timeout"));
        }
        Ok(())
    }
}

#[test]
fn double_click_during_outage_is_idempotent() {
    let ledger = EngagementLedger::new(MemoryStore::default());
    let backend = FlappingBackend {
        failures_left: Cell::new(1),
        upserts: Cell::new(0),
    };

    let first = ledger.register(
        &backend,
        EngagementKind::Event,
        "ev-99",
        "user-1",
        RegisterOptions::default(),
    );
    assert_eq!(first.outcome, RegistrationOutcome::PendingSync);
    assert!(first.outcome.accepted());

    let second = ledger.register(
        &backend,
        EngagementKind::Event,
        "ev-99",
        "user-1",
        RegisterOptions::default(),
    );
    assert!(second.outcome.accepted());
    assert_eq!(
        backend.upserts.get(),
        1,
        "second click must not reach the wire"
    );
    assert_eq!(ledger.pending(EngagementKind::Event), vec!["ev-99"]);

    // Backend recovers; one sweep confirms the registration.
    let report = ledger.flush_pending(
        &backend,
        EngagementKind::Event,
        "user-1",
        RegisterOptions::default(),
    );
    assert_eq!(report.synced, 1);
    assert_eq!(report.still_pending, 0);
    assert!(ledger.pending(EngagementKind::Event).is_empty());

    // A third click after the sweep confirms without another upsert.
    let third = ledger.register(
        &backend,
        EngagementKind::Event,
        "ev-99",
        "user-1",
        RegisterOptions::default(),
    );
    assert_eq!(third.outcome, RegistrationOutcome::Confirmed);
    assert_eq!(backend.upserts.get(), 2, "only the sweep reached the wire");
}

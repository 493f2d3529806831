//! Remote-first, local-fallback registration ledger with durable
//! key-value slots and an explicit pending-sync queue.

pub mod engagement;
pub mod store;

pub use engagement::{
    EngagementKind, EngagementLedger, ParticipationBackend, RegisterOptions, RegistrationOutcome,
    RegistrationResult, SyncReport,
};
pub use store::{KvStore, MemoryStore, read_id_set, write_id_set};

#[cfg(feature = "sqlite")]
pub use store::SqliteStore;

//! Durable key-value slots backing the engagement ledger.
//!
//! One JSON-encoded array of ids per slot. The SQLite implementation is
//! the durable one (WAL mode, feature-gated like the rest of the SQLite
//! surface); the in-memory implementation backs tests and hosts that run
//! without a writable data directory.

use std::collections::{BTreeSet, HashMap, HashSet};

use log::warn;
use parking_lot::Mutex;

use crate::core::errors::Result;

/// A durable string slot store.
///
/// Slots survive process restarts in durable implementations. Reads must
/// reflect writes from other handles to the same backing store, since
/// several surfaces share the ledger.
pub trait KvStore {
    /// Read a slot, `None` when it has never been written.
    fn read(&self, slot: &str) -> Result<Option<String>>;

    /// Write a slot, replacing any previous value.
    fn write(&self, slot: &str, value: &str) -> Result<()>;
}

/// Read a slot as a set of ids, degrading to empty on any failure.
///
/// Corrupt or unreadable slots are a recoverable condition: the ledger
/// keeps working from an empty set for that call rather than surfacing
/// an error to a registration click.
pub fn read_id_set(store: &dyn KvStore, slot: &str) -> HashSet<String> {
    let raw = match store.read(slot) {
        Ok(Some(raw)) => raw,
        Ok(None) => return HashSet::new(),
        Err(error) => {
            warn!("unable to read ledger slot {slot}: {error}");
            return HashSet::new();
        }
    };

    match serde_json::from_str::<Vec<String>>(&raw) {
        Ok(ids) => ids.into_iter().collect(),
        Err(error) => {
            warn!("ledger slot {slot} holds corrupt data, treating as empty: {error}");
            HashSet::new()
        }
    }
}

/// Persist a set of ids to a slot, best-effort.
///
/// Write failures are swallowed (warn-logged); the caller's in-memory
/// set stays authoritative for the rest of the session.
pub fn write_id_set(store: &dyn KvStore, slot: &str, ids: &HashSet<String>) {
    // Sorted encoding keeps slot contents stable across sessions.
    let ordered: BTreeSet<&String> = ids.iter().collect();
    let encoded = match serde_json::to_string(&ordered) {
        Ok(encoded) => encoded,
        Err(error) => {
            warn!("unable to encode ledger slot {slot}: {error}");
            return;
        }
    };
    if let Err(error) = store.write(slot, &encoded) {
        warn!("unable to persist ledger slot {slot}: {error}");
    }
}

/// Ephemeral store for tests and degraded hosts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl KvStore for MemoryStore {
    fn read(&self, slot: &str) -> Result<Option<String>> {
        Ok(self.slots.lock().get(slot).cloned())
    }

    fn write(&self, slot: &str, value: &str) -> Result<()> {
        self.slots.lock().insert(slot.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

#[cfg(feature = "sqlite")]
mod sqlite {
    use std::path::Path;

    use parking_lot::Mutex;
    use rusqlite::{Connection, OptionalExtension, params};

    use super::KvStore;
    use crate::core::errors::Result;

    /// SQLite-backed slot store, WAL mode for concurrent surfaces.
    #[derive(Debug)]
    pub struct SqliteStore {
        connection: Mutex<Connection>,
    }

    impl SqliteStore {
        /// Open (or create) the slot database at `path`.
        pub fn open(path: impl AsRef<Path>) -> Result<Self> {
            let connection = Connection::open(path.as_ref())?;
            connection.pragma_update(None, "journal_mode", "WAL")?;
            connection.execute(
                "CREATE TABLE IF NOT EXISTS kv_slots (
                    slot TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                )",
                [],
            )?;
            Ok(Self {
                connection: Mutex::new(connection),
            })
        }
    }

    impl KvStore for SqliteStore {
        fn read(&self, slot: &str) -> Result<Option<String>> {
            let connection = self.connection.lock();
            let value = connection
                .query_row(
                    "SELECT value FROM kv_slots WHERE slot = ?1",
                    params![slot],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        }

        fn write(&self, slot: &str, value: &str) -> Result<()> {
            let connection = self.connection.lock();
            connection.execute(
                "INSERT INTO kv_slots (slot, value) VALUES (?1, ?2)
                 ON CONFLICT(slot) DO UPDATE SET value = excluded.value",
                params![slot, value],
            )?;
            Ok(())
        }
    }
}

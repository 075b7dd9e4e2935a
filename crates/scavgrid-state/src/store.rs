//! SnapshotStore: redb persistence of tracker entries between runs.
//!
//! The tracker itself is in-memory and pass-scoped; the daemon saves it
//! here after every pass and restores it on start so the estimator has an
//! opinion before the first pass completes.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::SITES;
use crate::tracker::{FleetTracker, SiteScavengingState};

macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

#[derive(Clone)]
pub struct SnapshotStore {
    db: Arc<Database>,
}

impl SnapshotStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "snapshot store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store.
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(SITES).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Load every stored site entry, ordered by site id.
    pub fn load_all(&self) -> StateResult<Vec<SiteScavengingState>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SITES).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            results.push(decode(key.value(), value.value())?);
        }
        Ok(results)
    }

    /// Replace the stored snapshot with the tracker's current entries.
    ///
    /// Sites evicted from the tracker are removed from the store in the
    /// same transaction.
    pub fn save_tracker(&self, tracker: &FleetTracker) -> StateResult<usize> {
        let encoded: Vec<(String, Vec<u8>)> = tracker
            .sites()
            .map(|e| Ok((e.site_id.clone(), encode(e)?)))
            .collect::<StateResult<_>>()?;

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(SITES).map_err(map_err!(Table))?;
            let mut existing = Vec::new();
            for entry in table.iter().map_err(map_err!(Read))? {
                let (key, _) = entry.map_err(map_err!(Read))?;
                existing.push(key.value().to_string());
            }
            for key in existing {
                table.remove(key.as_str()).map_err(map_err!(Write))?;
            }
            for (site, value) in &encoded {
                table
                    .insert(site.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(sites = encoded.len(), "tracker snapshot saved");
        Ok(encoded.len())
    }
}

fn encode(entry: &SiteScavengingState) -> StateResult<Vec<u8>> {
    serde_json::to_vec(entry).map_err(|e| StateError::Encode {
        site: entry.site_id.clone(),
        reason: e.to_string(),
    })
}

fn decode(site: &str, bytes: &[u8]) -> StateResult<SiteScavengingState> {
    serde_json::from_slice(bytes).map_err(|e| StateError::Corrupt {
        site: site.to_string(),
        reason: e.to_string(),
    })
}

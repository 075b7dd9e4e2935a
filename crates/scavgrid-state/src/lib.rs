//! scavgrid-state: fleet state tracker for scavgrid.
//!
//! The [`FleetTracker`] is the in-memory record of every site's slots as
//! last observed (or last dispatched). It is owned by the orchestrator and
//! handed to each fleet pass by `&mut`; there is no global cache.
//!
//! # Lifecycle
//!
//! ```text
//! pre-filter   → observe(site, slots)        overwrite the whole entry
//! dispatch     → record_dispatch(site, level) flip one slot to busy
//! between runs → evict_stale(now)             drop entries older than ttl
//!              → SnapshotStore::save_tracker  persist to redb
//! ```

pub mod error;
pub mod store;
pub mod tables;
pub mod tracker;

pub use error::{StateError, StateResult};
pub use store::SnapshotStore;
pub use tracker::{FleetTracker, SiteScavengingState, SlotTimeRecord};

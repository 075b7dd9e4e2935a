//! redb table definitions for the snapshot store.

use redb::TableDefinition;

/// Tracker entries keyed by site id, JSON-serialized.
pub const SITES: TableDefinition<&str, &[u8]> = TableDefinition::new("sites");

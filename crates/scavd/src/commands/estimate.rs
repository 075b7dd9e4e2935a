use std::path::Path;

use scav_core::time::epoch_secs;
use scavgrid_poll::{PollSettings, estimate_next_poll};
use scavgrid_state::{FleetTracker, SnapshotStore};
use serde_json::json;

use super::{load_config, snapshot_path};

pub fn estimate(config_path: Option<&Path>, data_dir: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let settings = PollSettings::from_config(&config);

    let mut tracker = FleetTracker::new(config.tracker.ttl());
    let db_path = snapshot_path(data_dir);
    if db_path.exists() {
        tracker.restore(SnapshotStore::open(&db_path)?.load_all()?);
    }

    let now = epoch_secs();
    let evicted = tracker.evict_stale(now);
    let estimate = estimate_next_poll(&tracker, now, &settings.estimator);

    let output = json!({
        "sites": tracker.len(),
        "evicted": evicted,
        "estimate_secs": estimate,
        "delay_secs": settings.delay_for(estimate).as_secs(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

use std::path::Path;

use scavgrid_dispatch::{ExecutorSettings, FleetPass, SimulatedWorld};
use scavgrid_poll::{PollSettings, Poller};
use scavgrid_state::{FleetTracker, SnapshotStore};
use tokio::sync::watch;
use tracing::{info, warn};

use super::{load_config, snapshot_path};

pub async fn run(
    config_path: Option<&Path>,
    world_path: &Path,
    data_dir: &Path,
    once: bool,
) -> anyhow::Result<()> {
    info!("scavgrid daemon starting");

    let config = load_config(config_path)?;
    let world = SimulatedWorld::from_file(world_path)?;
    info!(path = ?world_path, "simulated world loaded");

    // ── Tracker snapshot ───────────────────────────────────────

    std::fs::create_dir_all(data_dir)?;
    let db_path = snapshot_path(data_dir);
    let store = SnapshotStore::open(&db_path)?;

    let mut tracker = FleetTracker::new(config.tracker.ttl());
    let restored = store.load_all()?;
    info!(path = ?db_path, sites = restored.len(), "tracker restored");
    tracker.restore(restored);

    // ── Pass loop ──────────────────────────────────────────────

    let pass = FleetPass::new(&world, &config, ExecutorSettings::from_config(&config.dispatch));
    let mut poller = Poller::new(pass, tracker, PollSettings::from_config(&config)).with_store(store);

    if once {
        let tick = poller.tick().await;
        println!("{}", serde_json::to_string_pretty(&tick)?);
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received"),
            Err(e) => warn!(error = %e, "failed to listen for CTRL+C"),
        }
        let _ = shutdown_tx.send(true);
    });

    poller.run(shutdown_rx).await;

    info!("scavgrid daemon stopped");
    Ok(())
}

//! Pass loop: run a fleet pass, estimate, sleep, repeat.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, warn};

use scav_core::ScavConfig;
use scavgrid_dispatch::{FleetPass, PassReport};
use scavgrid_state::{FleetTracker, SnapshotStore};

use crate::estimator::{EstimatorSettings, estimate_next_poll};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub estimator: EstimatorSettings,
    /// Delay when the estimator has no opinion.
    pub default_delay: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from_config(&ScavConfig::default())
    }
}

impl PollSettings {
    pub fn from_config(config: &ScavConfig) -> Self {
        Self {
            estimator: EstimatorSettings::from_config(&config.poll),
            default_delay: config.poll.fallback_delay(),
            min_delay: config.poll.min_clamp(),
            max_delay: config.poll.max_clamp(),
        }
    }

    /// Loop delay for an estimate in seconds.
    pub fn delay_for(&self, estimate: Option<u64>) -> Duration {
        match estimate {
            Some(secs) => Duration::from_secs(secs).clamp(self.min_delay, self.max_delay),
            None => self.default_delay,
        }
    }
}

/// Outcome of one loop iteration.
#[derive(Debug, Clone, Serialize)]
pub struct PollTick {
    /// `None` when the pass was aborted.
    pub report: Option<PassReport>,
    /// Sites dropped from the tracker for exceeding the TTL.
    pub evicted: Vec<String>,
    /// Raw estimate in seconds.
    pub estimate_secs: Option<u64>,
    /// Clamped delay until the next pass, in seconds.
    pub delay_secs: u64,
}

/// Owns the tracker and drives passes until shut down.
pub struct Poller<'a> {
    pass: FleetPass<'a>,
    tracker: FleetTracker,
    settings: PollSettings,
    store: Option<SnapshotStore>,
    clock: fn() -> u64,
}

impl<'a> Poller<'a> {
    pub fn new(pass: FleetPass<'a>, tracker: FleetTracker, settings: PollSettings) -> Self {
        Self {
            pass,
            tracker,
            settings,
            store: None,
            clock: scav_core::time::epoch_secs,
        }
    }

    /// Persist the tracker after every pass.
    pub fn with_store(mut self, store: SnapshotStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    pub fn tracker(&self) -> &FleetTracker {
        &self.tracker
    }

    /// Run one pass and compute the delay before the next one.
    pub async fn tick(&mut self) -> PollTick {
        let report = match self.pass.run(&mut self.tracker).await {
            Ok(report) => Some(report),
            Err(e) => {
                error!(error = %e, "fleet pass failed");
                None
            }
        };

        let now = (self.clock)();
        let evicted = self.tracker.evict_stale(now);

        if let Some(store) = &self.store {
            if let Err(e) = store.save_tracker(&self.tracker) {
                warn!(error = %e, "failed to persist tracker snapshot");
            }
        }

        let estimate_secs = estimate_next_poll(&self.tracker, now, &self.settings.estimator);
        let delay = self.settings.delay_for(estimate_secs);
        info!(
            estimate_secs = ?estimate_secs,
            delay_secs = delay.as_secs(),
            sites = self.tracker.len(),
            "next pass scheduled"
        );

        PollTick {
            report,
            evicted,
            estimate_secs,
            delay_secs: delay.as_secs(),
        }
    }

    /// Loop until `shutdown` flips to true.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            min_delay_secs = self.settings.min_delay.as_secs(),
            max_delay_secs = self.settings.max_delay.as_secs(),
            "poller started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            let tick = self.tick().await;
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(tick.delay_secs)) => {}
                _ = shutdown.changed() => {}
            }
        }
        info!("poller shutting down");
    }
}

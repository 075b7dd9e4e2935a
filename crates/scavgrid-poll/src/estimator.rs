//! Next-poll estimator.

use std::time::Duration;

use tracing::debug;

use scav_core::SlotStatus;
use scav_core::config::PollConfig;
use scavgrid_state::{FleetTracker, SiteScavengingState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimatorSettings {
    /// How recent an entry must be for the idle fallback to apply.
    pub fresh_window: Duration,
    /// Wait for a fresh site whose free slots were just left alone.
    pub idle_fallback: Duration,
    /// Wait for unlocking slots with no known remaining time.
    pub unlocking_fallback: Duration,
    /// Wait for a site with every slot locked.
    pub locked_wait: Duration,
}

impl Default for EstimatorSettings {
    fn default() -> Self {
        Self::from_config(&PollConfig::default())
    }
}

impl EstimatorSettings {
    pub fn from_config(config: &PollConfig) -> Self {
        Self {
            fresh_window: config.fresh(),
            idle_fallback: config.idle(),
            unlocking_fallback: config.unlocking(),
            locked_wait: config.locked(),
        }
    }
}

/// Seconds until `entry` is worth looking at again.
pub fn site_wait(entry: &SiteScavengingState, now: u64, settings: &EstimatorSettings) -> u64 {
    let remaining = |status: SlotStatus| {
        entry
            .slots
            .iter()
            .filter(move |r| r.status == status)
            .map(move |r| r.remaining_at(now))
    };

    if entry.any(SlotStatus::Busy) {
        // Unknown timing counts as free now.
        return remaining(SlotStatus::Busy)
            .map(|r| r.unwrap_or(0))
            .max()
            .unwrap_or(0);
    }

    if entry.any(SlotStatus::Available) {
        // Free slots left alone on a fresh entry most likely mean the last
        // attempt found nothing to send.
        let idle = entry.is_fresh(now, settings.fresh_window) && !entry.any(SlotStatus::Unlocking);
        return if idle { settings.idle_fallback.as_secs() } else { 0 };
    }

    if entry.any(SlotStatus::Unlocking) {
        return remaining(SlotStatus::Unlocking)
            .flatten()
            .min()
            .unwrap_or(settings.unlocking_fallback.as_secs());
    }

    settings.locked_wait.as_secs()
}

/// Fleet-wide delay in seconds: the smallest per-site wait.
///
/// `None` only when the tracker holds no entries.
pub fn estimate_next_poll(tracker: &FleetTracker, now: u64, settings: &EstimatorSettings) -> Option<u64> {
    let delay = tracker
        .sites()
        .map(|entry| {
            let wait = site_wait(entry, now, settings);
            debug!(site = %entry.site_id, wait_secs = wait, "site wait");
            wait
        })
        .min();
    debug!(?delay, sites = tracker.len(), "next poll estimated");
    delay
}

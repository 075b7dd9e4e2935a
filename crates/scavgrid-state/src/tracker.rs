//! Fleet state tracker: per-site slot timing as of the latest pass.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use scav_core::time::format_remaining;
use scav_core::{SiteId, Slot, SlotLevel, SlotStatus};

/// Timing record of one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotTimeRecord {
    pub level: SlotLevel,
    pub status: SlotStatus,
    /// Seconds remaining at the time of recording.
    pub remaining_secs: Option<u64>,
    /// `H:MM:SS` rendering of `remaining_secs`.
    pub time_remaining_text: Option<String>,
    /// Unix time (seconds) the slot is expected to free up.
    pub completes_at: Option<u64>,
}

impl SlotTimeRecord {
    fn from_slot(slot: &Slot, now: u64) -> Self {
        let remaining = slot.remaining_secs.filter(|_| slot.status.is_timed());
        Self {
            level: slot.level,
            status: slot.status,
            remaining_secs: remaining,
            time_remaining_text: remaining.map(format_remaining),
            completes_at: remaining.map(|r| now + r),
        }
    }

    /// Remaining seconds as of `now`.
    ///
    /// Prefers the completion instant so records kept across passes do not
    /// overstate the wait. Never negative.
    pub fn remaining_at(&self, now: u64) -> Option<u64> {
        match self.completes_at {
            Some(at) => Some(at.saturating_sub(now)),
            None => self.remaining_secs,
        }
    }
}

/// Tracker entry for one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteScavengingState {
    pub site_id: SiteId,
    /// Unix time (seconds) of the last observation or dispatch.
    pub last_updated: u64,
    /// Ordered by level.
    pub slots: Vec<SlotTimeRecord>,
}

impl SiteScavengingState {
    pub fn from_observation(site_id: &str, slots: &[Slot], now: u64) -> Self {
        let mut records: Vec<SlotTimeRecord> =
            slots.iter().map(|s| SlotTimeRecord::from_slot(s, now)).collect();
        records.sort_by_key(|r| r.level);
        records.dedup_by_key(|r| r.level);
        Self {
            site_id: site_id.to_string(),
            last_updated: now,
            slots: records,
        }
    }

    pub fn slot(&self, level: SlotLevel) -> Option<&SlotTimeRecord> {
        self.slots.iter().find(|r| r.level == level)
    }

    pub fn any(&self, status: SlotStatus) -> bool {
        self.slots.iter().any(|r| r.status == status)
    }

    /// Whether the entry was updated within `window` of `now`.
    pub fn is_fresh(&self, now: u64, window: Duration) -> bool {
        now.saturating_sub(self.last_updated) <= window.as_secs()
    }
}

/// In-memory tracker of every site seen by recent passes.
#[derive(Debug, Clone)]
pub struct FleetTracker {
    entries: BTreeMap<SiteId, SiteScavengingState>,
    ttl: Duration,
}

impl FleetTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: BTreeMap::new(),
            ttl,
        }
    }

    /// Replace a site's entry with a fresh observation.
    pub fn observe(&mut self, site_id: &str, slots: &[Slot], now: u64) -> &SiteScavengingState {
        let entry = SiteScavengingState::from_observation(site_id, slots, now);
        debug!(site = %site_id, slots = entry.slots.len(), "tracker entry replaced");
        self.entries.insert(site_id.to_string(), entry);
        &self.entries[site_id]
    }

    /// Mark a slot busy after a confirmed dispatch.
    ///
    /// A `duration_secs` of zero means the provider could not report one;
    /// the slot is still marked busy but without timing.
    pub fn record_dispatch(&mut self, site_id: &str, level: SlotLevel, duration_secs: u64, now: u64) {
        let entry = self
            .entries
            .entry(site_id.to_string())
            .or_insert_with(|| SiteScavengingState {
                site_id: site_id.to_string(),
                last_updated: now,
                slots: Vec::new(),
            });

        let remaining = (duration_secs > 0).then_some(duration_secs);
        let record = SlotTimeRecord {
            level,
            status: SlotStatus::Busy,
            remaining_secs: remaining,
            time_remaining_text: remaining.map(format_remaining),
            completes_at: remaining.map(|r| now + r),
        };

        match entry.slots.iter_mut().find(|r| r.level == level) {
            Some(existing) => *existing = record,
            None => {
                entry.slots.push(record);
                entry.slots.sort_by_key(|r| r.level);
            }
        }
        entry.last_updated = now;
        debug!(site = %site_id, level, duration_secs, "tracker slot marked busy");
    }

    /// Drop entries not updated within the TTL. Returns the evicted site ids.
    pub fn evict_stale(&mut self, now: u64) -> Vec<SiteId> {
        let ttl = self.ttl.as_secs();
        let stale: Vec<SiteId> = self
            .entries
            .values()
            .filter(|e| now.saturating_sub(e.last_updated) > ttl)
            .map(|e| e.site_id.clone())
            .collect();
        for site in &stale {
            self.entries.remove(site);
        }
        if !stale.is_empty() {
            debug!(evicted = stale.len(), "stale tracker entries evicted");
        }
        stale
    }

    /// Load entries from a snapshot, replacing any with the same site id.
    pub fn restore(&mut self, entries: impl IntoIterator<Item = SiteScavengingState>) {
        for entry in entries {
            self.entries.insert(entry.site_id.clone(), entry);
        }
    }

    pub fn get(&self, site_id: &str) -> Option<&SiteScavengingState> {
        self.entries.get(site_id)
    }

    pub fn sites(&self) -> impl Iterator<Item = &SiteScavengingState> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

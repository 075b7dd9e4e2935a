//! SimulatedWorld: an in-process control surface loaded from `world.toml`.
//!
//! ```toml
//! refuse_session = false
//!
//! [[sites]]
//! id = "v1"
//! units = { spear = 100, light = 230 }
//! stall_units = false          # unit observation never resolves
//!
//! [[sites.slots]]
//! level = 1
//! status = "busy"              # locked | unlocking | available | busy
//! remaining_text = "0:20:00"   # or `remaining = 1200`
//! reject_first = 0             # refuse the next N submissions
//! drop_first = 0               # accept the next N submissions without effect
//! ```
//!
//! Slots are exposed as raw signals and classified on observation, the way
//! a live provider would. Simulated time follows wall time, caught up at
//! each `open_session`; tests drive it explicitly with [`SimulatedWorld::advance`].

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::debug;

use scav_core::time::parse_remaining;
use scav_core::{
    ConfigError, SiteId, Slot, SlotLevel, SlotSignals, SlotStatus, UnitCounts, total_capacity,
};

use crate::provider::{BoxFuture, GameSession, GameStateProvider, SubmitReceipt};

#[derive(Debug, Default, Deserialize)]
struct WorldFile {
    #[serde(default)]
    refuse_session: bool,
    #[serde(default)]
    sites: Vec<SiteFile>,
}

#[derive(Debug, Deserialize)]
struct SiteFile {
    id: SiteId,
    #[serde(default)]
    units: UnitCounts,
    #[serde(default)]
    stall_units: bool,
    #[serde(default)]
    slots: Vec<SlotFile>,
}

#[derive(Debug, Deserialize)]
struct SlotFile {
    level: SlotLevel,
    status: SlotStatus,
    remaining: Option<u64>,
    remaining_text: Option<String>,
    #[serde(default)]
    reject_first: u32,
    #[serde(default)]
    drop_first: u32,
}

#[derive(Debug, Clone)]
struct SimSlot {
    status: SlotStatus,
    remaining: Option<u64>,
    reject_first: u32,
    drop_first: u32,
}

impl SimSlot {
    fn signals(&self) -> SlotSignals {
        SlotSignals {
            has_unlock_control: self.status == SlotStatus::Locked,
            is_unlocking: self.status == SlotStatus::Unlocking,
            has_start_control: self.status == SlotStatus::Available,
        }
    }
}

#[derive(Debug, Clone)]
struct SimSite {
    units: UnitCounts,
    stall_units: bool,
    slots: BTreeMap<SlotLevel, SimSlot>,
}

#[derive(Debug)]
struct WorldState {
    refuse_session: bool,
    sites: BTreeMap<SiteId, SimSite>,
    submissions: BTreeMap<(SiteId, SlotLevel), u32>,
    slot_observations: BTreeMap<SiteId, u32>,
    last_tick: Instant,
}

impl WorldState {
    fn advance(&mut self, secs: u64) {
        for site in self.sites.values_mut() {
            for slot in site.slots.values_mut() {
                if !slot.status.is_timed() {
                    continue;
                }
                let Some(left) = slot.remaining else { continue };
                let left = left.saturating_sub(secs);
                if left == 0 {
                    slot.status = SlotStatus::Available;
                    slot.remaining = None;
                } else {
                    slot.remaining = Some(left);
                }
            }
        }
    }

    fn site_mut(&mut self, site: &str) -> Result<&mut SimSite, String> {
        self.sites
            .get_mut(site)
            .ok_or_else(|| format!("unknown site {site}"))
    }

    fn submit(&mut self, site: &str, level: SlotLevel, units: &UnitCounts) -> Result<bool, String> {
        *self
            .submissions
            .entry((site.to_string(), level))
            .or_default() += 1;

        let sim = self.site_mut(site)?;
        let enough = units
            .iter()
            .all(|(t, &n)| sim.units.get(t).copied().unwrap_or(0) >= n);
        let slot = sim
            .slots
            .get_mut(&level)
            .ok_or_else(|| format!("site {site} has no slot {level}"))?;

        if slot.status != SlotStatus::Available {
            return Ok(false);
        }
        if slot.reject_first > 0 {
            slot.reject_first -= 1;
            return Ok(false);
        }
        if !enough {
            return Ok(false);
        }
        if slot.drop_first > 0 {
            slot.drop_first -= 1;
            debug!(%site, level, "simulated submission dropped");
            return Ok(true);
        }

        slot.status = SlotStatus::Busy;
        slot.remaining = Some(u64::from(level) * 900 + total_capacity(units) / 10);
        for (t, &n) in units {
            if let Some(have) = sim.units.get_mut(t) {
                *have -= n;
            }
        }
        Ok(true)
    }
}

/// Simulated fleet implementing [`GameStateProvider`].
#[derive(Clone)]
pub struct SimulatedWorld {
    state: Arc<Mutex<WorldState>>,
}

impl SimulatedWorld {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let world = Self::from_toml(&content)?;
        debug!(?path, "simulated world loaded");
        Ok(world)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: WorldFile = toml::from_str(content)?;
        let mut sites = BTreeMap::new();
        for site in file.sites {
            let mut slots = BTreeMap::new();
            for slot in site.slots {
                if slot.level == 0 || usize::from(slot.level) > scav_core::MAX_SLOTS {
                    return Err(ConfigError::Invalid(format!(
                        "site {}: slot level {} out of range",
                        site.id, slot.level
                    )));
                }
                let remaining = match (&slot.remaining_text, slot.remaining) {
                    (Some(text), _) => Some(parse_remaining(text).ok_or_else(|| {
                        ConfigError::Invalid(format!("site {}: bad remaining_text '{text}'", site.id))
                    })?),
                    (None, secs) => secs,
                };
                slots.insert(
                    slot.level,
                    SimSlot {
                        status: slot.status,
                        remaining,
                        reject_first: slot.reject_first,
                        drop_first: slot.drop_first,
                    },
                );
            }
            let sim = SimSite {
                units: site.units,
                stall_units: site.stall_units,
                slots,
            };
            if sites.insert(site.id.clone(), sim).is_some() {
                return Err(ConfigError::Invalid(format!("duplicate site {}", site.id)));
            }
        }

        Ok(Self {
            state: Arc::new(Mutex::new(WorldState {
                refuse_session: file.refuse_session,
                sites,
                submissions: BTreeMap::new(),
                slot_observations: BTreeMap::new(),
                last_tick: Instant::now(),
            })),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, WorldState>, String> {
        lock(&self.state)
    }

    /// Advance simulated time; timed slots reaching zero become available.
    pub fn advance(&self, secs: u64) {
        if let Ok(mut state) = self.lock() {
            state.advance(secs);
        }
    }

    pub fn set_refuse_session(&self, refuse: bool) {
        if let Ok(mut state) = self.lock() {
            state.refuse_session = refuse;
        }
    }

    /// Submissions received for one slot, accepted or not.
    pub fn submissions(&self, site: &str, level: SlotLevel) -> u32 {
        self.lock()
            .ok()
            .and_then(|s| s.submissions.get(&(site.to_string(), level)).copied())
            .unwrap_or(0)
    }

    /// `observe_slots` calls made for one site.
    pub fn slot_observations(&self, site: &str) -> u32 {
        self.lock()
            .ok()
            .and_then(|s| s.slot_observations.get(site).copied())
            .unwrap_or(0)
    }

    /// Current slots of one site, as an observer would see them.
    pub fn snapshot(&self, site: &str) -> Option<Vec<Slot>> {
        let state = self.lock().ok()?;
        state.sites.get(site).map(observe)
    }

    /// Current unit pool of one site.
    pub fn units(&self, site: &str) -> Option<UnitCounts> {
        let state = self.lock().ok()?;
        state.sites.get(site).map(|s| s.units.clone())
    }
}

impl GameStateProvider for SimulatedWorld {
    fn open_session(&self) -> BoxFuture<'_, Result<Box<dyn GameSession>, String>> {
        let result = self.lock().and_then(|mut state| {
            if state.refuse_session {
                return Err("simulated control surface refused the session".to_string());
            }
            let elapsed = state.last_tick.elapsed().as_secs();
            if elapsed > 0 {
                state.advance(elapsed);
                state.last_tick += Duration::from_secs(elapsed);
            }
            Ok(())
        });
        let state = Arc::clone(&self.state);
        Box::pin(async move {
            result?;
            Ok(Box::new(SimSession { state }) as Box<dyn GameSession>)
        })
    }
}

struct SimSession {
    state: Arc<Mutex<WorldState>>,
}

impl GameSession for SimSession {
    fn list_sites(&mut self) -> BoxFuture<'_, Result<Vec<SiteId>, String>> {
        let result = lock(&self.state).map(|s| s.sites.keys().cloned().collect());
        Box::pin(async move { result })
    }

    fn observe_slots<'a>(&'a mut self, site: &'a str) -> BoxFuture<'a, Result<Vec<Slot>, String>> {
        let result = lock(&self.state).and_then(|mut state| {
            *state.slot_observations.entry(site.to_string()).or_default() += 1;
            state
                .sites
                .get(site)
                .map(observe)
                .ok_or_else(|| format!("unknown site {site}"))
        });
        Box::pin(async move { result })
    }

    fn observe_available_units<'a>(
        &'a mut self,
        site: &'a str,
    ) -> BoxFuture<'a, Result<UnitCounts, String>> {
        let result = lock(&self.state).and_then(|state| {
            state
                .sites
                .get(site)
                .map(|s| (s.stall_units, s.units.clone()))
                .ok_or_else(|| format!("unknown site {site}"))
        });
        match result {
            Ok((true, _)) => Box::pin(std::future::pending::<Result<UnitCounts, String>>()),
            Ok((false, units)) => Box::pin(async move { Ok(units) }),
            Err(e) => Box::pin(async move { Err(e) }),
        }
    }

    fn submit_plan<'a>(
        &'a mut self,
        site: &'a str,
        level: SlotLevel,
        units: &'a UnitCounts,
    ) -> BoxFuture<'a, Result<SubmitReceipt, String>> {
        let result = lock(&self.state)
            .and_then(|mut state| state.submit(site, level, units))
            .map(|accepted| SubmitReceipt { accepted });
        Box::pin(async move { result })
    }

    fn reported_duration<'a>(
        &'a mut self,
        site: &'a str,
        level: SlotLevel,
    ) -> BoxFuture<'a, Result<u64, String>> {
        let result = lock(&self.state).map(|state| {
            state
                .sites
                .get(site)
                .and_then(|s| s.slots.get(&level))
                .filter(|slot| slot.status == SlotStatus::Busy)
                .and_then(|slot| slot.remaining)
                .unwrap_or(0)
        });
        Box::pin(async move { result })
    }
}

fn lock(state: &Mutex<WorldState>) -> Result<MutexGuard<'_, WorldState>, String> {
    state
        .lock()
        .map_err(|_| "simulated world state poisoned".to_string())
}

fn observe(site: &SimSite) -> Vec<Slot> {
    site.slots
        .iter()
        .map(|(&level, slot)| Slot::from_signals(level, &slot.signals(), slot.remaining))
        .collect()
}

//! Collaborator traits: the control surface and the configuration source.
//!
//! The control surface is stateful and single-threaded: one session is
//! opened per fleet pass and every call on it takes `&mut self`. Futures are
//! boxed so the traits stay object-safe and implementations can be swapped
//! at runtime (live provider, [`crate::SimulatedWorld`], test doubles).

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use scav_core::{ScavConfig, SiteId, SiteUnitSettings, Slot, SlotLevel, UnitCounts};
use scavgrid_planner::PlannerSettings;

/// Boxed future alias used by the collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Answer of the control surface to a submission.
///
/// `accepted` only means the command was taken; confirmation requires
/// re-observing the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub accepted: bool,
}

/// Source of control-surface sessions.
pub trait GameStateProvider: Send + Sync {
    /// Establish the single session used for a whole fleet pass.
    fn open_session(&self) -> BoxFuture<'_, Result<Box<dyn GameSession>, String>>;
}

/// One open session on the control surface.
///
/// Implementations translate raw external signals into typed [`Slot`]s
/// (see [`scav_core::SlotStatus::classify`]) and unit counts.
pub trait GameSession: Send {
    /// Sites reachable through this session.
    fn list_sites(&mut self) -> BoxFuture<'_, Result<Vec<SiteId>, String>>;

    /// Current status of every slot at `site`.
    fn observe_slots<'a>(&'a mut self, site: &'a str) -> BoxFuture<'a, Result<Vec<Slot>, String>>;

    /// Units currently available at `site`.
    fn observe_available_units<'a>(
        &'a mut self,
        site: &'a str,
    ) -> BoxFuture<'a, Result<UnitCounts, String>>;

    /// Commit `units` to the slot at `level`.
    fn submit_plan<'a>(
        &'a mut self,
        site: &'a str,
        level: SlotLevel,
        units: &'a UnitCounts,
    ) -> BoxFuture<'a, Result<SubmitReceipt, String>>;

    /// Duration of the running dispatch in seconds, 0 if unknown.
    fn reported_duration<'a>(
        &'a mut self,
        site: &'a str,
        level: SlotLevel,
    ) -> BoxFuture<'a, Result<u64, String>>;
}

/// Per-site unit settings and fleet-wide planner settings.
pub trait ConfigProvider: Send + Sync {
    /// Enable flags and limits for `site`, with fleet-wide fallback.
    fn site_units(&self, site: &str) -> SiteUnitSettings;

    fn planner_settings(&self) -> PlannerSettings;
}

impl ConfigProvider for ScavConfig {
    fn site_units(&self, site: &str) -> SiteUnitSettings {
        ScavConfig::site_units(self, site)
    }

    fn planner_settings(&self) -> PlannerSettings {
        PlannerSettings::from_config(self)
    }
}

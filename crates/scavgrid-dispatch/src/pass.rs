//! Fleet pass: one sweep over every site.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use scav_core::{SiteId, SlotLevel, SlotStatus, UnitCounts};
use scavgrid_planner::{NoPlan, PlanRequest, compute_plan};
use scavgrid_state::FleetTracker;

use crate::error::{DispatchError, DispatchResult};
use crate::executor::{ExecutorSettings, SiteDispatchResult, SiteExecutor, timed};
use crate::provider::{ConfigProvider, GameSession, GameStateProvider};

/// Why a site was not dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SiteSkip {
    /// No slot was available at pre-filter time.
    NoFreeSlots,
    /// No enabled unit type had a positive count.
    NoUnits,
    /// Slot observation failed or timed out.
    ObservationFailed { error: String },
    /// The planner produced nothing.
    NoEligiblePlan { cause: String },
}

impl From<NoPlan> for SiteSkip {
    fn from(cause: NoPlan) -> Self {
        SiteSkip::NoEligiblePlan {
            cause: cause.to_string(),
        }
    }
}

/// Everything a pass produced, apart from the tracker updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    /// Sites listed by the session.
    pub sites_seen: usize,
    /// One result per dispatched site, in visit order.
    pub results: Vec<SiteDispatchResult>,
    pub skipped: Vec<(SiteId, SiteSkip)>,
}

impl PassReport {
    pub fn confirmed(&self) -> u32 {
        self.results.iter().map(|r| r.confirmed).sum()
    }

    pub fn attempted(&self) -> u32 {
        self.results.iter().map(|r| r.attempted).sum()
    }

    pub fn result(&self, site: &str) -> Option<&SiteDispatchResult> {
        self.results.iter().find(|r| r.site_id == site)
    }

    pub fn skip_reason(&self, site: &str) -> Option<&SiteSkip> {
        self.skipped.iter().find(|(s, _)| s == site).map(|(_, r)| r)
    }
}

/// A site that survived the pre-filter.
struct Candidate {
    site: SiteId,
    free_slots: Vec<SlotLevel>,
    units: UnitCounts,
}

/// Drives one fleet pass over a provider.
pub struct FleetPass<'a> {
    provider: &'a dyn GameStateProvider,
    config: &'a dyn ConfigProvider,
    settings: ExecutorSettings,
    clock: fn() -> u64,
}

impl<'a> FleetPass<'a> {
    pub fn new(
        provider: &'a dyn GameStateProvider,
        config: &'a dyn ConfigProvider,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            provider,
            config,
            settings,
            clock: scav_core::time::epoch_secs,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    /// Run one pass. Only a failure to open the session is returned as an
    /// error; everything else lands in the report.
    pub async fn run(&self, tracker: &mut FleetTracker) -> DispatchResult<PassReport> {
        let mut session = match self.provider.open_session().await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "cannot open control surface session, pass aborted");
                return Err(DispatchError::ControlSurfaceUnavailable(e));
            }
        };

        let sites = match timed(self.settings.observation_timeout, session.list_sites()).await {
            Ok(sites) => sites,
            Err(e) => {
                warn!(error = %e, "site listing failed, no sites this pass");
                Vec::new()
            }
        };

        let mut report = PassReport {
            sites_seen: sites.len(),
            ..Default::default()
        };

        let mut candidates = Vec::new();
        for site in &sites {
            match self.prefilter(session.as_mut(), site, tracker).await {
                Ok(candidate) => candidates.push(candidate),
                Err(skip) => {
                    debug!(%site, ?skip, "site filtered out");
                    report.skipped.push((site.clone(), skip));
                }
            }
        }
        info!(
            sites = sites.len(),
            candidates = candidates.len(),
            "pre-filter complete"
        );

        let planner = self.config.planner_settings();
        for (idx, candidate) in candidates.iter().enumerate() {
            if idx > 0 && !self.settings.site_pacing.is_zero() {
                tokio::time::sleep(self.settings.site_pacing).await;
            }

            let unit_settings = self.config.site_units(&candidate.site);
            let request = PlanRequest {
                available: &candidate.units,
                free_slots: &candidate.free_slots,
                enabled: &unit_settings.enabled,
                limits: &unit_settings.limits,
            };
            let plan = match compute_plan(&request, &planner) {
                Ok(plan) => plan,
                Err(cause) => {
                    info!(site = %candidate.site, %cause, "no eligible plan, site skipped");
                    report.skipped.push((candidate.site.clone(), cause.into()));
                    continue;
                }
            };

            let result = SiteExecutor::new(session.as_mut(), &self.settings)
                .with_clock(self.clock)
                .dispatch(&candidate.site, &plan, tracker)
                .await;
            report.results.push(result);
        }

        info!(
            sites = report.sites_seen,
            dispatched = report.results.len(),
            confirmed = report.confirmed(),
            attempted = report.attempted(),
            "fleet pass finished"
        );
        Ok(report)
    }

    /// Observe one site, overwrite its tracker entry and decide whether it
    /// is worth dispatching.
    async fn prefilter(
        &self,
        session: &mut dyn GameSession,
        site: &str,
        tracker: &mut FleetTracker,
    ) -> Result<Candidate, SiteSkip> {
        let timeout = self.settings.observation_timeout;

        let slots = match timed(timeout, session.observe_slots(site)).await {
            Ok(slots) => slots,
            Err(e) => {
                warn!(%site, error = %e, "slot observation failed");
                return Err(SiteSkip::ObservationFailed {
                    error: e.to_string(),
                });
            }
        };

        let units = match timed(timeout, session.observe_available_units(site)).await {
            Ok(units) => units,
            Err(e) => {
                warn!(%site, error = %e, "unit observation failed, treating as no units");
                UnitCounts::new()
            }
        };

        let entry = tracker.observe(site, &slots, (self.clock)());
        let free_slots: Vec<SlotLevel> = entry
            .slots
            .iter()
            .filter(|r| r.status == SlotStatus::Available)
            .map(|r| r.level)
            .collect();
        if free_slots.is_empty() {
            return Err(SiteSkip::NoFreeSlots);
        }

        let enabled = self.config.site_units(site).enabled;
        let has_units = units
            .iter()
            .any(|(t, &n)| n > 0 && enabled.get(t).copied().unwrap_or(false));
        if !has_units {
            return Err(SiteSkip::NoUnits);
        }

        Ok(Candidate {
            site: site.to_string(),
            free_slots,
            units,
        })
    }
}

//! Site executor: the two-round submit/verify protocol for one site.
//!
//! Per slot with a nonzero plan:
//!
//! ```text
//! PENDING ──observe──► not available (≤ attempts) ──► SKIPPED
//!    │
//!    └─available──► submit ──► SUBMITTED ──re-observe──► busy ──► CONFIRMED
//!                                               │
//!                                               └─other──► ROUND2_PENDING
//!
//! ROUND2_PENDING ──submit──► re-observe ──► busy ──► CONFIRMED
//!                                      └──other──► FAILED
//! ```
//!
//! Round two runs once, after every slot has had its first attempt, in
//! ascending level order and without the availability wait.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use scav_core::config::DispatchConfig;
use scav_core::{SiteId, SlotLevel, SlotStatus, UnitCounts};
use scavgrid_planner::DispatchPlan;
use scavgrid_state::FleetTracker;

use crate::error::{DispatchError, DispatchResult};
use crate::provider::{BoxFuture, GameSession};

/// Timing knobs for the executor and the pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorSettings {
    /// Observations made while waiting for a slot to be available.
    pub availability_attempts: u32,
    /// Delay between availability observations.
    pub retry_delay: Duration,
    /// Delay between a submission and its verification.
    pub confirm_delay: Duration,
    /// Upper bound for any single control-surface call.
    pub observation_timeout: Duration,
    /// Delay inserted between sites.
    pub site_pacing: Duration,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}

impl ExecutorSettings {
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            availability_attempts: config.availability_attempts.max(1),
            retry_delay: config.retry_delay(),
            confirm_delay: config.confirm(),
            observation_timeout: config.timeout(),
            site_pacing: config.pacing(),
        }
    }

    /// No delays at all; used by tests and the planner CLI.
    pub fn immediate() -> Self {
        Self {
            availability_attempts: 3,
            retry_delay: Duration::ZERO,
            confirm_delay: Duration::ZERO,
            observation_timeout: Duration::from_secs(1),
            site_pacing: Duration::ZERO,
        }
    }
}

/// Final state of one planned slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SlotOutcome {
    /// The slot went busy after the submission in `round`.
    Confirmed { round: u8, duration_secs: u64 },
    /// Nothing was committed.
    Skipped { reason: String },
    /// Both rounds failed to confirm.
    Failed { reason: String },
}

impl SlotOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, SlotOutcome::Confirmed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotReport {
    pub level: SlotLevel,
    pub units: UnitCounts,
    pub outcome: SlotOutcome,
}

/// Result of dispatching one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteDispatchResult {
    pub site_id: SiteId,
    /// Slots that ended `Confirmed`.
    pub confirmed: u32,
    /// Slots that had a nonzero plan.
    pub attempted: u32,
    /// Ordered by level.
    pub slots: Vec<SlotReport>,
}

impl SiteDispatchResult {
    pub fn outcome(&self, level: SlotLevel) -> Option<&SlotOutcome> {
        self.slots.iter().find(|s| s.level == level).map(|s| &s.outcome)
    }
}

/// Outcome of a single submit + verify attempt.
enum Attempt {
    Confirmed { duration_secs: u64 },
    Unconfirmed { reason: String },
}

/// Runs the two-round protocol against one open session.
pub struct SiteExecutor<'a> {
    session: &'a mut dyn GameSession,
    settings: &'a ExecutorSettings,
    clock: fn() -> u64,
}

impl<'a> SiteExecutor<'a> {
    pub fn new(session: &'a mut dyn GameSession, settings: &'a ExecutorSettings) -> Self {
        Self {
            session,
            settings,
            clock: scav_core::time::epoch_secs,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    /// Carry out `plan` at `site`, updating `tracker` for every confirmed slot.
    pub async fn dispatch(
        &mut self,
        site: &str,
        plan: &DispatchPlan,
        tracker: &mut FleetTracker,
    ) -> SiteDispatchResult {
        let mut reports: BTreeMap<SlotLevel, SlotReport> = BTreeMap::new();
        let mut round2: Vec<(SlotLevel, String)> = Vec::new();
        let mut attempted = 0u32;
        let mut confirmed = 0u32;

        // Round 1.
        for (&level, units) in &plan.slots {
            if !plan.has_units(level) {
                debug!(%site, level, "empty plan, slot skipped");
                reports.insert(level, report(level, units, skipped("empty plan")));
                continue;
            }
            attempted += 1;

            if let Err(reason) = self.wait_available(site, level).await {
                debug!(%site, level, %reason, "slot skipped");
                reports.insert(level, report(level, units, skipped(&reason)));
                continue;
            }

            match self.attempt(site, level, units).await {
                Attempt::Confirmed { duration_secs } => {
                    confirmed += 1;
                    tracker.record_dispatch(site, level, duration_secs, (self.clock)());
                    info!(%site, level, round = 1, duration_secs, "dispatch confirmed");
                    reports.insert(
                        level,
                        report(level, units, SlotOutcome::Confirmed { round: 1, duration_secs }),
                    );
                }
                Attempt::Unconfirmed { reason } => {
                    debug!(%site, level, %reason, "dispatch unconfirmed, queued for round 2");
                    round2.push((level, reason));
                }
            }
        }

        // Round 2.
        round2.sort_by_key(|(level, _)| *level);
        for (level, first_reason) in round2 {
            let Some(units) = plan.get(level) else { continue };
            let outcome = match self.attempt(site, level, units).await {
                Attempt::Confirmed { duration_secs } => {
                    confirmed += 1;
                    tracker.record_dispatch(site, level, duration_secs, (self.clock)());
                    info!(%site, level, round = 2, duration_secs, "dispatch confirmed");
                    SlotOutcome::Confirmed { round: 2, duration_secs }
                }
                Attempt::Unconfirmed { reason } => {
                    warn!(%site, level, %first_reason, %reason, "dispatch failed after retry");
                    SlotOutcome::Failed {
                        reason: format!("round 1: {first_reason}; round 2: {reason}"),
                    }
                }
            };
            reports.insert(level, report(level, units, outcome));
        }

        info!(%site, confirmed, attempted, "site dispatch finished");
        SiteDispatchResult {
            site_id: site.to_string(),
            confirmed,
            attempted,
            slots: reports.into_values().collect(),
        }
    }

    /// Observe until the slot is available, at most `availability_attempts` times.
    async fn wait_available(&mut self, site: &str, level: SlotLevel) -> Result<(), String> {
        let attempts = self.settings.availability_attempts.max(1);
        let mut last = String::from("not observed");
        for attempt in 1..=attempts {
            match self.slot_status(site, level).await {
                Ok(SlotStatus::Available) => return Ok(()),
                Ok(status) => last = status.label().to_string(),
                Err(e) => last = e.to_string(),
            }
            if attempt < attempts {
                debug!(%site, level, attempt, status = %last, "slot not available, retrying");
                tokio::time::sleep(self.settings.retry_delay).await;
            }
        }
        Err(format!("not available after {attempts} observations (last: {last})"))
    }

    /// Submit once and verify by re-observation.
    async fn attempt(&mut self, site: &str, level: SlotLevel, units: &UnitCounts) -> Attempt {
        let timeout = self.settings.observation_timeout;
        match timed(timeout, self.session.submit_plan(site, level, units)).await {
            Ok(receipt) if receipt.accepted => {}
            Ok(_) => {
                let err = DispatchError::SubmissionRejected {
                    site: site.to_string(),
                    level,
                };
                warn!(%site, level, "{err}");
                return Attempt::Unconfirmed { reason: err.to_string() };
            }
            Err(e) => {
                warn!(%site, level, error = %e, "submission failed");
                return Attempt::Unconfirmed { reason: e.to_string() };
            }
        }

        if !self.settings.confirm_delay.is_zero() {
            tokio::time::sleep(self.settings.confirm_delay).await;
        }

        match self.slot_status(site, level).await {
            Ok(SlotStatus::Busy) => {
                let duration_secs =
                    match timed(timeout, self.session.reported_duration(site, level)).await {
                        Ok(secs) => secs,
                        Err(e) => {
                            debug!(%site, level, error = %e, "duration unknown");
                            0
                        }
                    };
                Attempt::Confirmed { duration_secs }
            }
            Ok(SlotStatus::Available) => Attempt::Unconfirmed {
                reason: "slot still available after submission".into(),
            },
            Ok(status) => Attempt::Unconfirmed {
                reason: format!("ambiguous status after submission: {}", status.label()),
            },
            Err(e) => Attempt::Unconfirmed {
                reason: format!("verification failed: {e}"),
            },
        }
    }

    /// Status of one slot; a missing slot counts as unavailable.
    async fn slot_status(&mut self, site: &str, level: SlotLevel) -> DispatchResult<SlotStatus> {
        let timeout = self.settings.observation_timeout;
        let slots = timed(timeout, self.session.observe_slots(site)).await?;
        slots
            .iter()
            .find(|s| s.level == level)
            .map(|s| s.status)
            .ok_or_else(|| DispatchError::Provider(format!("slot {level} not reported")))
    }
}

/// Await a session call with an upper bound.
pub(crate) async fn timed<T>(
    timeout: Duration,
    fut: BoxFuture<'_, Result<T, String>>,
) -> DispatchResult<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(DispatchError::Provider(e)),
        Err(_) => Err(DispatchError::ObservationTimeout(timeout)),
    }
}

fn report(level: SlotLevel, units: &UnitCounts, outcome: SlotOutcome) -> SlotReport {
    SlotReport {
        level,
        units: units.clone(),
        outcome,
    }
}

fn skipped(reason: &str) -> SlotOutcome {
    SlotOutcome::Skipped {
        reason: reason.to_string(),
    }
}

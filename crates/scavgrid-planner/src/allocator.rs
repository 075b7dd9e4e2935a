//! Proportional allocator with per-slot capacity ceilings.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use scav_core::{EnabledUnits, SlotLevel, UnitCounts, UnitLimits, total_capacity};

use crate::settings::PlannerSettings;

/// Inputs for one planning pass at one site.
#[derive(Debug, Clone, Copy)]
pub struct PlanRequest<'a> {
    pub available: &'a UnitCounts,
    /// Levels currently observed as available.
    pub free_slots: &'a [SlotLevel],
    pub enabled: &'a EnabledUnits,
    pub limits: &'a UnitLimits,
}

/// Why the planner produced nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NoPlan {
    #[error("no free slot with a defined weight")]
    NoEligibleSlots,
    #[error("eligible slot weights sum to zero")]
    ZeroWeight,
    #[error("no enabled unit type is available")]
    NoEligibleUnits,
}

/// Units per type to commit to each eligible slot.
///
/// Ineligible levels are absent. A present level whose counts are all zero
/// means "skip this slot".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchPlan {
    pub slots: BTreeMap<SlotLevel, UnitCounts>,
}

impl DispatchPlan {
    pub fn get(&self, level: SlotLevel) -> Option<&UnitCounts> {
        self.slots.get(&level)
    }

    /// Levels in ascending order.
    pub fn levels(&self) -> impl Iterator<Item = SlotLevel> + '_ {
        self.slots.keys().copied()
    }

    /// Whether the plan commits at least one unit to `level`.
    pub fn has_units(&self, level: SlotLevel) -> bool {
        self.slots
            .get(&level)
            .is_some_and(|counts| counts.values().any(|&n| n > 0))
    }

    /// Total units of one type across all slots.
    pub fn total_of(&self, unit: scav_core::ResourceType) -> u64 {
        self.slots
            .values()
            .filter_map(|c| c.get(&unit))
            .map(|&n| u64::from(n))
            .sum()
    }
}

/// Compute the dispatch plan for one site.
pub fn compute_plan(req: &PlanRequest<'_>, settings: &PlannerSettings) -> Result<DispatchPlan, NoPlan> {
    let free: BTreeSet<SlotLevel> = req.free_slots.iter().copied().collect();
    let skip_first = settings.skip_level_1 && free.len() > 1;

    let eligible: Vec<(SlotLevel, u32)> = free
        .iter()
        .filter(|&&level| !(skip_first && level == 1))
        .filter_map(|&level| settings.weight(level).map(|w| (level, w)))
        .collect();
    if eligible.is_empty() {
        return Err(NoPlan::NoEligibleSlots);
    }
    let total_weight: u64 = eligible.iter().map(|&(_, w)| u64::from(w)).sum();
    if total_weight == 0 {
        return Err(NoPlan::ZeroWeight);
    }

    let effective: UnitCounts = req
        .available
        .iter()
        .filter(|&(unit, &n)| n > 0 && req.enabled.get(unit).copied().unwrap_or(false))
        .map(|(&unit, &n)| {
            let capped = req.limits.get(&unit).map_or(n, |&limit| n.min(limit));
            (unit, capped)
        })
        .collect();
    if effective.is_empty() {
        return Err(NoPlan::NoEligibleUnits);
    }

    let ceiling = settings.slot_ceiling(eligible.len());
    let mut plan = DispatchPlan::default();

    for &(level, weight) in &eligible {
        let mut counts: UnitCounts = effective
            .iter()
            .map(|(&unit, &n)| {
                let share = u64::from(n) * u64::from(weight) / total_weight;
                (unit, share as u32)
            })
            .collect();

        let capacity = total_capacity(&counts);
        if capacity as f64 > ceiling {
            // Capacity is taken once, before any count is scaled.
            let total = capacity as f64;
            for n in counts.values_mut() {
                *n = (f64::from(*n) * ceiling / total).floor() as u32;
            }
            debug!(level, capacity, ceiling, ratio = ceiling / total, "slot capped to ceiling");
        }

        plan.slots.insert(level, counts);
    }

    debug!(
        slots = plan.slots.len(),
        total_weight,
        ceiling,
        "dispatch plan computed"
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use scav_core::ResourceType::{self, *};

    use super::*;

    fn all_enabled() -> EnabledUnits {
        ResourceType::ALL.into_iter().map(|t| (t, true)).collect()
    }

    fn settings(base: u64) -> PlannerSettings {
        PlannerSettings {
            base_max_resources: base,
            ..Default::default()
        }
    }

    fn plan(
        available: &UnitCounts,
        free: &[SlotLevel],
        limits: &UnitLimits,
        settings: &PlannerSettings,
    ) -> Result<DispatchPlan, NoPlan> {
        let enabled = all_enabled();
        compute_plan(
            &PlanRequest {
                available,
                free_slots: free,
                enabled: &enabled,
                limits,
            },
            settings,
        )
    }

    fn count(plan: &DispatchPlan, level: SlotLevel, unit: ResourceType) -> u32 {
        plan.get(level).and_then(|c| c.get(&unit)).copied().unwrap_or(0)
    }

    #[test]
    fn three_slots_exact_split() {
        let available = UnitCounts::from([(Light, 230)]);
        let p = plan(&available, &[1, 2, 3], &UnitLimits::new(), &settings(99_999)).unwrap();
        assert_eq!(count(&p, 1, Light), 150);
        assert_eq!(count(&p, 2, Light), 60);
        assert_eq!(count(&p, 3, Light), 20);
        assert_eq!(p.total_of(Light), 230);
    }

    #[test]
    fn skip_level_1_excludes_slot_entirely() {
        let available = UnitCounts::from([(Light, 230)]);
        let s = PlannerSettings {
            skip_level_1: true,
            ..settings(99_999)
        };
        let p = plan(&available, &[1, 2, 3, 4], &UnitLimits::new(), &s).unwrap();

        assert!(p.get(1).is_none());
        let levels: Vec<_> = p.levels().collect();
        assert_eq!(levels, vec![2, 3, 4]);
        // Weights 6 + 2 + 1 = 9.
        assert_eq!(count(&p, 2, Light), 230 * 6 / 9);
        assert_eq!(count(&p, 3, Light), 230 * 2 / 9);
        assert_eq!(count(&p, 4, Light), 230 / 9);
    }

    #[test]
    fn skip_level_1_keeps_it_when_alone() {
        let available = UnitCounts::from([(Spear, 10)]);
        let s = PlannerSettings {
            skip_level_1: true,
            ..settings(99_999)
        };
        let p = plan(&available, &[1], &UnitLimits::new(), &s).unwrap();
        assert_eq!(count(&p, 1, Spear), 10);
    }

    #[test]
    fn single_slot_uncapped() {
        let available = UnitCounts::from([(Spear, 100)]);
        let p = plan(&available, &[2], &UnitLimits::new(), &settings(99_999)).unwrap();
        assert_eq!(count(&p, 2, Spear), 100);
    }

    #[test]
    fn ceiling_scales_counts_down() {
        // Ceiling 1000 * 10 = 10_000; raw capacity 25_000 + 8_000.
        let available = UnitCounts::from([(Spear, 1000), (Light, 100)]);
        let p = plan(&available, &[1], &UnitLimits::new(), &settings(1000)).unwrap();
        assert_eq!(count(&p, 1, Spear), 303);
        assert_eq!(count(&p, 1, Light), 30);
        assert!(total_capacity(p.get(1).unwrap()) <= 10_000);
    }

    #[test]
    fn exact_cap_quotient_is_not_floored_away() {
        // Ceiling 5 * 10 = 50; capacity 49 * 25 = 1225; 49 * 50 / 1225 = 2.
        let available = UnitCounts::from([(Spear, 49)]);
        let p = plan(&available, &[1], &UnitLimits::new(), &settings(5)).unwrap();
        assert_eq!(count(&p, 1, Spear), 2);

        // Every exact quotient survives the floor.
        for n in 1..=200u32 {
            let available = UnitCounts::from([(Spear, n)]);
            let p = plan(&available, &[1], &UnitLimits::new(), &settings(5)).unwrap();
            let capacity = u64::from(n) * 25;
            let expected = if capacity > 50 {
                u64::from(n) * 50 / capacity
            } else {
                u64::from(n)
            };
            assert_eq!(u64::from(count(&p, 1, Spear)), expected, "spear = {n}");
        }
    }

    #[test]
    fn limits_cap_effective_counts() {
        let available = UnitCounts::from([(Spear, 500), (Axe, 40)]);
        let limits = UnitLimits::from([(Spear, 100), (Axe, 1000)]);
        let p = plan(&available, &[1], &limits, &settings(99_999)).unwrap();
        assert_eq!(count(&p, 1, Spear), 100);
        assert_eq!(count(&p, 1, Axe), 40);
    }

    #[test]
    fn disabled_and_empty_types_are_ignored() {
        let available = UnitCounts::from([(Spear, 50), (Sword, 0), (Heavy, 10)]);
        let enabled = EnabledUnits::from([(Spear, true), (Sword, true), (Heavy, false)]);
        let limits = UnitLimits::new();
        let p = compute_plan(
            &PlanRequest {
                available: &available,
                free_slots: &[1],
                enabled: &enabled,
                limits: &limits,
            },
            &settings(99_999),
        )
        .unwrap();
        let slot = p.get(1).unwrap();
        assert_eq!(slot.get(&Spear), Some(&50));
        assert!(!slot.contains_key(&Sword));
        assert!(!slot.contains_key(&Heavy));
    }

    #[test]
    fn no_eligible_units() {
        let available = UnitCounts::from([(Spear, 0)]);
        let err = plan(&available, &[1, 2], &UnitLimits::new(), &settings(99_999)).unwrap_err();
        assert_eq!(err, NoPlan::NoEligibleUnits);
    }

    #[test]
    fn no_free_slots() {
        let available = UnitCounts::from([(Spear, 10)]);
        let err = plan(&available, &[], &UnitLimits::new(), &settings(99_999)).unwrap_err();
        assert_eq!(err, NoPlan::NoEligibleSlots);
    }

    #[test]
    fn levels_without_weight_are_dropped() {
        let available = UnitCounts::from([(Spear, 10)]);
        let s = PlannerSettings {
            slot_weights: BTreeMap::from([(1, 15)]),
            ..settings(99_999)
        };
        let err = plan(&available, &[2, 3], &UnitLimits::new(), &s).unwrap_err();
        assert_eq!(err, NoPlan::NoEligibleSlots);
    }

    #[test]
    fn zero_weights_yield_no_plan() {
        let available = UnitCounts::from([(Spear, 10)]);
        let s = PlannerSettings {
            slot_weights: BTreeMap::from([(1, 0), (2, 0)]),
            ..settings(99_999)
        };
        let err = plan(&available, &[1, 2], &UnitLimits::new(), &s).unwrap_err();
        assert_eq!(err, NoPlan::ZeroWeight);
    }

    #[test]
    fn small_counts_floor_to_zero_plan() {
        let available = UnitCounts::from([(Spear, 1)]);
        let p = plan(&available, &[1, 2], &UnitLimits::new(), &settings(99_999)).unwrap();
        // 1 * 15 / 21 = 0, 1 * 6 / 21 = 0.
        assert!(!p.has_units(1));
        assert!(!p.has_units(2));
        assert!(p.get(1).is_some());
    }

    #[test]
    fn monotonic_in_available_count() {
        let s = settings(2000);
        let mut previous: Option<DispatchPlan> = None;
        for n in (0..=3000).step_by(37) {
            let available = UnitCounts::from([(Spear, n), (Light, 120)]);
            let Ok(p) = plan(&available, &[1, 2, 3, 4], &UnitLimits::new(), &s) else {
                continue;
            };
            if let Some(prev) = &previous {
                for level in p.levels() {
                    assert!(
                        count(&p, level, Spear) >= count(prev, level, Spear),
                        "spear on level {level} decreased at n={n}"
                    );
                }
            }
            previous = Some(p);
        }
    }

    #[test]
    fn conservation_and_capacity_bounds() {
        let s = settings(500);
        let available = UnitCounts::from([(Spear, 777), (Sword, 333), (Light, 91), (Heavy, 12)]);
        let limits = UnitLimits::from([(Sword, 300)]);
        for free in [&[1u8][..], &[1, 2], &[1, 2, 3], &[1, 2, 3, 4]] {
            let p = plan(&available, free, &limits, &s).unwrap();
            let ceiling = s.slot_ceiling(free.len());

            assert!(p.total_of(Spear) <= 777);
            assert!(p.total_of(Sword) <= 300);
            assert!(p.total_of(Light) <= 91);
            assert!(p.total_of(Heavy) <= 12);
            for level in p.levels() {
                assert!(total_capacity(p.get(level).unwrap()) as f64 <= ceiling);
            }
        }
    }

    #[test]
    fn plan_serializes_with_type_names() {
        let available = UnitCounts::from([(Light, 10)]);
        let p = plan(&available, &[1], &UnitLimits::new(), &settings(99_999)).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"slots":{"1":{"light":10}}}"#);
    }
}

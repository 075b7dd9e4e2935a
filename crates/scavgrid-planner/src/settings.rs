//! Planner settings and their derivation from `scavgrid.toml`.

use std::collections::BTreeMap;

use scav_core::{ScavConfig, SlotLevel};

/// Fleet-wide knobs the planner needs.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerSettings {
    pub skip_level_1: bool,
    pub base_max_resources: u64,
    /// Weight per level. Levels without a weight are never planned.
    pub slot_weights: BTreeMap<SlotLevel, u32>,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            skip_level_1: false,
            base_max_resources: 99_999,
            slot_weights: BTreeMap::from([(1, 15), (2, 6), (3, 2), (4, 1)]),
        }
    }
}

impl PlannerSettings {
    pub fn from_config(config: &ScavConfig) -> Self {
        let slot_weights = config
            .fleet
            .slot_weights
            .iter()
            .enumerate()
            .filter_map(|(idx, &w)| {
                let level = SlotLevel::try_from(idx + 1).ok()?;
                Some((level, w))
            })
            .collect();
        Self {
            skip_level_1: config.fleet.skip_level_1,
            base_max_resources: config.fleet.base_max_resources,
            slot_weights,
        }
    }

    pub fn weight(&self, level: SlotLevel) -> Option<u32> {
        self.slot_weights.get(&level).copied()
    }

    /// Multiplier applied to `base_max_resources` for a given number of
    /// eligible slots.
    pub fn scale_factor(eligible_slots: usize) -> f64 {
        match eligible_slots {
            0 | 1 => 10.0,
            2 => 4.0,
            3 => 2.0,
            _ => 1.3333,
        }
    }

    /// Per-slot capacity ceiling for a given number of eligible slots.
    pub fn slot_ceiling(&self, eligible_slots: usize) -> f64 {
        self.base_max_resources as f64 * Self::scale_factor(eligible_slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_default_config() {
        let settings = PlannerSettings::from_config(&ScavConfig::default());
        assert_eq!(settings, PlannerSettings::default());
    }

    #[test]
    fn short_weight_list_leaves_levels_undefined() {
        let config = ScavConfig::parse("[fleet]\nslot_weights = [15, 6]\n").unwrap();
        let settings = PlannerSettings::from_config(&config);
        assert_eq!(settings.weight(2), Some(6));
        assert_eq!(settings.weight(3), None);
    }

    #[test]
    fn scale_factor_table() {
        assert_eq!(PlannerSettings::scale_factor(1), 10.0);
        assert_eq!(PlannerSettings::scale_factor(2), 4.0);
        assert_eq!(PlannerSettings::scale_factor(3), 2.0);
        assert_eq!(PlannerSettings::scale_factor(4), 1.3333);
        assert_eq!(PlannerSettings::scale_factor(7), 1.3333);
    }

    #[test]
    fn ceiling_scales_base() {
        let settings = PlannerSettings {
            base_max_resources: 1000,
            ..Default::default()
        };
        assert_eq!(settings.slot_ceiling(1), 10_000.0);
        assert_eq!(settings.slot_ceiling(3), 2000.0);
    }
}

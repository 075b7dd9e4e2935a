//! Resource types and unit counts shared across scavgrid crates.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a site (village) in the fleet.
pub type SiteId = String;

/// Count of units per resource type.
///
/// Missing keys mean zero. A `BTreeMap` keeps iteration order stable so
/// plans and logs are deterministic.
pub type UnitCounts = BTreeMap<ResourceType, u32>;

/// Optional per-type maximum to commit in one planning pass.
pub type UnitLimits = BTreeMap<ResourceType, u32>;

/// Per-type enable flags. Missing keys mean disabled.
pub type EnabledUnits = BTreeMap<ResourceType, bool>;

/// A typed, consumable unit category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Spear,
    Sword,
    Axe,
    Archer,
    Light,
    Marcher,
    Heavy,
}

impl ResourceType {
    /// Every resource type, in declaration order.
    pub const ALL: [ResourceType; 7] = [
        ResourceType::Spear,
        ResourceType::Sword,
        ResourceType::Axe,
        ResourceType::Archer,
        ResourceType::Light,
        ResourceType::Marcher,
        ResourceType::Heavy,
    ];

    /// Resource-equivalent weight a single committed unit contributes.
    pub fn capacity(self) -> u64 {
        match self {
            ResourceType::Spear => 25,
            ResourceType::Sword => 15,
            ResourceType::Axe => 10,
            ResourceType::Archer => 10,
            ResourceType::Light => 80,
            ResourceType::Marcher => 50,
            ResourceType::Heavy => 50,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ResourceType::Spear => "spear",
            ResourceType::Sword => "sword",
            ResourceType::Axe => "axe",
            ResourceType::Archer => "archer",
            ResourceType::Light => "light",
            ResourceType::Marcher => "marcher",
            ResourceType::Heavy => "heavy",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ResourceType::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown resource type: {s}"))
    }
}

/// Sum of `count * capacity` across all types.
pub fn total_capacity(counts: &UnitCounts) -> u64 {
    counts
        .iter()
        .map(|(t, &n)| u64::from(n) * t.capacity())
        .sum()
}

/// Parse a `type=count` list such as `spear=100,light=230`.
pub fn parse_unit_list(s: &str) -> Result<UnitCounts, String> {
    let mut counts = UnitCounts::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, value) = part
            .split_once('=')
            .ok_or_else(|| format!("expected type=count, got '{part}'"))?;
        let unit: ResourceType = name.parse()?;
        let count: u32 = value
            .trim()
            .parse()
            .map_err(|e| format!("invalid count for {unit}: {e}"))?;
        *counts.entry(unit).or_insert(0) += count;
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacities_match_reference_domain() {
        assert_eq!(ResourceType::Spear.capacity(), 25);
        assert_eq!(ResourceType::Light.capacity(), 80);
        assert_eq!(ResourceType::Heavy.capacity(), 50);
    }

    #[test]
    fn parse_resource_type_case_insensitive() {
        assert_eq!("Light".parse::<ResourceType>(), Ok(ResourceType::Light));
        assert!("knight".parse::<ResourceType>().is_err());
    }

    #[test]
    fn parse_unit_list_sums_duplicates() {
        let counts = parse_unit_list("spear=100, light=230,spear=5").unwrap();
        assert_eq!(counts.get(&ResourceType::Spear), Some(&105));
        assert_eq!(counts.get(&ResourceType::Light), Some(&230));
    }

    #[test]
    fn parse_unit_list_rejects_garbage() {
        assert!(parse_unit_list("spear").is_err());
        assert!(parse_unit_list("spear=-1").is_err());
    }

    #[test]
    fn total_capacity_weights_by_type() {
        let counts = UnitCounts::from([(ResourceType::Spear, 4), (ResourceType::Light, 1)]);
        assert_eq!(total_capacity(&counts), 4 * 25 + 80);
    }

    #[test]
    fn serde_uses_snake_case_names() {
        let json = serde_json::to_string(&ResourceType::Marcher).unwrap();
        assert_eq!(json, "\"marcher\"");
    }
}

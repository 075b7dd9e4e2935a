use std::path::Path;

use scav_core::{SlotLevel, parse_unit_list};
use scavgrid_planner::{PlanRequest, PlannerSettings, compute_plan};
use serde_json::json;

use super::load_config;

pub fn plan(
    config_path: Option<&Path>,
    units: &str,
    free: &[SlotLevel],
    site: Option<&str>,
) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let available = parse_unit_list(units).map_err(anyhow::Error::msg)?;

    // An unknown site id resolves to the fleet defaults.
    let site_units = config.site_units(site.unwrap_or_default());
    let settings = PlannerSettings::from_config(&config);
    let request = PlanRequest {
        available: &available,
        free_slots: free,
        enabled: &site_units.enabled,
        limits: &site_units.limits,
    };

    let output = match compute_plan(&request, &settings) {
        Ok(plan) => serde_json::to_value(&plan)?,
        Err(reason) => json!({ "no_plan": reason.to_string() }),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

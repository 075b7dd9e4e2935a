//! Config, planner and estimator wired the way the daemon wires them.

use std::time::Duration;

use scav_core::{ResourceType, ScavConfig, Slot, SlotStatus, UnitCounts};
use scavgrid_dispatch::{ExecutorSettings, FleetPass, SimulatedWorld};
use scavgrid_planner::{PlanRequest, PlannerSettings, compute_plan};
use scavgrid_poll::{PollSettings, Poller, estimate_next_poll};
use scavgrid_state::{FleetTracker, SnapshotStore};

const CONFIG: &str = r#"
[fleet]
limits = { light = 100 }

[sites.v2]
units = { light = false }

[dispatch]
availability_retry_delay = "0s"
confirm_delay = "0s"
site_pacing = "0s"

[poll]
min_delay = "1m"
"#;

#[test]
fn site_overrides_reach_the_planner() {
    let config = ScavConfig::parse(CONFIG).unwrap();
    let settings = PlannerSettings::from_config(&config);
    let available = UnitCounts::from([(ResourceType::Light, 230), (ResourceType::Spear, 30)]);

    let v1 = config.site_units("v1");
    let plan = compute_plan(
        &PlanRequest {
            available: &available,
            free_slots: &[1],
            enabled: &v1.enabled,
            limits: &v1.limits,
        },
        &settings,
    )
    .unwrap();
    assert_eq!(plan.total_of(ResourceType::Light), 100);

    let v2 = config.site_units("v2");
    let plan = compute_plan(
        &PlanRequest {
            available: &available,
            free_slots: &[1],
            enabled: &v2.enabled,
            limits: &v2.limits,
        },
        &settings,
    )
    .unwrap();
    assert_eq!(plan.total_of(ResourceType::Light), 0);
    assert_eq!(plan.total_of(ResourceType::Spear), 30);
}

#[test]
fn restored_snapshot_drives_the_estimate() {
    let store = SnapshotStore::open_in_memory().unwrap();
    let mut tracker = FleetTracker::new(Duration::from_secs(3600));
    tracker.observe("v1", &[Slot::new(1, SlotStatus::Busy).with_remaining(900)], 1000);
    store.save_tracker(&tracker).unwrap();

    let mut restored = FleetTracker::new(Duration::from_secs(3600));
    restored.restore(store.load_all().unwrap());

    let settings = PollSettings::from_config(&ScavConfig::parse(CONFIG).unwrap());
    let estimate = estimate_next_poll(&restored, 1600, &settings.estimator);
    assert_eq!(estimate, Some(300));
    assert_eq!(settings.delay_for(estimate), Duration::from_secs(300));
    assert_eq!(settings.delay_for(Some(5)), Duration::from_secs(60));
}

#[tokio::test]
async fn poller_over_simulated_world() {
    let config = ScavConfig::parse(CONFIG).unwrap();
    let world = SimulatedWorld::from_toml(
        r#"
[[sites]]
id = "v1"
units = { light = 230 }

[[sites.slots]]
level = 1
status = "available"

[[sites]]
id = "v2"
units = { light = 230 }

[[sites.slots]]
level = 1
status = "available"
"#,
    )
    .unwrap();

    let pass = FleetPass::new(&world, &config, ExecutorSettings::from_config(&config.dispatch));
    let mut poller = Poller::new(
        pass,
        FleetTracker::new(config.tracker.ttl()),
        PollSettings::from_config(&config),
    );

    let tick = poller.tick().await;
    let report = tick.report.unwrap();

    assert_eq!(report.result("v1").unwrap().confirmed, 1);
    assert_eq!(world.units("v1").unwrap()[&ResourceType::Light], 130);
    // Light disabled at v2.
    assert!(report.result("v2").is_none());
    assert_eq!(world.submissions("v2", 1), 0);
    // v2 idles on the fallback, v1 is busy for longer.
    assert_eq!(tick.estimate_secs, Some(300));
}

#[test]
fn demo_fixtures_load() {
    let config = ScavConfig::parse(include_str!("../../../demos/fleet/scavgrid.toml")).unwrap();
    assert!(config.site_units("1234").enabled[&ResourceType::Axe]);
    assert!(!config.site_units("5678").enabled[&ResourceType::Axe]);
    assert_eq!(config.site_units("1234").limits[&ResourceType::Spear], 200);

    let world = SimulatedWorld::from_toml(include_str!("../../../demos/fleet/world.toml")).unwrap();
    let slots = world.snapshot("1234").unwrap();
    assert_eq!(slots[2].status, SlotStatus::Unlocking);
    assert_eq!(slots[2].remaining_secs, Some(42 * 60 + 10));
}

//! End-to-end CLI behaviour of the `scavd` binary.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

const WORLD: &str = r#"
[[sites]]
id = "v1"
units = { light = 230 }

[[sites.slots]]
level = 1
status = "available"

[[sites.slots]]
level = 2
status = "available"

[[sites.slots]]
level = 3
status = "available"

[[sites.slots]]
level = 4
status = "locked"
"#;

const FAST_CONFIG: &str = r#"
[dispatch]
availability_retry_delay = "0s"
confirm_delay = "0s"
site_pacing = "0s"
"#;

fn stdout_json(cmd: &mut assert_cmd::Command) -> serde_json::Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

#[test]
fn help_lists_subcommands() {
    cargo_bin_cmd!("scavd")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("estimate"));
}

#[test]
fn plan_splits_by_weight() {
    let mut cmd = cargo_bin_cmd!("scavd");
    cmd.args(["plan", "--units", "light=230", "--free", "1,2,3"]);
    let plan = stdout_json(&mut cmd);

    assert_eq!(plan["slots"]["1"]["light"], 150);
    assert_eq!(plan["slots"]["2"]["light"], 60);
    assert_eq!(plan["slots"]["3"]["light"], 20);
}

#[test]
fn plan_honours_skip_level_1_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("scavgrid.toml");
    std::fs::write(&config, "[fleet]\nskip_level_1 = true\n").unwrap();

    let mut cmd = cargo_bin_cmd!("scavd");
    cmd.arg("plan")
        .arg("--config")
        .arg(&config)
        .args(["--units", "spear=90", "--free", "1,2,3,4"]);
    let plan = stdout_json(&mut cmd);

    assert!(plan["slots"].get("1").is_none());
    // 6 + 2 + 1 = 9
    assert_eq!(plan["slots"]["2"]["spear"], 60);
    assert_eq!(plan["slots"]["3"]["spear"], 20);
    assert_eq!(plan["slots"]["4"]["spear"], 10);
}

#[test]
fn plan_without_eligible_units_reports_reason() {
    let mut cmd = cargo_bin_cmd!("scavd");
    cmd.args(["plan", "--units", "spear=0", "--free", "1"]);
    let out = stdout_json(&mut cmd);
    assert!(out["no_plan"].as_str().unwrap().contains("unit"));
}

#[test]
fn plan_rejects_unknown_unit_type() {
    cargo_bin_cmd!("scavd")
        .args(["plan", "--units", "catapult=3", "--free", "1"])
        .assert()
        .failure();
}

#[test]
fn run_once_then_estimate_from_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("scavgrid.toml");
    let world = dir.path().join("world.toml");
    let data = dir.path().join("data");
    std::fs::write(&config, FAST_CONFIG).unwrap();
    std::fs::write(&world, WORLD).unwrap();

    let mut run = cargo_bin_cmd!("scavd");
    run.arg("run")
        .arg("--once")
        .arg("--config")
        .arg(&config)
        .arg("--world")
        .arg(&world)
        .arg("--data-dir")
        .arg(&data);
    let tick = stdout_json(&mut run);

    assert_eq!(tick["report"]["results"][0]["confirmed"], 3);
    assert!(data.join("tracker.redb").exists());

    let mut estimate = cargo_bin_cmd!("scavd");
    estimate
        .arg("estimate")
        .arg("--config")
        .arg(&config)
        .arg("--data-dir")
        .arg(&data);
    let out = stdout_json(&mut estimate);

    assert_eq!(out["sites"], 1);
    // Longest busy slot: level 3, 2700 + 20 * 80 / 10.
    let secs = out["estimate_secs"].as_u64().unwrap();
    assert!(secs > 2800 && secs <= 2860, "unexpected estimate {secs}");
}

#[test]
fn estimate_without_snapshot_has_no_opinion() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = cargo_bin_cmd!("scavd");
    cmd.arg("estimate").arg("--data-dir").arg(dir.path());
    let out = stdout_json(&mut cmd);

    assert_eq!(out["sites"], 0);
    assert!(out["estimate_secs"].is_null());
    assert_eq!(out["delay_secs"], 600);
}

#[test]
fn run_fails_on_missing_world() {
    let dir = tempfile::tempdir().unwrap();
    cargo_bin_cmd!("scavd")
        .arg("run")
        .arg("--once")
        .arg("--world")
        .arg(dir.path().join("absent.toml"))
        .arg("--data-dir")
        .arg(dir.path())
        .assert()
        .failure();
}

use std::path::Path;

use scav_core::ScavConfig;
use tracing::info;

pub mod estimate;
pub mod plan;
pub mod run;

/// Load `scavgrid.toml`, or the built-in defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ScavConfig> {
    match path {
        Some(path) => {
            let config = ScavConfig::from_file(path)?;
            info!(?path, sites = config.sites.len(), "configuration loaded");
            Ok(config)
        }
        None => Ok(ScavConfig::default()),
    }
}

/// Tracker snapshot location inside the data directory.
pub fn snapshot_path(data_dir: &Path) -> std::path::PathBuf {
    data_dir.join("tracker.redb")
}

//! scavgrid.toml configuration parser.
//!
//! Every section and key is optional. Per-site `[sites."<id>"]` tables
//! override the `[fleet]` defaults key by key.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::slot::MAX_SLOTS;
use crate::time::parse_duration;
use crate::types::{EnabledUnits, ResourceType, SiteId, UnitLimits};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScavConfig {
    #[serde(default)]
    pub fleet: FleetConfig,
    #[serde(default)]
    pub sites: BTreeMap<SiteId, SiteConfig>,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
}

/// Fleet-wide planning defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(default)]
    pub skip_level_1: bool,
    #[serde(default = "default_base_max_resources")]
    pub base_max_resources: u64,
    /// Enable flags. Types not listed stay enabled.
    #[serde(default)]
    pub units: EnabledUnits,
    #[serde(default)]
    pub limits: UnitLimits,
    /// Weight per slot level; index 0 is level 1.
    #[serde(default = "default_slot_weights")]
    pub slot_weights: Vec<u32>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            skip_level_1: false,
            base_max_resources: default_base_max_resources(),
            units: EnabledUnits::new(),
            limits: UnitLimits::new(),
            slot_weights: default_slot_weights(),
        }
    }
}

/// Per-site overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub units: EnabledUnits,
    #[serde(default)]
    pub limits: UnitLimits,
}

/// Dispatch executor timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_availability_attempts")]
    pub availability_attempts: u32,
    #[serde(default = "default_availability_retry_delay")]
    pub availability_retry_delay: String,
    #[serde(default = "default_confirm_delay")]
    pub confirm_delay: String,
    #[serde(default = "default_observation_timeout")]
    pub observation_timeout: String,
    #[serde(default = "default_site_pacing")]
    pub site_pacing: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            availability_attempts: default_availability_attempts(),
            availability_retry_delay: default_availability_retry_delay(),
            confirm_delay: default_confirm_delay(),
            observation_timeout: default_observation_timeout(),
            site_pacing: default_site_pacing(),
        }
    }
}

/// Next-poll estimation and loop clamping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_fresh_window")]
    pub fresh_window: String,
    #[serde(default = "default_idle_fallback")]
    pub idle_fallback: String,
    #[serde(default = "default_unlocking_fallback")]
    pub unlocking_fallback: String,
    #[serde(default = "default_locked_wait")]
    pub locked_wait: String,
    #[serde(default = "default_default_delay")]
    pub default_delay: String,
    #[serde(default = "default_min_delay")]
    pub min_delay: String,
    #[serde(default = "default_max_delay")]
    pub max_delay: String,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            fresh_window: default_fresh_window(),
            idle_fallback: default_idle_fallback(),
            unlocking_fallback: default_unlocking_fallback(),
            locked_wait: default_locked_wait(),
            default_delay: default_default_delay(),
            min_delay: default_min_delay(),
            max_delay: default_max_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_tracker_ttl")]
    pub ttl: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            ttl: default_tracker_ttl(),
        }
    }
}

fn default_base_max_resources() -> u64 {
    99_999
}
fn default_slot_weights() -> Vec<u32> {
    vec![15, 6, 2, 1]
}
fn default_availability_attempts() -> u32 {
    3
}
fn default_availability_retry_delay() -> String {
    "2s".into()
}
fn default_confirm_delay() -> String {
    "1s".into()
}
fn default_observation_timeout() -> String {
    "10s".into()
}
fn default_site_pacing() -> String {
    "500ms".into()
}
fn default_fresh_window() -> String {
    "5m".into()
}
fn default_idle_fallback() -> String {
    "300s".into()
}
fn default_unlocking_fallback() -> String {
    "600s".into()
}
fn default_locked_wait() -> String {
    "3600s".into()
}
fn default_default_delay() -> String {
    "600s".into()
}
fn default_min_delay() -> String {
    "30s".into()
}
fn default_max_delay() -> String {
    "2h".into()
}
fn default_tracker_ttl() -> String {
    "6h".into()
}

/// Unit settings resolved for one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteUnitSettings {
    /// One entry per resource type.
    pub enabled: EnabledUnits,
    pub limits: UnitLimits,
}

impl ScavConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        tracing::debug!(?path, sites = config.sites.len(), "config loaded");
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let config: ScavConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.fleet.base_max_resources == 0 {
            return Err(ConfigError::Invalid(
                "fleet.base_max_resources must be positive".into(),
            ));
        }
        if self.fleet.slot_weights.len() > MAX_SLOTS {
            return Err(ConfigError::Invalid(format!(
                "fleet.slot_weights defines {} levels, at most {MAX_SLOTS} allowed",
                self.fleet.slot_weights.len()
            )));
        }
        if self.dispatch.availability_attempts == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.availability_attempts must be at least 1".into(),
            ));
        }

        let durations = [
            ("dispatch.availability_retry_delay", &self.dispatch.availability_retry_delay),
            ("dispatch.confirm_delay", &self.dispatch.confirm_delay),
            ("dispatch.observation_timeout", &self.dispatch.observation_timeout),
            ("dispatch.site_pacing", &self.dispatch.site_pacing),
            ("poll.fresh_window", &self.poll.fresh_window),
            ("poll.idle_fallback", &self.poll.idle_fallback),
            ("poll.unlocking_fallback", &self.poll.unlocking_fallback),
            ("poll.locked_wait", &self.poll.locked_wait),
            ("poll.default_delay", &self.poll.default_delay),
            ("poll.min_delay", &self.poll.min_delay),
            ("poll.max_delay", &self.poll.max_delay),
            ("tracker.ttl", &self.tracker.ttl),
        ];
        for (key, value) in durations {
            if parse_duration(value).is_none() {
                return Err(ConfigError::Invalid(format!("{key}: bad duration '{value}'")));
            }
        }

        if self.poll.min_clamp() > self.poll.max_clamp() {
            return Err(ConfigError::Invalid(
                "poll.min_delay must not exceed poll.max_delay".into(),
            ));
        }
        Ok(())
    }

    /// Enable flags and limits for a site, falling back to the fleet defaults.
    pub fn site_units(&self, site: &str) -> SiteUnitSettings {
        let overrides = self.sites.get(site);

        let enabled = ResourceType::ALL
            .into_iter()
            .map(|t| {
                let flag = overrides
                    .and_then(|o| o.units.get(&t))
                    .or_else(|| self.fleet.units.get(&t))
                    .copied()
                    .unwrap_or(true);
                (t, flag)
            })
            .collect();

        let mut limits = self.fleet.limits.clone();
        if let Some(o) = overrides {
            limits.extend(o.limits.iter().map(|(t, n)| (*t, *n)));
        }

        SiteUnitSettings { enabled, limits }
    }
}

impl DispatchConfig {
    pub fn retry_delay(&self) -> Duration {
        duration_or(&self.availability_retry_delay, Duration::from_secs(2))
    }

    pub fn confirm(&self) -> Duration {
        duration_or(&self.confirm_delay, Duration::from_secs(1))
    }

    pub fn timeout(&self) -> Duration {
        duration_or(&self.observation_timeout, Duration::from_secs(10))
    }

    pub fn pacing(&self) -> Duration {
        duration_or(&self.site_pacing, Duration::from_millis(500))
    }
}

impl PollConfig {
    pub fn fresh(&self) -> Duration {
        duration_or(&self.fresh_window, Duration::from_secs(300))
    }

    pub fn idle(&self) -> Duration {
        duration_or(&self.idle_fallback, Duration::from_secs(300))
    }

    pub fn unlocking(&self) -> Duration {
        duration_or(&self.unlocking_fallback, Duration::from_secs(600))
    }

    pub fn locked(&self) -> Duration {
        duration_or(&self.locked_wait, Duration::from_secs(3600))
    }

    pub fn fallback_delay(&self) -> Duration {
        duration_or(&self.default_delay, Duration::from_secs(600))
    }

    pub fn min_clamp(&self) -> Duration {
        duration_or(&self.min_delay, Duration::from_secs(30))
    }

    pub fn max_clamp(&self) -> Duration {
        duration_or(&self.max_delay, Duration::from_secs(7200))
    }
}

impl TrackerConfig {
    pub fn ttl(&self) -> Duration {
        duration_or(&self.ttl, Duration::from_secs(6 * 3600))
    }
}

fn duration_or(s: &str, fallback: Duration) -> Duration {
    parse_duration(s).unwrap_or(fallback)
}

//! scav-core: shared domain types for scavgrid.
//!
//! Everything the planner, dispatcher and poller agree on lives here:
//!
//! - **`types`**: resource types, per-unit capacity, unit count maps
//! - **`slot`**: slot levels, status classification, observed slots
//! - **`time`**: epoch clock, duration strings, `H:MM:SS` remaining text
//! - **`config`**: `scavgrid.toml` parsing and per-site resolution

pub mod config;
pub mod slot;
pub mod time;
pub mod types;

pub use config::{ConfigError, ScavConfig, SiteUnitSettings};
pub use slot::{Slot, SlotLevel, SlotSignals, SlotStatus, MAX_SLOTS};
pub use types::*;

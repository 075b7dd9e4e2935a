//! scavgrid-planner: decides how many units of each type go to each slot.
//!
//! # Algorithm
//!
//! ```text
//! eligible slots = free slots with a weight
//!                  (minus level 1 when skip_level_1 and >1 slot is free)
//! eligible units = enabled types with available > 0
//! effective[t]   = min(available[t], limit[t])  or available[t]
//!
//! for each eligible slot s:
//!     count[s][t] = floor(effective[t] * weight[s] / Σ weight)
//!     ceiling     = base_max_resources * scale(#eligible slots)
//!     if Σ count * capacity > ceiling:
//!         count[s][t] = floor(count[s][t] * ceiling / Σ count * capacity)
//! ```
//!
//! Floor truncation can leave units unused; remainders are never
//! redistributed. In exchange the planner is deterministic and monotonic
//! in each type's available count.

pub mod allocator;
pub mod settings;

pub use allocator::{DispatchPlan, NoPlan, PlanRequest, compute_plan};
pub use settings::PlannerSettings;

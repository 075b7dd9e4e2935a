//! scavgrid-poll: when to look at the fleet again.
//!
//! # Per-site wait
//!
//! ```text
//! any busy       → max remaining over busy slots
//! any available  → idle_fallback if fresh and no slot unlocking, else 0
//! any unlocking  → min known remaining, unlocking_fallback if none known
//! all locked     → locked_wait
//!
//! fleet delay    = min over sites, None for an empty tracker
//! ```
//!
//! The [`Poller`] repeats fleet passes and sleeps for the fleet delay,
//! clamped into `[min_delay, max_delay]`.

pub mod estimator;
pub mod poller;

pub use estimator::{EstimatorSettings, estimate_next_poll, site_wait};
pub use poller::{PollSettings, PollTick, Poller};

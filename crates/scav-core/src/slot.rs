//! Slots and slot status classification.
//!
//! A site exposes up to [`MAX_SLOTS`] time-boxed work slots, identified by
//! a stable level. Status is never stored by the provider; it is derived
//! from raw signals on every observation via [`SlotStatus::classify`].

use serde::{Deserialize, Serialize};

/// Slot level (1-based).
pub type SlotLevel = u8;

/// Number of slots a site exposes.
pub const MAX_SLOTS: usize = 4;

/// Derived status of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    /// Not yet unlocked; an unlock action is offered.
    Locked,
    /// Unlock in progress.
    Unlocking,
    /// Free; a start action is offered.
    Available,
    /// Running a dispatch.
    Busy,
}

/// Raw per-slot signals as observed on the control surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSignals {
    pub has_unlock_control: bool,
    pub is_unlocking: bool,
    pub has_start_control: bool,
}

impl SlotStatus {
    /// Classify raw signals. Locked dominates, then unlocking, then
    /// available; anything else is busy.
    pub fn classify(signals: &SlotSignals) -> Self {
        if signals.has_unlock_control {
            SlotStatus::Locked
        } else if signals.is_unlocking {
            SlotStatus::Unlocking
        } else if signals.has_start_control {
            SlotStatus::Available
        } else {
            SlotStatus::Busy
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SlotStatus::Locked => "locked",
            SlotStatus::Unlocking => "unlocking",
            SlotStatus::Available => "available",
            SlotStatus::Busy => "busy",
        }
    }

    /// Whether remaining time is meaningful for this status.
    pub fn is_timed(&self) -> bool {
        matches!(self, SlotStatus::Busy | SlotStatus::Unlocking)
    }
}

/// One observed slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub level: SlotLevel,
    pub status: SlotStatus,
    /// Seconds until the slot frees up. Only set while busy or unlocking.
    pub remaining_secs: Option<u64>,
}

impl Slot {
    pub fn new(level: SlotLevel, status: SlotStatus) -> Self {
        Self {
            level,
            status,
            remaining_secs: None,
        }
    }

    /// Build a slot from raw signals.
    pub fn from_signals(level: SlotLevel, signals: &SlotSignals, remaining_secs: Option<u64>) -> Self {
        let status = SlotStatus::classify(signals);
        Self {
            level,
            status,
            remaining_secs: remaining_secs.filter(|_| status.is_timed()),
        }
    }

    pub fn with_remaining(mut self, secs: u64) -> Self {
        if self.status.is_timed() {
            self.remaining_secs = Some(secs);
        }
        self
    }
}

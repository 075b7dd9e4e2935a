//! Dispatch error types.

use std::time::Duration;

use thiserror::Error;

use scav_core::SlotLevel;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("observation timed out after {0:?}")]
    ObservationTimeout(Duration),

    #[error("submission rejected for site {site} level {level}")]
    SubmissionRejected { site: String, level: SlotLevel },

    #[error("control surface unavailable: {0}")]
    ControlSurfaceUnavailable(String),

    #[error("provider error: {0}")]
    Provider(String),
}

pub type DispatchResult<T> = Result<T, DispatchError>;

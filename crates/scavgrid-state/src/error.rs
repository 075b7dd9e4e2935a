//! Error types for the tracker snapshot store.

use thiserror::Error;

pub type StateResult<T> = Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open snapshot database: {0}")]
    Open(String),

    #[error("snapshot transaction failed: {0}")]
    Transaction(String),

    #[error("snapshot table unavailable: {0}")]
    Table(String),

    #[error("snapshot read failed: {0}")]
    Read(String),

    #[error("snapshot write failed: {0}")]
    Write(String),

    #[error("failed to encode site '{site}': {reason}")]
    Encode { site: String, reason: String },

    #[error("corrupt snapshot for site '{site}': {reason}")]
    Corrupt { site: String, reason: String },
}

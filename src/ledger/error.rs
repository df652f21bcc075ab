//! Vote and persistence error types.

use thiserror::Error;

/// Reasons a ballot is rejected. None of them change ledger state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteError {
    #[error("Message does not contain a sample number")]
    NoNumberFound,

    #[error("Sample number {value} is outside the range 1..={max}")]
    SampleOutOfRange { value: u64, max: u32 },

    #[error("Vote limit of {limit} reached")]
    VoteLimitExceeded { limit: u32 },
}

/// Failures reading or writing the vote snapshot.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to read vote snapshot: {0}")]
    Read(#[source] std::io::Error),

    #[error("Failed to parse vote snapshot: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("Failed to serialize vote snapshot: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to write vote snapshot: {0}")]
    Write(#[source] std::io::Error),
}

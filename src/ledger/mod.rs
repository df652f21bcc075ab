//! Vote accounting module.
//!
//! Keeps per-sample tallies and per-user vote counts, enforces the
//! per-user vote limit and persists every accepted vote to a JSON snapshot.

mod ballot;
mod error;
mod snapshot;
mod vote_ledger;

pub use ballot::parse_sample_number;
pub use error::{PersistenceError, VoteError};
pub use snapshot::Snapshot;
pub use vote_ledger::{InvariantViolation, VoteLedger, VoteReceipt, VoterId};

//! In-memory vote ledger backed by the snapshot file.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use super::{PersistenceError, Snapshot, VoteError, parse_sample_number};
use crate::config::ContestRules;

/// Telegram user id of a voter.
pub type VoterId = u64;

/// Outcome of an accepted vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteReceipt {
    /// Sample that received the vote.
    pub sample: u32,

    /// Total votes for the sample after this one.
    pub sample_total: u32,

    /// Votes the user has cast so far, this one included.
    pub votes_used: u32,

    /// Votes the user has left.
    pub remaining: u32,
}

/// A broken ledger invariant, reported by [`VoteLedger::check_invariants`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Sum of sample tallies differs from the sum of per-user counts.
    TotalsMismatch { tally_total: u64, user_total: u64 },

    /// A user holds more votes than the limit allows.
    UserOverLimit {
        user: VoterId,
        votes: u32,
        limit: u32,
    },

    /// The snapshot carries a tally for a sample outside the contest.
    SampleOutOfRange { sample: u32, max_samples: u32 },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TotalsMismatch {
                tally_total,
                user_total,
            } => write!(
                f,
                "sample tallies sum to {tally_total} but user counts sum to {user_total}"
            ),
            Self::UserOverLimit { user, votes, limit } => {
                write!(f, "user {user} has {votes} votes (limit {limit})")
            }
            Self::SampleOutOfRange {
                sample,
                max_samples,
            } => write!(f, "sample {sample} is outside 1..={max_samples}"),
        }
    }
}

/// Vote tallies and per-user counters.
///
/// Every sample in `1..=max_samples` always has a tally, starting at zero.
/// Each accepted vote bumps exactly one tally and one user counter and is
/// written to disk straight away. The ledger does no locking of its own;
/// callers share it behind a lock and hold the write guard across
/// [`cast_vote`](Self::cast_vote).
pub struct VoteLedger {
    rules: ContestRules,
    path: PathBuf,
    tally: Vec<u32>,
    user_votes: BTreeMap<VoterId, u32>,
}

impl VoteLedger {
    /// Creates an empty ledger persisting to `path`.
    #[must_use]
    pub fn new(rules: ContestRules, path: impl Into<PathBuf>) -> Self {
        Self {
            rules,
            path: path.into(),
            tally: vec![0; rules.max_samples as usize],
            user_votes: BTreeMap::new(),
        }
    }

    /// Creates a ledger and loads the snapshot at `path` if there is one.
    #[must_use]
    pub fn open(rules: ContestRules, path: impl Into<PathBuf>) -> Self {
        let mut ledger = Self::new(rules, path);
        ledger.load();
        ledger
    }

    /// Merges the snapshot into memory, logging and ignoring any failure.
    ///
    /// On failure the in-memory state is left exactly as it was.
    pub fn load(&mut self) {
        match self.try_load() {
            Ok(true) => info!(
                "Loaded vote snapshot from {} ({} votes, {} voters)",
                self.path.display(),
                self.total_votes(),
                self.unique_voter_count()
            ),
            Ok(false) => debug!("No vote snapshot at {}, starting empty", self.path.display()),
            Err(e) => error!("{}; keeping current state", e),
        }
    }

    /// Merges the snapshot into memory.
    ///
    /// Stored tallies overwrite the in-memory ones and the user counters are
    /// replaced wholesale. Tallies for samples outside the contest are
    /// skipped. Returns `false` if there is no snapshot.
    pub fn try_load(&mut self) -> Result<bool, PersistenceError> {
        let Some(snapshot) = Snapshot::load(&self.path)? else {
            return Ok(false);
        };

        for (&sample, &count) in &snapshot.votes {
            match self.slot(sample) {
                Some(slot) => self.tally[slot] = count,
                None => warn!(
                    "Skipping tally for sample {} outside 1..={}",
                    sample, self.rules.max_samples
                ),
            }
        }
        self.user_votes = snapshot.user_votes;

        Ok(true)
    }

    /// Writes the full snapshot, logging any failure.
    ///
    /// Returns whether the write succeeded.
    pub fn save(&self) -> bool {
        match self.try_save() {
            Ok(()) => true,
            Err(e) => {
                error!("{}; latest votes are only held in memory", e);
                false
            }
        }
    }

    /// Writes the full snapshot.
    pub fn try_save(&self) -> Result<(), PersistenceError> {
        self.to_snapshot().save(&self.path)
    }

    /// Builds the serialized form of the ledger.
    #[must_use]
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            votes: self.full_dump().into_iter().collect(),
            user_votes: self.user_votes.clone(),
        }
    }

    /// Records a vote for the first number found in `text`.
    ///
    /// Checks run in order: a number must be present, it must name a sample
    /// of the contest, and the user must have votes left. A rejected ballot
    /// leaves the ledger untouched. An accepted one is persisted before
    /// returning; a failed write is logged and the vote stays counted.
    pub fn cast_vote(&mut self, user: VoterId, text: &str) -> Result<VoteReceipt, VoteError> {
        let value = parse_sample_number(text).ok_or(VoteError::NoNumberFound)?;
        self.record_vote(user, value)
    }

    /// Records a vote for sample `value`, with the same checks as
    /// [`cast_vote`](Self::cast_vote) minus the text parsing.
    pub fn record_vote(&mut self, user: VoterId, value: u64) -> Result<VoteReceipt, VoteError> {
        let max = self.rules.max_samples;
        let (sample, slot) = u32::try_from(value)
            .ok()
            .and_then(|sample| self.slot(sample).map(|slot| (sample, slot)))
            .ok_or(VoteError::SampleOutOfRange { value, max })?;

        let used = self.votes_cast_by(user);
        if used >= self.rules.vote_limit {
            debug!("User {} is out of votes ({})", user, used);
            return Err(VoteError::VoteLimitExceeded {
                limit: self.rules.vote_limit,
            });
        }

        self.tally[slot] = self.tally[slot].saturating_add(1);
        let votes_used = used + 1;
        self.user_votes.insert(user, votes_used);
        self.save();

        let receipt = VoteReceipt {
            sample,
            sample_total: self.tally[slot],
            votes_used,
            remaining: self.rules.vote_limit.saturating_sub(votes_used),
        };

        info!(
            "Vote for sample {} from user {} (total {}, user {}/{})",
            sample, user, receipt.sample_total, votes_used, self.rules.vote_limit
        );

        Ok(receipt)
    }

    /// Returns the `n` samples with the most votes, highest first.
    ///
    /// Equal counts are ordered by ascending sample number.
    #[must_use]
    pub fn top_n(&self, n: usize) -> Vec<(u32, u32)> {
        let mut ranked = self.full_dump();
        // Stable sort keeps ascending sample order within equal counts.
        ranked.sort_by_key(|&(_, count)| Reverse(count));
        ranked.truncate(n);
        ranked
    }

    /// Returns every sample with its count in ascending sample order.
    ///
    /// Samples without votes are included.
    #[must_use]
    pub fn full_dump(&self) -> Vec<(u32, u32)> {
        (1..=self.rules.max_samples).zip(self.tally.iter().copied()).collect()
    }

    /// Returns the vote count of a single sample, `None` if out of range.
    #[must_use]
    pub fn tally_of(&self, sample: u32) -> Option<u32> {
        self.slot(sample).map(|slot| self.tally[slot])
    }

    /// Returns the number of distinct users who have voted.
    #[must_use]
    pub fn unique_voter_count(&self) -> usize {
        self.user_votes.len()
    }

    /// Returns how many votes `user` has cast.
    #[must_use]
    pub fn votes_cast_by(&self, user: VoterId) -> u32 {
        self.user_votes.get(&user).copied().unwrap_or(0)
    }

    /// Returns how many votes `user` has left.
    #[must_use]
    pub fn remaining_votes(&self, user: VoterId) -> u32 {
        self.rules.vote_limit.saturating_sub(self.votes_cast_by(user))
    }

    /// Returns the total number of votes across all samples.
    #[must_use]
    pub fn total_votes(&self) -> u64 {
        self.tally.iter().map(|&c| u64::from(c)).sum()
    }

    /// Checks the counting invariants against the current state.
    #[must_use]
    pub fn check_invariants(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        let tally_total = self.total_votes();
        let user_total: u64 = self.user_votes.values().map(|&c| u64::from(c)).sum();
        if tally_total != user_total {
            violations.push(InvariantViolation::TotalsMismatch {
                tally_total,
                user_total,
            });
        }

        for (&user, &votes) in &self.user_votes {
            if votes > self.rules.vote_limit {
                violations.push(InvariantViolation::UserOverLimit {
                    user,
                    votes,
                    limit: self.rules.vote_limit,
                });
            }
        }

        violations
    }

    /// Returns the contest rules the ledger enforces.
    #[must_use]
    pub const fn rules(&self) -> &ContestRules {
        &self.rules
    }

    /// Returns the snapshot location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn slot(&self, sample: u32) -> Option<usize> {
        self.rules
            .contains(sample)
            .then(|| (sample - 1) as usize)
    }
}

impl fmt::Debug for VoteLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoteLedger")
            .field("rules", &self.rules)
            .field("path", &self.path)
            .field("total_votes", &self.total_votes())
            .field("voters", &self.user_votes.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: VoterId = 1001;
    const BOB: VoterId = 1002;

    fn ledger_in(dir: &tempfile::TempDir) -> VoteLedger {
        VoteLedger::new(ContestRules::default(), dir.path().join("votes.json"))
    }

    fn user_total(ledger: &VoteLedger) -> u64 {
        ledger
            .to_snapshot()
            .user_votes
            .values()
            .map(|&c| u64::from(c))
            .sum()
    }

    #[test]
    fn test_new_ledger_has_full_zero_domain() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);

        let dump = ledger.full_dump();
        assert_eq!(dump.len(), 60);
        assert_eq!(dump.first(), Some(&(1, 0)));
        assert_eq!(dump.last(), Some(&(60, 0)));
        assert_eq!(ledger.unique_voter_count(), 0);
    }

    #[test]
    fn test_first_vote_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);

        let receipt = ledger.cast_vote(ALICE, "5").unwrap();
        assert_eq!(
            receipt,
            VoteReceipt {
                sample: 5,
                sample_total: 1,
                votes_used: 1,
                remaining: 6,
            }
        );
        assert_eq!(ledger.tally_of(5), Some(1));
        assert_eq!(ledger.votes_cast_by(ALICE), 1);
    }

    #[test]
    fn test_vote_limit_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);

        for _ in 0..6 {
            ledger.cast_vote(ALICE, "5").unwrap();
        }
        let seventh = ledger.cast_vote(ALICE, "5").unwrap();
        assert_eq!(seventh.votes_used, 7);
        assert_eq!(seventh.remaining, 0);

        let before = ledger.to_snapshot();
        assert_eq!(
            ledger.cast_vote(ALICE, "5"),
            Err(VoteError::VoteLimitExceeded { limit: 7 })
        );
        assert_eq!(ledger.to_snapshot(), before);
        assert_eq!(ledger.tally_of(5), Some(7));
    }

    #[test]
    fn test_limit_applies_across_samples() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);

        for sample in 1..=7 {
            ledger.cast_vote(ALICE, &sample.to_string()).unwrap();
        }
        assert!(matches!(
            ledger.cast_vote(ALICE, "8"),
            Err(VoteError::VoteLimitExceeded { .. })
        ));
        assert_eq!(ledger.tally_of(8), Some(0));
        assert!(ledger.cast_vote(BOB, "8").is_ok());
    }

    #[test]
    fn test_no_number_leaves_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);
        let before = ledger.to_snapshot();

        assert_eq!(ledger.cast_vote(ALICE, "abc"), Err(VoteError::NoNumberFound));
        assert_eq!(ledger.to_snapshot(), before);
        assert!(!ledger.path().exists());
    }

    #[test]
    fn test_range_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);

        assert_eq!(
            ledger.cast_vote(ALICE, "0"),
            Err(VoteError::SampleOutOfRange { value: 0, max: 60 })
        );
        assert_eq!(
            ledger.cast_vote(ALICE, "61"),
            Err(VoteError::SampleOutOfRange { value: 61, max: 60 })
        );
        assert_eq!(ledger.votes_cast_by(ALICE), 0);

        assert!(ledger.cast_vote(ALICE, "1").is_ok());
        assert!(ledger.cast_vote(ALICE, "60").is_ok());
    }

    #[test]
    fn test_range_checked_before_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);
        for _ in 0..7 {
            ledger.cast_vote(ALICE, "2").unwrap();
        }

        assert!(matches!(
            ledger.cast_vote(ALICE, "99"),
            Err(VoteError::SampleOutOfRange { .. })
        ));
        assert_eq!(ledger.cast_vote(ALICE, "none"), Err(VoteError::NoNumberFound));
    }

    #[test]
    fn test_non_ascii_digits_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);

        assert_eq!(ledger.cast_vote(ALICE, "Мёд ５").unwrap().sample, 5);
        assert_eq!(ledger.cast_vote(ALICE, "٣").unwrap().sample, 3);
        assert_eq!(ledger.tally_of(5), Some(1));
        assert_eq!(ledger.tally_of(3), Some(1));
    }

    #[test]
    fn test_huge_number_is_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);

        assert!(matches!(
            ledger.cast_vote(ALICE, "99999999999999999999999"),
            Err(VoteError::SampleOutOfRange { .. })
        ));
    }

    #[test]
    fn test_totals_stay_balanced() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);

        let ballots = [
            (ALICE, "3"),
            (BOB, "3"),
            (ALICE, "abc"),
            (BOB, "60"),
            (ALICE, "0"),
            (3, "Мёд 12"),
            (BOB, "3"),
        ];
        for (user, text) in ballots {
            let _ = ledger.cast_vote(user, text);
            assert_eq!(ledger.total_votes(), user_total(&ledger));
        }
        assert_eq!(ledger.total_votes(), 5);
        assert!(ledger.check_invariants().is_empty());
    }

    #[test]
    fn test_unique_voters_count_repeat_voters_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);

        ledger.cast_vote(ALICE, "1").unwrap();
        ledger.cast_vote(ALICE, "2").unwrap();
        ledger.cast_vote(BOB, "1").unwrap();
        let _ = ledger.cast_vote(3, "no number");

        assert_eq!(ledger.unique_voter_count(), 2);
    }

    #[test]
    fn test_top_n_orders_by_count_then_sample() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);
        ledger.tally[2] = 10; // sample 3
        ledger.tally[6] = 10; // sample 7
        ledger.tally[0] = 9; // sample 1
        ledger.tally[59] = 1; // sample 60

        let top = ledger.top_n(5);
        assert_eq!(top, vec![(3, 10), (7, 10), (1, 9), (60, 1), (2, 0)]);
        assert_eq!(ledger.top_n(5), top);
    }

    #[test]
    fn test_top_n_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);

        assert!(ledger.top_n(0).is_empty());
        assert_eq!(ledger.top_n(100).len(), 60);
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);
        ledger.cast_vote(ALICE, "5").unwrap();
        ledger.cast_vote(ALICE, "17").unwrap();
        ledger.cast_vote(BOB, "5").unwrap();

        let reopened = VoteLedger::open(ContestRules::default(), ledger.path());
        assert_eq!(reopened.to_snapshot(), ledger.to_snapshot());
        assert_eq!(reopened.remaining_votes(ALICE), 5);
    }

    #[test]
    fn test_load_sparse_snapshot_defaults_missing_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("votes.json");
        std::fs::write(&path, r#"{"votes": {"4": 2}, "user_votes": {"1001": 2}}"#).unwrap();

        let ledger = VoteLedger::open(ContestRules::default(), &path);
        assert_eq!(ledger.tally_of(4), Some(2));
        assert_eq!(ledger.tally_of(5), Some(0));
        assert_eq!(ledger.votes_cast_by(ALICE), 2);
    }

    #[test]
    fn test_load_skips_out_of_range_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("votes.json");
        std::fs::write(&path, r#"{"votes": {"0": 3, "61": 4, "2": 1}}"#).unwrap();

        let ledger = VoteLedger::open(ContestRules::default(), &path);
        assert_eq!(ledger.full_dump().len(), 60);
        assert_eq!(ledger.total_votes(), 1);
    }

    #[test]
    fn test_corrupt_snapshot_keeps_current_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);
        ledger.cast_vote(ALICE, "9").unwrap();
        let before = ledger.to_snapshot();

        std::fs::write(ledger.path(), "{ broken").unwrap();
        assert!(matches!(ledger.try_load(), Err(PersistenceError::Parse(_))));
        ledger.load();

        assert_eq!(ledger.to_snapshot(), before);
    }

    #[test]
    fn test_write_failure_keeps_vote() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the snapshot path makes the final rename fail.
        let path = dir.path().join("votes.json");
        std::fs::create_dir(&path).unwrap();
        let mut ledger = VoteLedger::new(ContestRules::default(), &path);

        let receipt = ledger.cast_vote(ALICE, "11").unwrap();
        assert_eq!(receipt.sample_total, 1);
        assert_eq!(ledger.tally_of(11), Some(1));
        assert!(!ledger.save());
    }

    #[test]
    fn test_written_snapshot_has_full_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ledger_in(&dir);
        ledger.cast_vote(ALICE, "5").unwrap();

        let written = Snapshot::load(ledger.path()).unwrap().unwrap();
        assert_eq!(written.votes.len(), 60);
        assert_eq!(written.votes.get(&5), Some(&1));
        assert_eq!(written.user_votes.get(&ALICE), Some(&1));
    }

    #[test]
    fn test_check_invariants_reports_violations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("votes.json");
        std::fs::write(&path, r#"{"votes": {"1": 3}, "user_votes": {"1001": 9}}"#).unwrap();

        let ledger = VoteLedger::open(ContestRules::default(), &path);
        let violations = ledger.check_invariants();
        assert!(violations.contains(&InvariantViolation::TotalsMismatch {
            tally_total: 3,
            user_total: 9,
        }));
        assert!(violations.contains(&InvariantViolation::UserOverLimit {
            user: ALICE,
            votes: 9,
            limit: 7,
        }));
    }

    #[test]
    fn test_custom_rules() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger =
            VoteLedger::new(ContestRules::new(3, 1), dir.path().join("votes.json"));

        assert!(matches!(
            ledger.cast_vote(ALICE, "4"),
            Err(VoteError::SampleOutOfRange { value: 4, max: 3 })
        ));
        assert!(ledger.cast_vote(ALICE, "3").is_ok());
        assert_eq!(
            ledger.cast_vote(ALICE, "2"),
            Err(VoteError::VoteLimitExceeded { limit: 1 })
        );
    }
}

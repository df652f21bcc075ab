//! Standalone inspector for vote snapshot files.
//!
//! Loads a snapshot written by the bot, prints the standings and checks
//! that the tallies and per-user counts agree with the contest rules.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use honey_contest_bot::config::{ContestRules, DEFAULT_RESULTS_FILE, MAX_SAMPLES, VOTE_LIMIT};
use honey_contest_bot::ledger::{InvariantViolation, Snapshot, VoteLedger};

/// Vote snapshot inspector.
#[derive(Parser, Debug)]
#[command(name = "inspect_votes")]
#[command(about = "Inspects and checks honey contest vote snapshots")]
#[command(version)]
struct Args {
    /// Path to the vote snapshot to inspect.
    #[arg(short, long, default_value = DEFAULT_RESULTS_FILE)]
    file: String,

    /// Highest valid sample number.
    #[arg(long, default_value_t = MAX_SAMPLES)]
    max_samples: u32,

    /// Votes allowed per user.
    #[arg(long, default_value_t = VOTE_LIMIT)]
    vote_limit: u32,

    /// Number of leading samples to list.
    #[arg(short, long, default_value_t = 5)]
    top: usize,

    /// List every sample with at least one vote.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let rules = match ContestRules::checked(args.max_samples, args.vote_limit) {
        Ok(rules) => rules,
        Err(e) => {
            eprintln!("✗ {e}");
            return ExitCode::FAILURE;
        }
    };

    inspect(Path::new(&args.file), rules, args.top, args.verbose)
}

fn inspect(path: &Path, rules: ContestRules, top: usize, verbose: bool) -> ExitCode {
    println!("Inspecting: {}", path.display());
    println!(
        "Rules: samples 1..={}, {} votes per user\n",
        rules.max_samples, rules.vote_limit
    );

    let snapshot = match Snapshot::load(path) {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => {
            eprintln!("✗ Snapshot not found");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("✗ {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut violations: Vec<InvariantViolation> = snapshot
        .votes
        .keys()
        .filter(|&&sample| !rules.contains(sample))
        .map(|&sample| InvariantViolation::SampleOutOfRange {
            sample,
            max_samples: rules.max_samples,
        })
        .collect();

    let mut ledger = VoteLedger::new(rules, path);
    if let Err(e) = ledger.try_load() {
        eprintln!("✗ {e}");
        return ExitCode::FAILURE;
    }

    println!("Top {top}:");
    for (place, (sample, count)) in ledger.top_n(top).iter().enumerate() {
        println!("  {:>2}. Sample {sample:>3}: {count}", place + 1);
    }

    if verbose {
        println!("\nAll samples with votes:");
        for (sample, count) in ledger.full_dump().into_iter().filter(|&(_, c)| c > 0) {
            println!("  Sample {sample:>3}: {count}");
        }
    }

    println!("\nTotal votes:   {}", ledger.total_votes());
    println!("Unique voters: {}", ledger.unique_voter_count());
    println!();

    violations.extend(ledger.check_invariants());

    if violations.is_empty() {
        println!("✓ Snapshot is consistent");
        ExitCode::SUCCESS
    } else {
        for violation in &violations {
            println!("  ✗ {violation}");
        }
        println!("✗ Found {} problem(s)", violations.len());
        ExitCode::FAILURE
    }
}

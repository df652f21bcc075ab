//! Honey Contest Bot Library
//!
//! A Telegram bot for running a honey tasting contest vote.
//!
//! This crate provides the core functionality for:
//! - Counting votes per sample with a per-user vote limit
//! - Persisting tallies to a JSON snapshot after every vote
//! - Ranking samples and reporting statistics to the organiser
//! - Answering chat messages via the Telegram Bot API

pub mod commands;
pub mod config;
pub mod ledger;
pub mod telegram;

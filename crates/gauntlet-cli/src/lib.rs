//! # gauntlet-cli
//!
//! Command-line interface for the Gauntlet harness.
//!
//! ## Commands
//!
//! - `gauntlet check` — Verify the environment is ready to run tests
//! - `gauntlet list` — List discoverable tests
//! - `gauntlet run` — Run tests, optionally filtered

pub mod commands;

pub use commands::Cli;

//! # gauntlet-config
//!
//! Configuration for the Gauntlet harness, loaded from `gauntlet.toml`
//! with environment-variable overrides.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::GauntletConfig;

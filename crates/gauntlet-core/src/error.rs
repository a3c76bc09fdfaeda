use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for the entire Gauntlet harness.
#[derive(Error, Debug)]
pub enum GauntletError {
    // ── Spec / configuration errors ────────────────────────────
    #[error("fixture not found: {0}")]
    FixtureNotFound(PathBuf),

    #[error("invalid test spec: {test}: {reason}")]
    SpecInvalid { test: String, reason: String },

    #[error("suite file error: {path}: {reason}")]
    SuiteFile { path: PathBuf, reason: String },

    #[error("config error: {0}")]
    Config(String),

    // ── Backend errors ─────────────────────────────────────────
    #[error("decision backend error: {0}")]
    Backend(String),

    #[error("backend rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // ── Test lifecycle errors ──────────────────────────────────
    #[error("workspace error: {0}")]
    Workspace(String),

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, GauntletError>;

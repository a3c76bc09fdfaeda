use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration — maps to `gauntlet.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GauntletConfig {
    pub harness: HarnessConfig,
    pub cli: ExternalCliConfig,
    pub paths: PathsConfig,
    pub backend: BackendConfig,
    pub logging: LoggingConfig,
}

impl Default for GauntletConfig {
    fn default() -> Self {
        Self {
            harness: HarnessConfig::default(),
            cli: ExternalCliConfig::default(),
            paths: PathsConfig::default(),
            backend: BackendConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl GauntletConfig {
    /// Validate the config. Returns non-fatal warnings; hard errors abort
    /// the load.
    pub fn validate(&self) -> Result<Vec<String>, String> {
        let mut warnings = Vec::new();

        if self.harness.max_turns == 0 {
            return Err("harness.max_turns must be at least 1".to_string());
        }
        if self.harness.concurrency == 0 {
            return Err("harness.concurrency must be at least 1".to_string());
        }
        if self.harness.max_test_secs == 0 {
            return Err("harness.max_test_secs must be at least 1".to_string());
        }
        if self.cli.call_timeout_secs == 0 {
            return Err("cli.call_timeout_secs must be at least 1".to_string());
        }
        if self.cli.call_timeout_secs as u64 > self.harness.max_test_secs {
            warnings.push(format!(
                "cli.call_timeout_secs ({}) exceeds harness.max_test_secs ({}); a single \
                 tool call can consume the whole test budget",
                self.cli.call_timeout_secs, self.harness.max_test_secs
            ));
        }
        if self.harness.concurrency > 16 {
            warnings.push(format!(
                "harness.concurrency = {} is high for a rate-limited backend",
                self.harness.concurrency
            ));
        }

        Ok(warnings)
    }
}

// ── Harness ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Model identifier handed to the decision backend.
    pub model: String,
    /// Maximum agent turns per test before the loop is closed out.
    pub max_turns: u32,
    /// Wall-clock budget per test in seconds.
    pub max_test_secs: u64,
    /// Bounded worker count across tests (admission gate permits).
    pub concurrency: usize,
    /// Maximum tokens per backend response.
    pub max_tokens: u32,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".into(),
            max_turns: 30,
            max_test_secs: 600,
            concurrency: 4,
            max_tokens: 8192,
        }
    }
}

// ── External CLI collaborator ──────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalCliConfig {
    /// Binary name or absolute path of the wrapped CLI.
    pub binary: String,
    /// Wall-clock timeout per CLI tool call, in seconds.
    pub call_timeout_secs: u32,
}

impl Default for ExternalCliConfig {
    fn default() -> Self {
        Self {
            binary: "speakeasy".into(),
            call_timeout_secs: 120,
        }
    }
}

// ── Paths ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding suite definition YAML files.
    pub suites_dir: PathBuf,
    /// Directory holding fixture trees referenced by tests.
    pub fixtures_dir: PathBuf,
    /// Directory holding `<skill>/SKILL.md` instruction files.
    pub skills_dir: PathBuf,
    /// Root under which per-test workspaces are created. Empty = system
    /// temp directory.
    pub workspace_root: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            suites_dir: PathBuf::from("suites"),
            fixtures_dir: PathBuf::from("fixtures"),
            skills_dir: PathBuf::from("skills"),
            workspace_root: None,
        }
    }
}

// ── Decision backend ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// API key for the hosted reasoning backend. Falls back to
    /// ANTHROPIC_API_KEY when unset.
    pub anthropic_api_key: Option<String>,
    /// Override the API base URL (proxies, test servers).
    pub base_url: Option<String>,
    /// Retries per decision step before the test errors out.
    pub max_retries: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            base_url: None,
            max_retries: 3,
        }
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    pub level: String,
    /// Output format: "pretty" or "json".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::schema::GauntletConfig;

/// Loads the Gauntlet configuration from disk.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolve the config path: explicit path > GAUNTLET_CONFIG env >
    /// ./gauntlet.toml > ~/.gauntlet/gauntlet.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("GAUNTLET_CONFIG") {
            return PathBuf::from(p);
        }
        let local = PathBuf::from("gauntlet.toml");
        if local.exists() {
            return local;
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".gauntlet")
            .join("gauntlet.toml")
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load(path: Option<&Path>) -> gauntlet_core::Result<GauntletConfig> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            let raw = std::fs::read_to_string(&config_path)?;
            toml::from_str::<GauntletConfig>(&raw).map_err(|e| {
                gauntlet_core::GauntletError::Config(format!(
                    "failed to parse {}: {}",
                    config_path.display(),
                    e
                ))
            })?
        } else {
            warn!(?config_path, "config file not found, using defaults");
            GauntletConfig::default()
        };

        let config = Self::apply_env_overrides(config);

        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
            }
            Err(e) => {
                return Err(gauntlet_core::GauntletError::Config(e));
            }
        }

        Ok(config)
    }

    /// Apply env var overrides (GAUNTLET_MODEL, GAUNTLET_CONCURRENCY, ...).
    fn apply_env_overrides(mut config: GauntletConfig) -> GauntletConfig {
        if let Ok(v) = std::env::var("GAUNTLET_MODEL") {
            config.harness.model = v;
        }
        if let Ok(v) = std::env::var("GAUNTLET_CONCURRENCY")
            && let Ok(n) = v.parse::<usize>()
        {
            config.harness.concurrency = n;
        }
        if let Ok(v) = std::env::var("GAUNTLET_CLI_BINARY") {
            config.cli.binary = v;
        }
        if let Ok(v) = std::env::var("GAUNTLET_LOG_LEVEL") {
            config.logging.level = v;
        }
        // API key: config file takes priority, env is the fallback.
        if config.backend.anthropic_api_key.is_none()
            && let Ok(v) = std::env::var("ANTHROPIC_API_KEY")
        {
            config.backend.anthropic_api_key = Some(v);
        }
        config
    }
}

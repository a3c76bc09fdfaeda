use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use gauntlet_config::{ConfigLoader, GauntletConfig};
use gauntlet_core::{GauntletError, SuiteType};
use gauntlet_harness::{RunFilters, Runner, print_console, write_json};
use gauntlet_llm::{AnthropicBackend, DecisionBackend};
use gauntlet_sandbox::ExternalCli;

/// Gauntlet — behavioral test harness for tool-using agents
#[derive(Parser)]
#[command(name = "gauntlet", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to gauntlet.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output (debug logging, live tool-call trace)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify the environment: external CLI on PATH, API key, directories
    Check,
    /// List discoverable tests
    List {
        /// Only tests from this suite type
        #[arg(long, value_parser = parse_suite)]
        suite: Option<SuiteType>,
    },
    /// Run tests; exit code 0 iff every executed test passed
    Run {
        /// Only tests from this suite type
        #[arg(long, value_parser = parse_suite)]
        suite: Option<SuiteType>,

        /// Only tests exercising this skill id
        #[arg(long)]
        skill: Option<String>,

        /// Only tests whose name contains this substring
        #[arg(long)]
        test: Option<String>,

        /// Model override for the decision backend
        #[arg(short, long)]
        model: Option<String>,

        /// Concurrent test limit override
        #[arg(long)]
        concurrency: Option<usize>,

        /// Write the JSON report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Parse a `--suite` value (generation, overlay, diagnosis, workflow).
fn parse_suite(s: &str) -> std::result::Result<SuiteType, String> {
    s.parse().map_err(|e: GauntletError| e.to_string())
}

impl Cli {
    pub async fn run(self) -> gauntlet_core::Result<ExitCode> {
        let mut config = ConfigLoader::load(self.config.as_deref())?;

        // Resolve log level: --verbose > --quiet > config default
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            config.logging.level.as_str()
        };

        if config.logging.format == "json" {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
                )
                .json()
                .with_target(true)
                .init();
        } else {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
                )
                .with_target(false)
                .init();
        }

        match self.command {
            Commands::Check => Self::cmd_check(&config).await,
            Commands::List { suite } => Self::cmd_list(&config, suite),
            Commands::Run {
                suite,
                skill,
                test,
                model,
                concurrency,
                output,
            } => {
                if let Some(model) = model {
                    config.harness.model = model;
                }
                if let Some(concurrency) = concurrency {
                    config.harness.concurrency = concurrency;
                }
                let filters = RunFilters { suite, skill, test };
                Self::cmd_run(config, filters, output, self.quiet).await
            }
        }
    }

    /// Environment readiness: the wrapped CLI must answer a version
    /// probe and the backend needs an API key before a run can work.
    async fn cmd_check(config: &GauntletConfig) -> gauntlet_core::Result<ExitCode> {
        let mut ready = true;

        let cli = ExternalCli::new(
            &config.cli.binary,
            Duration::from_secs(u64::from(config.cli.call_timeout_secs)),
        );
        if cli.is_available().await {
            println!("{} external CLI: {} responds to --version", ok(), config.cli.binary);
        } else {
            println!(
                "{} external CLI: {} not found on PATH or --version failed",
                fail(),
                config.cli.binary
            );
            ready = false;
        }

        if config.backend.anthropic_api_key.is_some() {
            println!("{} backend API key: present", ok());
        } else {
            println!(
                "{} backend API key: missing (set ANTHROPIC_API_KEY or backend.anthropic_api_key)",
                fail()
            );
            ready = false;
        }

        for (label, dir) in [
            ("suites", &config.paths.suites_dir),
            ("fixtures", &config.paths.fixtures_dir),
            ("skills", &config.paths.skills_dir),
        ] {
            if dir.is_dir() {
                println!("{} {label} directory: {}", ok(), dir.display());
            } else {
                // Missing skills are a warning elsewhere too; only the
                // suites directory is required to run anything.
                println!("{} {label} directory: {} not found", warn_mark(), dir.display());
                if label == "suites" {
                    ready = false;
                }
            }
        }

        Ok(if ready {
            println!("\n{}", style("environment ready").green().bold());
            ExitCode::SUCCESS
        } else {
            println!("\n{}", style("environment not ready").red().bold());
            ExitCode::FAILURE
        })
    }

    fn cmd_list(config: &GauntletConfig, suite: Option<SuiteType>) -> gauntlet_core::Result<ExitCode> {
        let backend = Arc::new(NullBackend);
        let runner = Runner::new(config, backend, std::env::current_dir()?);
        let filters = RunFilters {
            suite,
            ..Default::default()
        };
        let specs = runner.discover(&filters)?;

        if specs.is_empty() {
            println!("no tests found");
            return Ok(ExitCode::SUCCESS);
        }

        println!("{:<12} {:<28} {}", "SUITE", "TEST", "SKILL");
        for spec in &specs {
            println!(
                "{:<12} {:<28} {}",
                spec.suite.as_str(),
                spec.name,
                spec.skill_id
            );
        }
        println!("\n{} test(s)", specs.len());
        Ok(ExitCode::SUCCESS)
    }

    async fn cmd_run(
        config: GauntletConfig,
        filters: RunFilters,
        output: Option<PathBuf>,
        quiet: bool,
    ) -> gauntlet_core::Result<ExitCode> {
        let api_key = config.backend.anthropic_api_key.clone().ok_or_else(|| {
            GauntletError::Config(
                "no API key configured; set ANTHROPIC_API_KEY or backend.anthropic_api_key"
                    .to_string(),
            )
        })?;
        let mut backend = AnthropicBackend::new(api_key)
            .with_max_retries(config.backend.max_retries);
        if let Some(base_url) = config.backend.base_url.clone() {
            backend = backend.with_base_url(base_url);
        }

        let runner = Runner::new(&config, Arc::new(backend), std::env::current_dir()?);
        let specs = runner.discover(&filters)?;
        if specs.is_empty() {
            println!("no tests matched the given filters");
            return Ok(ExitCode::SUCCESS);
        }

        // Ctrl-C cancels every still-running test; workspaces are
        // released before the report prints.
        let cancel = CancellationToken::new();
        let cancel_on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling run");
                cancel_on_signal.cancel();
            }
        });

        let report = runner.run(specs, cancel, !quiet).await;

        print_console(&report);
        if let Some(path) = output {
            write_json(&report, &path)?;
            println!("report written to {}", path.display());
        }

        Ok(if report.all_passed() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }
}

fn ok() -> console::StyledObject<&'static str> {
    style("✓").green()
}

fn fail() -> console::StyledObject<&'static str> {
    style("✗").red()
}

fn warn_mark() -> console::StyledObject<&'static str> {
    style("!").yellow()
}

/// Placeholder backend for commands that never request a decision.
struct NullBackend;

#[async_trait::async_trait]
impl DecisionBackend for NullBackend {
    fn name(&self) -> &str {
        "null"
    }

    async fn next_action(
        &self,
        _request: &gauntlet_llm::TurnRequest,
    ) -> gauntlet_core::Result<gauntlet_llm::AgentAction> {
        Err(GauntletError::Backend("no backend configured".to_string()))
    }

    async fn health_check(&self) -> gauntlet_core::Result<()> {
        Err(GauntletError::Backend("no backend configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_declaration_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_all_filter_flags() {
        let cli = Cli::parse_from([
            "gauntlet", "run", "--suite", "overlay", "--skill", "overlay-authoring", "--test",
            "retry", "--model", "claude-sonnet-4-20250514", "--concurrency", "2", "--output",
            "results.json", "-v",
        ]);
        match cli.command {
            Commands::Run {
                suite,
                skill,
                test,
                model,
                concurrency,
                output,
            } => {
                assert_eq!(suite, Some(SuiteType::Overlay));
                assert_eq!(skill.as_deref(), Some("overlay-authoring"));
                assert_eq!(test.as_deref(), Some("retry"));
                assert_eq!(model.as_deref(), Some("claude-sonnet-4-20250514"));
                assert_eq!(concurrency, Some(2));
                assert_eq!(output, Some(PathBuf::from("results.json")));
            }
            _ => panic!("expected run subcommand"),
        }
        assert!(cli.verbose);
    }
}

//! The per-test agent execution loop: a sequential conversation between
//! the decision backend and the tool dispatcher, bounded by turn and
//! wall-clock budgets. Whatever terminal state is reached, the workspace
//! is snapshotted and released and a `TestResult` is assembled.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use gauntlet_config::GauntletConfig;
use gauntlet_core::{
    GauntletError, Outcome, TestResult, TestSpec, Tool, Trace, WorkspaceSnapshot,
};
use gauntlet_llm::{AgentAction, DecisionBackend, TurnRecord, TurnRequest};
use gauntlet_sandbox::{Dispatcher, ExternalCli, WorkspaceManager, tool_surface};

use crate::assess::assess;

/// The slice of configuration the executor needs.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub model: String,
    pub max_turns: u32,
    pub max_test_secs: u64,
    pub max_tokens: u32,
    pub cli_binary: String,
    pub call_timeout_secs: u64,
}

impl ExecutorSettings {
    pub fn from_config(config: &GauntletConfig) -> Self {
        Self {
            model: config.harness.model.clone(),
            max_turns: config.harness.max_turns,
            max_test_secs: config.harness.max_test_secs,
            max_tokens: config.harness.max_tokens,
            cli_binary: config.cli.binary.clone(),
            call_timeout_secs: u64::from(config.cli.call_timeout_secs),
        }
    }
}

/// How the loop ended; drives outcome classification and report detail.
enum Terminal {
    /// The agent signalled completion; carries its final text.
    Completed(String),
    /// Turn or wall-clock budget exceeded.
    TimedOut(String),
    /// Harness fault: backend unreachable, retries exhausted, or the
    /// run was interrupted.
    Faulted(String),
}

pub struct Executor {
    backend: Arc<dyn DecisionBackend>,
    settings: ExecutorSettings,
}

impl Executor {
    pub fn new(backend: Arc<dyn DecisionBackend>, settings: ExecutorSettings) -> Self {
        Self { backend, settings }
    }

    /// Run one test to completion. Never returns an error: every fault
    /// is contained in the `TestResult` so one test's failure cannot
    /// abort the runner's processing of others.
    pub async fn execute(
        &self,
        spec: &TestSpec,
        manager: &WorkspaceManager,
        skill_instructions: Option<&str>,
        cancel: &CancellationToken,
    ) -> TestResult {
        let started = Instant::now();

        let workspace = match manager.acquire(&spec.name, &spec.fixture_path) {
            Ok(workspace) => workspace,
            // Fails fast — no agent turn is ever requested.
            Err(e) => return Self::spec_error_result(spec, e, started),
        };

        let cli = ExternalCli::new(
            &self.settings.cli_binary,
            Duration::from_secs(self.settings.call_timeout_secs),
        );
        let mut dispatcher = Dispatcher::new(workspace, cli);

        let tools = Arc::new(tool_surface());
        let system = compose_system(skill_instructions, &tools);
        let deadline = started + Duration::from_secs(self.settings.max_test_secs);
        let mut transcript: Vec<TurnRecord> = Vec::new();
        let mut turn: u32 = 0;

        let terminal = loop {
            turn += 1;
            if turn > self.settings.max_turns {
                break Terminal::TimedOut(format!(
                    "turn budget exhausted ({} turns)",
                    self.settings.max_turns
                ));
            }
            if Instant::now() >= deadline {
                break Terminal::TimedOut(format!(
                    "time budget exhausted ({}s)",
                    self.settings.max_test_secs
                ));
            }
            if cancel.is_cancelled() {
                break Terminal::Faulted("run interrupted".to_string());
            }

            let request = TurnRequest {
                model: self.settings.model.clone(),
                system: system.clone(),
                task: spec.task_prompt.clone(),
                transcript: transcript.clone(),
                tools: tools.clone(),
                max_tokens: self.settings.max_tokens,
            };

            let action = tokio::select! {
                _ = cancel.cancelled() => {
                    break Terminal::Faulted("run interrupted".to_string());
                }
                action = self.backend.next_action(&request) => action,
            };

            match action {
                Ok(AgentAction::Done(text)) => break Terminal::Completed(text),
                Ok(AgentAction::ToolCall(call)) => {
                    debug!(test = %spec.name, turn, tool = %call.tool_name, args = %call.arguments, "tool call");
                    // In-flight calls run to completion (or their own
                    // per-call timeout); the budgets are re-checked at
                    // the top of the next turn.
                    let result = dispatcher.dispatch(&call).await;
                    debug!(
                        test = %spec.name,
                        turn,
                        tool = %call.tool_name,
                        error = result.is_error(),
                        "tool result"
                    );
                    transcript.push(TurnRecord { call, result });
                }
                Err(e) => break Terminal::Faulted(e.to_string()),
            }
        };

        let (workspace, trace) = dispatcher.finish();
        let final_snapshot = match workspace.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(test = %spec.name, error = %e, "failed to snapshot workspace");
                WorkspaceSnapshot::default()
            }
        };

        let (checks, outcome, harness_error) = match terminal {
            Terminal::Completed(final_text) => {
                let checks = assess(&spec.expectations, &trace, workspace.dir(), &final_text);
                let outcome = if checks.iter().all(|c| c.passed) {
                    Outcome::Pass
                } else {
                    Outcome::Fail
                };
                (checks, outcome, None)
            }
            Terminal::TimedOut(reason) => {
                warn!(test = %spec.name, reason, "test timed out");
                (Vec::new(), Outcome::Timeout, Some(reason))
            }
            Terminal::Faulted(reason) => {
                warn!(test = %spec.name, reason, "harness fault");
                (Vec::new(), Outcome::Error, Some(reason))
            }
        };

        workspace.release();

        TestResult {
            spec: spec.clone(),
            trace,
            final_snapshot,
            checks,
            outcome,
            harness_error,
            duration_secs: started.elapsed().as_secs_f64(),
        }
    }

    fn spec_error_result(spec: &TestSpec, error: GauntletError, started: Instant) -> TestResult {
        warn!(test = %spec.name, error = %error, "test could not start");
        TestResult {
            spec: spec.clone(),
            trace: Trace::new(),
            final_snapshot: WorkspaceSnapshot::default(),
            checks: Vec::new(),
            outcome: Outcome::Error,
            harness_error: Some(error.to_string()),
            duration_secs: started.elapsed().as_secs_f64(),
        }
    }
}

/// System context: skill instructions (when the skill ships a SKILL.md)
/// followed by the declared tool surface.
fn compose_system(skill_instructions: Option<&str>, tools: &[Tool]) -> String {
    let mut system = String::from(
        "You are completing a task inside an isolated workspace. \
         Use the available tools to do the work, then reply with a short \
         summary when you are finished. All paths are relative to the \
         workspace root.",
    );

    if let Some(instructions) = skill_instructions {
        system.push_str("\n\n<skill_instructions>\n");
        system.push_str(instructions);
        system.push_str("\n</skill_instructions>");
    }

    system.push_str("\n\nAvailable tools:\n");
    for tool in tools {
        system.push_str(&format!("- {}: {}\n", tool.name, tool.description));
    }
    system
}

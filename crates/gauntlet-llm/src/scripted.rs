//! Deterministic scripted backend for testing the harness itself.
//!
//! Returns pre-queued actions without any network calls.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use gauntlet_core::{GauntletError, Result, ToolCall};

use crate::backend::{AgentAction, DecisionBackend, TurnRequest};

/// One queued step of a scripted run.
#[derive(Clone)]
enum Step {
    Action(ScriptedAction),
    Error(String),
}

#[derive(Clone)]
enum ScriptedAction {
    Call { tool: String, args: serde_json::Value },
    Done(String),
}

/// A scripted decision backend that plays back a fixed action sequence.
///
/// # Example
/// ```
/// use gauntlet_llm::ScriptedBackend;
/// let backend = ScriptedBackend::new()
///     .then_call("cli_lint", serde_json::json!({"spec": "openapi.yaml"}))
///     .then_done("lint is clean");
/// ```
pub struct ScriptedBackend {
    steps: Arc<Mutex<Vec<Step>>>,
    /// Every request received, for assertions in tests.
    requests: Arc<Mutex<Vec<TurnRequest>>>,
    /// Artificial delay per decision, for timeout tests.
    delay: Option<std::time::Duration>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            steps: Arc::new(Mutex::new(vec![])),
            requests: Arc::new(Mutex::new(vec![])),
            delay: None,
        }
    }

    /// Queue a tool call.
    pub fn then_call(self, tool: &str, args: serde_json::Value) -> Self {
        self.steps.lock().unwrap().push(Step::Action(ScriptedAction::Call {
            tool: tool.to_string(),
            args,
        }));
        self
    }

    /// Queue a completion signal with final text.
    pub fn then_done(self, text: &str) -> Self {
        self.steps
            .lock()
            .unwrap()
            .push(Step::Action(ScriptedAction::Done(text.to_string())));
        self
    }

    /// Queue a backend failure (simulates retries exhausted).
    pub fn then_error(self, message: &str) -> Self {
        self.steps
            .lock()
            .unwrap()
            .push(Step::Error(message.to_string()));
        self
    }

    /// Sleep this long before every decision.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// All requests this backend has received.
    pub fn recorded_requests(&self) -> Arc<Mutex<Vec<TurnRequest>>> {
        Arc::clone(&self.requests)
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock().unwrap();
        if steps.is_empty() {
            // An exhausted script completes rather than wedging the loop.
            Step::Action(ScriptedAction::Done("(script exhausted)".to_string()))
        } else {
            steps.remove(0)
        }
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DecisionBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn next_action(&self, request: &TurnRequest) -> Result<AgentAction> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.next_step() {
            Step::Error(message) => Err(GauntletError::Backend(message)),
            Step::Action(ScriptedAction::Done(text)) => Ok(AgentAction::Done(text)),
            Step::Action(ScriptedAction::Call { tool, args }) => {
                Ok(AgentAction::ToolCall(ToolCall {
                    id: format!("call_{}", uuid::Uuid::new_v4()),
                    tool_name: tool,
                    arguments: args,
                }))
            }
        }
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauntlet_core::Tool;

    fn request() -> TurnRequest {
        TurnRequest {
            model: "scripted".into(),
            system: "sys".into(),
            task: "task".into(),
            transcript: vec![],
            tools: Arc::new(Vec::<Tool>::new()),
            max_tokens: 256,
        }
    }

    #[tokio::test]
    async fn plays_back_steps_in_order() {
        let backend = ScriptedBackend::new()
            .then_call("cli_lint", serde_json::json!({"spec": "openapi.yaml"}))
            .then_done("done");

        match backend.next_action(&request()).await.unwrap() {
            AgentAction::ToolCall(call) => assert_eq!(call.tool_name, "cli_lint"),
            AgentAction::Done(_) => panic!("expected tool call first"),
        }
        match backend.next_action(&request()).await.unwrap() {
            AgentAction::Done(text) => assert_eq!(text, "done"),
            AgentAction::ToolCall(_) => panic!("expected completion second"),
        }
    }

    #[tokio::test]
    async fn exhausted_script_completes() {
        let backend = ScriptedBackend::new();
        match backend.next_action(&request()).await.unwrap() {
            AgentAction::Done(text) => assert!(text.contains("exhausted")),
            AgentAction::ToolCall(_) => panic!("expected completion"),
        }
    }

    #[tokio::test]
    async fn queued_error_surfaces() {
        let backend = ScriptedBackend::new().then_error("backend unreachable");
        let err = backend.next_action(&request()).await.unwrap_err();
        assert!(matches!(err, GauntletError::Backend(_)));
    }

    #[tokio::test]
    async fn records_requests() {
        let backend = ScriptedBackend::new().then_done("ok");
        let _ = backend.next_action(&request()).await;
        let recorded = backend.recorded_requests();
        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].task, "task");
    }
}

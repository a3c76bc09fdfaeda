use async_trait::async_trait;
use std::sync::Arc;

use gauntlet_core::{Result, Tool, ToolCall, ToolResult};

/// One completed turn: the call the agent requested and the result the
/// dispatcher produced. The transcript is the trace from the agent's
/// point of view.
#[derive(Debug, Clone)]
pub struct TurnRecord {
    pub call: ToolCall,
    pub result: ToolResult,
}

/// A request for the agent's next decision.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// Model identifier, e.g. "claude-sonnet-4-20250514".
    pub model: String,
    /// System context: skill instructions + tool surface description.
    pub system: String,
    /// The task prompt (first user turn).
    pub task: String,
    /// Completed turns so far, oldest first.
    pub transcript: Vec<TurnRecord>,
    /// Tools the agent may call.
    pub tools: Arc<Vec<Tool>>,
    /// Maximum tokens for the response.
    pub max_tokens: u32,
}

/// What the agent decided to do next.
#[derive(Debug, Clone)]
pub enum AgentAction {
    /// Invoke a tool and wait for its result.
    ToolCall(ToolCall),
    /// The agent considers the task finished; carries its final text.
    Done(String),
}

/// The decision-making black box. Each concrete backend maps
/// {context, trace so far} to the next action; any implementation can be
/// substituted behind this seam.
#[async_trait]
pub trait DecisionBackend: Send + Sync {
    /// Human-readable name, e.g. "anthropic", "scripted".
    fn name(&self) -> &str;

    /// Request the next action. Backends handle their own transient
    /// retries; an error here means retries are exhausted and the test
    /// closes out with a harness-fault outcome.
    async fn next_action(&self, request: &TurnRequest) -> Result<AgentAction>;

    /// Check whether the backend is reachable and ready.
    async fn health_check(&self) -> Result<()>;
}

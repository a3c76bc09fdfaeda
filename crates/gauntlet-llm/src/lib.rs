//! # gauntlet-llm
//!
//! The decision-making seam of the harness. The agent is an external,
//! non-deterministic black box behind [`DecisionBackend`]: given the
//! context and the transcript so far, it returns either the next tool
//! call or a completion signal. The hosted Anthropic backend drives real
//! evaluation runs; [`ScriptedBackend`] drives deterministic harness
//! tests without cost or flakiness.

pub mod anthropic;
pub mod backend;
pub mod scripted;

pub use anthropic::AnthropicBackend;
pub use backend::{AgentAction, DecisionBackend, TurnRecord, TurnRequest};
pub use scripted::ScriptedBackend;

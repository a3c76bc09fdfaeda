//! # gauntlet-core
//!
//! Core types for the Gauntlet behavioral test harness.
//! This crate defines the shared vocabulary used by every other crate in
//! the workspace: the error type, the tool-call protocol, the test
//! specification model, the execution trace, and the result types.

pub mod error;
pub mod outcome;
pub mod spec;
pub mod tool;
pub mod trace;

pub use error::{GauntletError, Result};
pub use outcome::{CheckResult, Outcome, RunReport, SuiteResult, TestResult, WorkspaceSnapshot};
pub use spec::{Expectations, SuiteType, TestSpec, WorkflowStep};
pub use tool::{Tool, ToolCall, ToolError, ToolErrorKind, ToolResult};
pub use trace::{Trace, TraceEntry};

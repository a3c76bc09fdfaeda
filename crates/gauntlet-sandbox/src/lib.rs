//! # gauntlet-sandbox
//!
//! Per-test isolation. A [`Workspace`] is an exclusively-owned ephemeral
//! directory seeded with a copy of a fixture; the [`Dispatcher`] bound to
//! it is the only component that touches the workspace during a run and
//! the single writer of the test's [`gauntlet_core::Trace`].

pub mod dispatch;
pub mod external;
pub mod workspace;

pub use dispatch::{Dispatcher, tool_surface};
pub use external::ExternalCli;
pub use workspace::{Workspace, WorkspaceManager};

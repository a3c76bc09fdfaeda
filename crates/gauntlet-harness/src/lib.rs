//! Test orchestration: the per-test agent execution loop, the assessor
//! that grades final workspace state against declared expectations, and
//! the runner/reporter that schedules tests and aggregates results.

pub mod assess;
pub mod checks;
pub mod executor;
pub mod report;
pub mod runner;
pub mod skill;
pub mod suite;

pub use assess::assess;
pub use executor::{Executor, ExecutorSettings};
pub use report::{print_console, write_json};
pub use runner::{RunFilters, Runner};
pub use skill::SkillLibrary;
pub use suite::SuiteLoader;

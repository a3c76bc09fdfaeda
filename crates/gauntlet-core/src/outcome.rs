use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::spec::{SuiteType, TestSpec};
use crate::trace::Trace;

/// One assertion evaluated by the assessor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn pass(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            detail: detail.into(),
        }
    }

    pub fn fail(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            detail: detail.into(),
        }
    }
}

/// Terminal classification of one test run. `Fail` means the agent did
/// the wrong thing; `Error` and `Timeout` mean the harness failed to
/// observe a result — the report never conflates the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    Fail,
    Error,
    Timeout,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Pass => "pass",
            Outcome::Fail => "fail",
            Outcome::Error => "error",
            Outcome::Timeout => "timeout",
        }
    }
}

/// Final workspace state captured after the agent loop terminates,
/// diffed against the seeded fixture.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    /// All files present at the end, relative paths, sorted.
    pub files: Vec<String>,
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
}

/// Everything recorded about one test run. Assembled exactly once,
/// immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub spec: TestSpec,
    pub trace: Trace,
    pub final_snapshot: WorkspaceSnapshot,
    pub checks: Vec<CheckResult>,
    pub outcome: Outcome,
    /// Harness-level failure message for `error`/`timeout` outcomes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harness_error: Option<String>,
    pub duration_secs: f64,
}

impl TestResult {
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Pass
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

/// Aggregation of test results for one suite. Purely derived — computed
/// from the results, never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub suite: SuiteType,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub timed_out: usize,
    pub results: Vec<TestResult>,
}

impl SuiteResult {
    pub fn from_results(suite: SuiteType, results: Vec<TestResult>) -> Self {
        let count = |o: Outcome| results.iter().filter(|r| r.outcome == o).count();
        Self {
            suite,
            total: results.len(),
            passed: count(Outcome::Pass),
            failed: count(Outcome::Fail),
            errored: count(Outcome::Error),
            timed_out: count(Outcome::Timeout),
            results,
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64
        }
    }
}

/// The aggregated output of one harness run. Both the console summary and
/// the JSON report are projections of this single structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub suites: Vec<SuiteResult>,
}

impl RunReport {
    pub fn new(model: impl Into<String>, suites: Vec<SuiteResult>) -> Self {
        Self {
            timestamp: Utc::now(),
            model: model.into(),
            suites,
        }
    }

    pub fn total(&self) -> usize {
        self.suites.iter().map(|s| s.total).sum()
    }

    pub fn passed(&self) -> usize {
        self.suites.iter().map(|s| s.passed).sum()
    }

    pub fn pass_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.passed() as f64 / total as f64
        }
    }

    /// True iff every executed test passed — drives the process exit code.
    pub fn all_passed(&self) -> bool {
        self.passed() == self.total()
    }
}

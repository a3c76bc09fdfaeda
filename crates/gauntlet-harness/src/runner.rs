//! Schedules test executions under a bounded-concurrency pool and
//! aggregates results. Tests are independent units of work: each owns
//! exactly one workspace and shares nothing else, so the only
//! cross-test coordination is the admission semaphore.

use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use gauntlet_config::GauntletConfig;
use gauntlet_core::{
    Outcome, Result, RunReport, SuiteResult, SuiteType, TestResult, TestSpec, Trace,
    WorkspaceSnapshot,
};
use gauntlet_llm::DecisionBackend;
use gauntlet_sandbox::WorkspaceManager;

use crate::executor::{Executor, ExecutorSettings};
use crate::skill::SkillLibrary;
use crate::suite::SuiteLoader;

/// Which discovered tests to execute. Filtered-out tests are dropped
/// before any workspace is provisioned.
#[derive(Debug, Clone, Default)]
pub struct RunFilters {
    pub suite: Option<SuiteType>,
    pub skill: Option<String>,
    pub test: Option<String>,
}

impl RunFilters {
    pub fn matches(&self, spec: &TestSpec) -> bool {
        if self.suite.is_some_and(|s| s != spec.suite) {
            return false;
        }
        if self
            .skill
            .as_deref()
            .is_some_and(|skill| skill != spec.skill_id)
        {
            return false;
        }
        if self
            .test
            .as_deref()
            .is_some_and(|substr| !spec.name.contains(substr))
        {
            return false;
        }
        true
    }
}

pub struct Runner {
    executor: Arc<Executor>,
    manager: Arc<WorkspaceManager>,
    suites_dir: PathBuf,
    skills_dir: PathBuf,
    base_dir: PathBuf,
    concurrency: usize,
    model: String,
}

impl Runner {
    /// `base_dir` is the project root against which the configured
    /// suites/fixtures/skills paths are resolved.
    pub fn new(
        config: &GauntletConfig,
        backend: Arc<dyn DecisionBackend>,
        base_dir: PathBuf,
    ) -> Self {
        let settings = ExecutorSettings::from_config(config);
        let model = settings.model.clone();
        Self {
            executor: Arc::new(Executor::new(backend, settings)),
            manager: Arc::new(WorkspaceManager::new(config.paths.workspace_root.clone())),
            suites_dir: base_dir.join(&config.paths.suites_dir),
            skills_dir: base_dir.join(&config.paths.skills_dir),
            base_dir,
            concurrency: config.harness.concurrency,
            model,
        }
    }

    /// Discover every test spec, already filtered.
    pub fn discover(&self, filters: &RunFilters) -> Result<Vec<TestSpec>> {
        let loader = SuiteLoader::new(&self.suites_dir, &self.base_dir);
        let specs = loader.discover()?;
        Ok(specs
            .into_iter()
            .filter(|spec| filters.matches(spec))
            .collect())
    }

    /// Execute the given specs and aggregate per-suite results. One
    /// test's fault never aborts the others; cancelling the token stops
    /// every still-running test while its workspace is still released.
    pub async fn run(
        &self,
        specs: Vec<TestSpec>,
        cancel: CancellationToken,
        show_progress: bool,
    ) -> RunReport {
        info!(
            tests = specs.len(),
            concurrency = self.concurrency,
            model = %self.model,
            "starting run"
        );

        let bar = if show_progress {
            let bar = ProgressBar::new(specs.len() as u64);
            if let Ok(style) =
                ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            {
                bar.set_style(style);
            }
            bar
        } else {
            ProgressBar::hidden()
        };

        let semaphore = Arc::new(Semaphore::new(self.concurrency.max(1)));
        let mut skills = SkillLibrary::new(&self.skills_dir);
        let mut join_set = JoinSet::new();

        for spec in specs {
            let instructions = skills.instructions(&spec.skill_id);
            let executor = Arc::clone(&self.executor);
            let manager = Arc::clone(&self.manager);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();

            join_set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return interrupted_result(spec, "runner shut down"),
                };
                // A test cancelled while queued never provisions a
                // workspace at all.
                if cancel.is_cancelled() {
                    return interrupted_result(spec, "run interrupted");
                }
                executor
                    .execute(&spec, &manager, instructions.as_deref(), &cancel)
                    .await
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => {
                    bar.set_message(format!(
                        "{} {}",
                        result.spec.name,
                        result.outcome.as_str()
                    ));
                    bar.inc(1);
                    results.push(result);
                }
                Err(e) => warn!(error = %e, "test task panicked"),
            }
        }
        bar.finish_and_clear();

        let suites = SuiteType::ALL
            .into_iter()
            .filter_map(|suite| {
                let group: Vec<TestResult> = results
                    .iter()
                    .filter(|r| r.spec.suite == suite)
                    .cloned()
                    .collect();
                (!group.is_empty()).then(|| SuiteResult::from_results(suite, group))
            })
            .collect();

        RunReport::new(&self.model, suites)
    }
}

fn interrupted_result(spec: TestSpec, reason: &str) -> TestResult {
    TestResult {
        spec,
        trace: Trace::new(),
        final_snapshot: WorkspaceSnapshot::default(),
        checks: Vec::new(),
        outcome: Outcome::Error,
        harness_error: Some(reason.to_string()),
        duration_secs: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauntlet_core::Expectations;

    fn spec(name: &str, suite: SuiteType, skill: &str) -> TestSpec {
        TestSpec {
            name: name.into(),
            suite,
            skill_id: skill.into(),
            target_language: None,
            fixture_path: "/fixtures/x".into(),
            task_prompt: "do it".into(),
            expectations: Expectations::Generation {
                created_files: vec!["out.txt".into()],
            },
        }
    }

    #[test]
    fn filters_match_suite_skill_and_name_substring() {
        let gen_spec = spec("ts-minimal-sdk", SuiteType::Generation, "sdk-generation");
        let wf = spec("full-pipeline", SuiteType::Workflow, "sdk-workflow");

        let by_suite = RunFilters {
            suite: Some(SuiteType::Generation),
            ..Default::default()
        };
        assert!(by_suite.matches(&gen_spec));
        assert!(!by_suite.matches(&wf));

        let by_skill = RunFilters {
            skill: Some("sdk-workflow".into()),
            ..Default::default()
        };
        assert!(by_skill.matches(&wf));
        assert!(!by_skill.matches(&gen_spec));

        let by_name = RunFilters {
            test: Some("minimal".into()),
            ..Default::default()
        };
        assert!(by_name.matches(&gen_spec));
        assert!(!by_name.matches(&wf));
    }

    #[test]
    fn empty_filters_match_everything() {
        let gen_spec = spec("anything", SuiteType::Diagnosis, "triage");
        assert!(RunFilters::default().matches(&gen_spec));
    }
}

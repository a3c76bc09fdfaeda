use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{GauntletError, Result};

/// Which expectation shape a test carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuiteType {
    Generation,
    Overlay,
    Diagnosis,
    Workflow,
}

impl SuiteType {
    pub const ALL: [SuiteType; 4] = [
        SuiteType::Generation,
        SuiteType::Overlay,
        SuiteType::Diagnosis,
        SuiteType::Workflow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SuiteType::Generation => "generation",
            SuiteType::Overlay => "overlay",
            SuiteType::Diagnosis => "diagnosis",
            SuiteType::Workflow => "workflow",
        }
    }
}

impl fmt::Display for SuiteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SuiteType {
    type Err = GauntletError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "generation" => Ok(SuiteType::Generation),
            "overlay" => Ok(SuiteType::Overlay),
            "diagnosis" => Ok(SuiteType::Diagnosis),
            "workflow" => Ok(SuiteType::Workflow),
            other => Err(GauntletError::Config(format!(
                "unknown suite type: {other}"
            ))),
        }
    }
}

/// One declared step of a workflow expectation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub name: String,
    /// Tool that must appear in the trace, in declared order.
    pub tool: String,
    /// File that must exist after this step, if declared.
    #[serde(default)]
    pub creates_file: Option<String>,
}

/// Suite-type-specific expectation set. Every variant carries at least
/// one verifiable predicate; an empty set is a spec error at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectations {
    Generation {
        created_files: Vec<String>,
    },
    Overlay {
        overlay_path: String,
        expected_extensions: Vec<String>,
    },
    Diagnosis {
        diagnostic_tool: String,
        expected_category: String,
    },
    Workflow {
        steps: Vec<WorkflowStep>,
    },
}

impl Expectations {
    /// The suite type this expectation shape belongs to.
    pub fn suite_type(&self) -> SuiteType {
        match self {
            Expectations::Generation { .. } => SuiteType::Generation,
            Expectations::Overlay { .. } => SuiteType::Overlay,
            Expectations::Diagnosis { .. } => SuiteType::Diagnosis,
            Expectations::Workflow { .. } => SuiteType::Workflow,
        }
    }

    /// Parse an `expect` block against the suite type declared by the
    /// containing suite file. A shape mismatch or an empty expectation
    /// set is a configuration error, never a silent no-op.
    pub fn parse(suite: SuiteType, test: &str, raw: serde_yaml::Value) -> Result<Self> {
        let invalid = |reason: String| GauntletError::SpecInvalid {
            test: test.to_string(),
            reason,
        };

        let expectations: Expectations = match suite {
            SuiteType::Generation => {
                #[derive(Deserialize)]
                struct Raw {
                    created_files: Vec<String>,
                }
                let raw: Raw = serde_yaml::from_value(raw).map_err(|e| {
                    invalid(format!("expect block does not match generation suite: {e}"))
                })?;
                Expectations::Generation {
                    created_files: raw.created_files,
                }
            }
            SuiteType::Overlay => {
                #[derive(Deserialize)]
                struct Raw {
                    overlay_path: String,
                    expected_extensions: Vec<String>,
                }
                let raw: Raw = serde_yaml::from_value(raw).map_err(|e| {
                    invalid(format!("expect block does not match overlay suite: {e}"))
                })?;
                Expectations::Overlay {
                    overlay_path: raw.overlay_path,
                    expected_extensions: raw.expected_extensions,
                }
            }
            SuiteType::Diagnosis => {
                #[derive(Deserialize)]
                struct Raw {
                    diagnostic_tool: String,
                    expected_category: String,
                }
                let raw: Raw = serde_yaml::from_value(raw).map_err(|e| {
                    invalid(format!("expect block does not match diagnosis suite: {e}"))
                })?;
                Expectations::Diagnosis {
                    diagnostic_tool: raw.diagnostic_tool,
                    expected_category: raw.expected_category,
                }
            }
            SuiteType::Workflow => {
                #[derive(Deserialize)]
                struct Raw {
                    steps: Vec<WorkflowStep>,
                }
                let raw: Raw = serde_yaml::from_value(raw).map_err(|e| {
                    invalid(format!("expect block does not match workflow suite: {e}"))
                })?;
                Expectations::Workflow { steps: raw.steps }
            }
        };

        expectations.validate(test)?;
        Ok(expectations)
    }

    /// Reject expectation sets with nothing to verify.
    pub fn validate(&self, test: &str) -> Result<()> {
        let empty = match self {
            Expectations::Generation { created_files } => created_files.is_empty(),
            Expectations::Overlay {
                expected_extensions,
                overlay_path,
            } => expected_extensions.is_empty() || overlay_path.is_empty(),
            Expectations::Diagnosis {
                diagnostic_tool,
                expected_category,
            } => diagnostic_tool.is_empty() || expected_category.is_empty(),
            Expectations::Workflow { steps } => steps.is_empty(),
        };
        if empty {
            return Err(GauntletError::SpecInvalid {
                test: test.to_string(),
                reason: "expectation set has no verifiable predicate".to_string(),
            });
        }
        Ok(())
    }
}

/// A single test case, immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSpec {
    pub name: String,
    pub suite: SuiteType,
    /// The skill under test; its instructions are injected into the
    /// system context when available.
    pub skill_id: String,
    /// Target SDK language for generation-style tests.
    #[serde(default)]
    pub target_language: Option<String>,
    /// Fixture directory copied into each workspace before the run.
    pub fixture_path: PathBuf,
    /// The task handed to the agent as its first user turn.
    pub task_prompt: String,
    pub expectations: Expectations,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_generation_expectations() {
        let raw: serde_yaml::Value =
            serde_yaml::from_str("created_files: [\"sdk/typescript/src/index.ts\"]").unwrap();
        let exp = Expectations::parse(SuiteType::Generation, "t", raw).unwrap();
        assert_eq!(exp.suite_type(), SuiteType::Generation);
    }

    #[test]
    fn shape_mismatch_is_a_spec_error() {
        // Overlay expectations declared on a workflow test.
        let raw: serde_yaml::Value =
            serde_yaml::from_str("expected_extensions: [\"x-retry-policy\"]").unwrap();
        let err = Expectations::parse(SuiteType::Workflow, "mismatched", raw).unwrap_err();
        assert!(matches!(err, GauntletError::SpecInvalid { .. }));
    }

    #[test]
    fn empty_expectation_set_is_rejected() {
        let raw: serde_yaml::Value = serde_yaml::from_str("created_files: []").unwrap();
        let err = Expectations::parse(SuiteType::Generation, "empty", raw).unwrap_err();
        assert!(matches!(err, GauntletError::SpecInvalid { .. }));
    }

    #[test]
    fn suite_type_round_trips_through_str() {
        for suite in SuiteType::ALL {
            assert_eq!(suite.as_str().parse::<SuiteType>().unwrap(), suite);
        }
    }
}

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use gauntlet_core::{Expectations, GauntletError, Result, SuiteType, TestSpec};

/// On-disk shape of one suite file: a suite type and a list of tests.
#[derive(Debug, Deserialize)]
struct RawSuiteFile {
    suite: String,
    #[serde(default)]
    tests: Vec<RawTest>,
}

#[derive(Debug, Deserialize)]
struct RawTest {
    name: String,
    skill: String,
    #[serde(default)]
    target: Option<String>,
    fixture: String,
    prompt: String,
    expect: serde_yaml::Value,
}

/// Discovers suite files and parses them into validated `TestSpec`s.
///
/// Fixture paths inside suite files are resolved against `base_dir`
/// (the project root), not against the suite file itself.
pub struct SuiteLoader {
    suites_dir: PathBuf,
    base_dir: PathBuf,
}

impl SuiteLoader {
    pub fn new(suites_dir: impl Into<PathBuf>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            suites_dir: suites_dir.into(),
            base_dir: base_dir.into(),
        }
    }

    /// Load every `.yaml`/`.yml` suite file under the suites directory,
    /// sorted by file name for a stable test order.
    pub fn discover(&self) -> Result<Vec<TestSpec>> {
        if !self.suites_dir.is_dir() {
            return Err(GauntletError::Config(format!(
                "suites directory not found: {}",
                self.suites_dir.display()
            )));
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.suites_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .is_some_and(|ext| ext == "yaml" || ext == "yml")
            })
            .collect();
        paths.sort();

        let mut specs = Vec::new();
        for path in paths {
            let mut loaded = self.load_file(&path)?;
            debug!(file = %path.display(), tests = loaded.len(), "loaded suite file");
            specs.append(&mut loaded);
        }
        info!(tests = specs.len(), "suite discovery complete");
        Ok(specs)
    }

    /// Parse one suite file. Every `expect` block is validated against
    /// the file's declared suite type at load time.
    pub fn load_file(&self, path: &Path) -> Result<Vec<TestSpec>> {
        let text = std::fs::read_to_string(path).map_err(|e| GauntletError::SuiteFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let raw: RawSuiteFile =
            serde_yaml::from_str(&text).map_err(|e| GauntletError::SuiteFile {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let suite: SuiteType = raw.suite.parse().map_err(|_| GauntletError::SuiteFile {
            path: path.to_path_buf(),
            reason: format!("unknown suite type: {}", raw.suite),
        })?;

        raw.tests
            .into_iter()
            .map(|test| {
                let expectations = Expectations::parse(suite, &test.name, test.expect)?;
                Ok(TestSpec {
                    name: test.name,
                    suite,
                    skill_id: test.skill,
                    target_language: test.target,
                    fixture_path: self.base_dir.join(test.fixture),
                    task_prompt: test.prompt,
                    expectations,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENERATION_SUITE: &str = r#"
suite: generation
tests:
  - name: ts-minimal-sdk
    skill: sdk-generation
    target: typescript
    fixture: fixtures/minimal-api
    prompt: "Generate a TypeScript SDK from openapi.yaml"
    expect:
      created_files: ["sdk/typescript/src/index.ts"]
"#;

    fn write_suite(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn discovers_and_parses_suite_files() {
        let dir = tempfile::tempdir().unwrap();
        write_suite(dir.path(), "generation.yaml", GENERATION_SUITE);

        let loader = SuiteLoader::new(dir.path(), "/project");
        let specs = loader.discover().unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "ts-minimal-sdk");
        assert_eq!(specs[0].suite, SuiteType::Generation);
        assert_eq!(specs[0].skill_id, "sdk-generation");
        assert_eq!(
            specs[0].fixture_path,
            PathBuf::from("/project/fixtures/minimal-api")
        );
    }

    #[test]
    fn mismatched_expect_shape_fails_at_load_time() {
        let dir = tempfile::tempdir().unwrap();
        write_suite(
            dir.path(),
            "bad.yaml",
            r#"
suite: workflow
tests:
  - name: mismatched
    skill: sdk-generation
    fixture: fixtures/minimal-api
    prompt: "do the thing"
    expect:
      expected_extensions: ["x-retry-policy"]
"#,
        );

        let loader = SuiteLoader::new(dir.path(), "/project");
        let err = loader.discover().unwrap_err();
        assert!(matches!(err, GauntletError::SpecInvalid { .. }));
    }

    #[test]
    fn unknown_suite_type_is_a_suite_file_error() {
        let dir = tempfile::tempdir().unwrap();
        write_suite(dir.path(), "bad.yaml", "suite: chaos\ntests: []\n");

        let loader = SuiteLoader::new(dir.path(), "/project");
        let err = loader.discover().unwrap_err();
        assert!(matches!(err, GauntletError::SuiteFile { .. }));
    }

    #[test]
    fn missing_suites_dir_is_a_config_error() {
        let loader = SuiteLoader::new("/nonexistent/suites", "/project");
        assert!(matches!(
            loader.discover().unwrap_err(),
            GauntletError::Config(_)
        ));
    }
}

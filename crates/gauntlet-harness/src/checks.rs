//! Composable assertion primitives. Each predicate returns a
//! `CheckResult` with a human-readable detail so failure diagnostics
//! read well in both report projections.

use std::path::Path;

use gauntlet_core::{CheckResult, Trace};

pub fn file_exists(workspace: &Path, rel: &str) -> CheckResult {
    let name = format!("file_exists:{rel}");
    if workspace.join(rel).is_file() {
        CheckResult::pass(name, format!("{rel} exists"))
    } else {
        CheckResult::fail(name, format!("expected file {rel} was not created"))
    }
}

pub fn contains_text(workspace: &Path, rel: &str, needle: &str) -> CheckResult {
    let name = format!("contains_text:{rel}");
    match std::fs::read_to_string(workspace.join(rel)) {
        Ok(content) if content.contains(needle) => {
            CheckResult::pass(name, format!("{rel} contains {needle:?}"))
        }
        Ok(_) => CheckResult::fail(name, format!("{rel} does not contain {needle:?}")),
        Err(e) => CheckResult::fail(name, format!("cannot read {rel}: {e}")),
    }
}

/// Parse a workspace file as YAML. Returns the parsed document alongside
/// the check so suite compositions can run structural checks on it
/// without re-reading the file.
pub fn valid_yaml(workspace: &Path, rel: &str) -> (CheckResult, Option<serde_yaml::Value>) {
    let name = format!("valid_yaml:{rel}");
    let text = match std::fs::read_to_string(workspace.join(rel)) {
        Ok(text) => text,
        Err(e) => {
            return (
                CheckResult::fail(name, format!("cannot read {rel}: {e}")),
                None,
            );
        }
    };
    match serde_yaml::from_str::<serde_yaml::Value>(&text) {
        Ok(doc) => (CheckResult::pass(name, format!("{rel} is valid YAML")), Some(doc)),
        Err(e) => (
            CheckResult::fail(name, format!("{rel} is not valid YAML: {e}")),
            None,
        ),
    }
}

pub fn tool_was_called(trace: &Trace, tool: &str) -> CheckResult {
    let name = format!("tool_was_called:{tool}");
    if trace.tool_was_called(tool) {
        CheckResult::pass(name, format!("{tool} appears in the trace"))
    } else {
        CheckResult::fail(name, format!("{tool} was never called"))
    }
}

/// `first` must appear in the trace strictly before the first call to
/// `second`.
pub fn tool_called_before(trace: &Trace, first: &str, second: &str) -> CheckResult {
    let name = format!("tool_called_before:{first}<{second}");
    match (trace.first_call_of(first), trace.first_call_of(second)) {
        (Some(a), Some(b)) if a < b => {
            CheckResult::pass(name, format!("{first} (#{a}) preceded {second} (#{b})"))
        }
        (Some(a), Some(b)) => CheckResult::fail(
            name,
            format!("{second} (#{b}) was called before {first} (#{a})"),
        ),
        (None, _) => CheckResult::fail(name, format!("{first} was never called")),
        (_, None) => CheckResult::fail(name, format!("{second} was never called")),
    }
}

/// Whether an extension key appears anywhere in a parsed overlay
/// document — either as a mapping key or inside an action's `update`
/// block.
pub fn extension_present(doc: &serde_yaml::Value, key: &str) -> bool {
    match doc {
        serde_yaml::Value::Mapping(map) => map.iter().any(|(k, v)| {
            k.as_str() == Some(key) || extension_present(v, key)
        }),
        serde_yaml::Value::Sequence(seq) => seq.iter().any(|v| extension_present(v, key)),
        _ => false,
    }
}

/// One check per expected extension key; a missing key fails with a
/// detail naming it.
pub fn extensions_present_in_overlay(
    doc: &serde_yaml::Value,
    overlay_path: &str,
    keys: &[String],
) -> Vec<CheckResult> {
    keys.iter()
        .map(|key| {
            let name = format!("extension:{key}");
            if extension_present(doc, key) {
                CheckResult::pass(name, format!("{overlay_path} carries {key}"))
            } else {
                CheckResult::fail(
                    name,
                    format!("{overlay_path} is missing extension key '{key}'"),
                )
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauntlet_core::{ToolCall, ToolResult};

    fn trace_of(tools: &[&str]) -> Trace {
        let mut trace = Trace::new();
        for tool in tools {
            let call = ToolCall {
                id: format!("call_{tool}"),
                tool_name: tool.to_string(),
                arguments: serde_json::json!({}),
            };
            let result = ToolResult::ok(&call.id, "ok");
            trace.record(call, result);
        }
        trace
    }

    #[test]
    fn file_exists_reports_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hi").unwrap();

        assert!(file_exists(dir.path(), "a.txt").passed);
        let missing = file_exists(dir.path(), "b.txt");
        assert!(!missing.passed);
        assert!(missing.detail.contains("b.txt"));
    }

    #[test]
    fn contains_text_distinguishes_missing_needle_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.ts"), "export class Client {}").unwrap();

        assert!(contains_text(dir.path(), "index.ts", "class Client").passed);

        let no_needle = contains_text(dir.path(), "index.ts", "class Server");
        assert!(!no_needle.passed);
        assert!(no_needle.detail.contains("does not contain"));

        let no_file = contains_text(dir.path(), "gone.ts", "anything");
        assert!(!no_file.passed);
        assert!(no_file.detail.contains("cannot read"));
    }

    #[test]
    fn ordering_check_fails_when_reversed() {
        let trace = trace_of(&["cli_generate", "cli_lint"]);
        let check = tool_called_before(&trace, "cli_lint", "cli_generate");
        assert!(!check.passed);
        assert!(check.detail.contains("cli_generate"));
    }

    #[test]
    fn extension_lookup_descends_into_update_blocks() {
        let doc: serde_yaml::Value = serde_yaml::from_str(
            r#"
overlay: 1.0.0
info: {title: retry, version: 0.0.1}
actions:
  - target: $.paths
    update:
      x-retry-policy: {max_attempts: 3}
"#,
        )
        .unwrap();
        assert!(extension_present(&doc, "x-retry-policy"));
        assert!(!extension_present(&doc, "x-rate-limit"));
    }

    #[test]
    fn missing_extension_detail_names_the_key() {
        let doc: serde_yaml::Value = serde_yaml::from_str("overlay: 1.0.0").unwrap();
        let checks =
            extensions_present_in_overlay(&doc, "overlay.yaml", &["x-retry-policy".into()]);
        assert_eq!(checks.len(), 1);
        assert!(!checks[0].passed);
        assert!(checks[0].detail.contains("x-retry-policy"));
    }
}

//! The assessor: maps each suite type to a fixed composition of
//! assertion primitives and evaluates all of them — no short-circuit,
//! so a failing test still reports every check.

use regex::RegexBuilder;
use std::path::Path;

use gauntlet_core::{CheckResult, Expectations, Trace};

use crate::checks;

/// Evaluate a finished trace and final workspace state against the
/// test's declared expectations. Pure with respect to the trace: given
/// the same trace and workspace, assessment is deterministic.
pub fn assess(
    expectations: &Expectations,
    trace: &Trace,
    workspace: &Path,
    final_text: &str,
) -> Vec<CheckResult> {
    match expectations {
        Expectations::Generation { created_files } => created_files
            .iter()
            .map(|rel| checks::file_exists(workspace, rel))
            .collect(),
        Expectations::Overlay {
            overlay_path,
            expected_extensions,
        } => assess_overlay(workspace, overlay_path, expected_extensions),
        Expectations::Diagnosis {
            diagnostic_tool,
            expected_category,
        } => assess_diagnosis(trace, diagnostic_tool, expected_category, final_text),
        Expectations::Workflow { steps } => assess_workflow(trace, workspace, steps),
    }
}

fn assess_overlay(
    workspace: &Path,
    overlay_path: &str,
    expected_extensions: &[String],
) -> Vec<CheckResult> {
    let (yaml_check, doc) = checks::valid_yaml(workspace, overlay_path);
    let mut results = vec![yaml_check];

    match doc {
        Some(doc) => {
            results.push(overlay_structure(&doc, overlay_path));
            results.extend(checks::extensions_present_in_overlay(
                &doc,
                overlay_path,
                expected_extensions,
            ));
        }
        None => {
            // The document did not parse; the remaining checks still
            // report, each naming what could not be verified.
            results.push(CheckResult::fail(
                "overlay_structure",
                format!("{overlay_path} did not parse; structure not verified"),
            ));
            for key in expected_extensions {
                results.push(CheckResult::fail(
                    format!("extension:{key}"),
                    format!("{overlay_path} did not parse; missing extension key '{key}'"),
                ));
            }
        }
    }
    results
}

/// An overlay document must carry `overlay`, `info`, and a non-empty
/// `actions` list whose entries each have a `target` and an `update` or
/// `remove`.
fn overlay_structure(doc: &serde_yaml::Value, overlay_path: &str) -> CheckResult {
    let name = "overlay_structure";
    let Some(map) = doc.as_mapping() else {
        return CheckResult::fail(name, format!("{overlay_path} is not a mapping"));
    };

    for field in ["overlay", "info"] {
        if !map.contains_key(field) {
            return CheckResult::fail(name, format!("{overlay_path} is missing '{field}'"));
        }
    }

    let actions = match map.get("actions").and_then(|v| v.as_sequence()) {
        Some(seq) if !seq.is_empty() => seq,
        _ => {
            return CheckResult::fail(
                name,
                format!("{overlay_path} has no non-empty 'actions' list"),
            );
        }
    };

    for (i, action) in actions.iter().enumerate() {
        let Some(entry) = action.as_mapping() else {
            return CheckResult::fail(name, format!("action #{i} is not a mapping"));
        };
        if !entry.contains_key("target") {
            return CheckResult::fail(name, format!("action #{i} is missing 'target'"));
        }
        if !entry.contains_key("update") && !entry.contains_key("remove") {
            return CheckResult::fail(
                name,
                format!("action #{i} has neither 'update' nor 'remove'"),
            );
        }
    }

    CheckResult::pass(
        name,
        format!("{overlay_path} has overlay/info and {} valid actions", actions.len()),
    )
}

fn assess_diagnosis(
    trace: &Trace,
    diagnostic_tool: &str,
    expected_category: &str,
    final_text: &str,
) -> Vec<CheckResult> {
    let called = checks::tool_was_called(trace, diagnostic_tool);

    // The classification may appear in the agent's final text or in the
    // diagnostic tool's own output.
    let mut haystack = final_text.to_string();
    for output in trace.outputs_of(diagnostic_tool) {
        haystack.push('\n');
        haystack.push_str(output);
    }

    let name = format!("category:{expected_category}");
    let matched = match RegexBuilder::new(expected_category)
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re.is_match(&haystack),
        // Not a valid regex — fall back to a plain substring match.
        Err(_) => haystack
            .to_lowercase()
            .contains(&expected_category.to_lowercase()),
    };
    let category = if matched {
        CheckResult::pass(name, format!("classification matched '{expected_category}'"))
    } else {
        CheckResult::fail(
            name,
            format!("no classification matching '{expected_category}' in output"),
        )
    };

    vec![called, category]
}

fn assess_workflow(
    trace: &Trace,
    workspace: &Path,
    steps: &[gauntlet_core::WorkflowStep],
) -> Vec<CheckResult> {
    let mut results = Vec::new();
    // Each step's tool must appear at or after the previous step's
    // position — out-of-order calls fail even when every tool was
    // eventually called.
    let mut cursor = 0usize;

    for step in steps {
        let name = format!("step:{}", step.name);
        match trace.first_call_from(&step.tool, cursor) {
            Some(ordinal) => {
                results.push(CheckResult::pass(
                    name,
                    format!("{} called at #{} (in declared order)", step.tool, ordinal),
                ));
                cursor = ordinal + 1;
            }
            None if trace.tool_was_called(&step.tool) => {
                results.push(CheckResult::fail(
                    name,
                    format!(
                        "{} was called, but before step '{}' was due (out of order)",
                        step.tool, step.name
                    ),
                ));
            }
            None => {
                results.push(CheckResult::fail(
                    name,
                    format!("{} was never called", step.tool),
                ));
            }
        }

        if let Some(rel) = &step.creates_file {
            results.push(checks::file_exists(workspace, rel));
        }
    }
    results
}

//! Report projections. The console summary and the JSON document are
//! both rendered from the same aggregated `RunReport` — neither is a
//! separate source of truth.

use console::style;
use std::path::Path;

use gauntlet_core::{Outcome, Result, RunReport};

/// Render the human-readable summary.
pub fn render_console(report: &RunReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "\n{} (model: {})\n",
        style("Run summary").bold(),
        report.model
    ));

    for suite in &report.suites {
        out.push_str(&format!(
            "\n{} — {}/{} passed ({:.0}%)\n",
            style(suite.suite.as_str()).bold(),
            suite.passed,
            suite.total,
            suite.pass_rate() * 100.0
        ));

        for result in &suite.results {
            let badge = match result.outcome {
                Outcome::Pass => style("pass").green(),
                Outcome::Fail => style("fail").red(),
                Outcome::Error => style("error").red().bold(),
                Outcome::Timeout => style("timeout").yellow(),
            };
            out.push_str(&format!(
                "  [{badge}] {} ({:.1}s)\n",
                result.spec.name, result.duration_secs
            ));

            // Assertion failures and harness faults read differently:
            // the former is the agent doing the wrong thing, the latter
            // is the harness failing to observe a result.
            for check in result.failed_checks() {
                out.push_str(&format!(
                    "         {} {}: {}\n",
                    style("✗").red(),
                    check.name,
                    check.detail
                ));
            }
            if let Some(error) = &result.harness_error {
                out.push_str(&format!(
                    "         {} {}\n",
                    style("!").yellow(),
                    error
                ));
            }
        }
    }

    let overall = format!(
        "{}/{} passed ({:.0}%)",
        report.passed(),
        report.total(),
        report.pass_rate() * 100.0
    );
    let overall = if report.all_passed() {
        style(overall).green().bold()
    } else {
        style(overall).red().bold()
    };
    out.push_str(&format!("\nOverall: {overall}\n"));
    out
}

pub fn print_console(report: &RunReport) {
    print!("{}", render_console(report));
}

/// Write the machine-readable report: run metadata plus every suite
/// with per-test checks and the full trace.
pub fn write_json(report: &RunReport, path: &Path) -> Result<()> {
    let doc = serde_json::json!({
        "metadata": {
            "timestamp": report.timestamp.to_rfc3339(),
            "model": report.model,
            "total": report.total(),
            "passed": report.passed(),
            "pass_rate": report.pass_rate(),
        },
        "suites": report.suites,
    });
    std::fs::write(path, serde_json::to_string_pretty(&doc)?)?;
    Ok(())
}

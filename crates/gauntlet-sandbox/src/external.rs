use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tracing::debug;

/// Output of one external CLI invocation.
#[derive(Debug, Clone)]
pub struct CliOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CliOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    /// Combined stdout + stderr, trimmed.
    pub fn combined(&self) -> String {
        let mut parts = Vec::new();
        if !self.stdout.trim().is_empty() {
            parts.push(self.stdout.trim().to_string());
        }
        if !self.stderr.trim().is_empty() {
            parts.push(self.stderr.trim().to_string());
        }
        parts.join("\n")
    }
}

/// The wrapped command-line collaborator. Invoked only with explicit
/// argument lists — never through a shell — so every invocation is
/// auditable in the trace and injection-proof.
#[derive(Debug, Clone)]
pub struct ExternalCli {
    binary: String,
    call_timeout: Duration,
}

impl ExternalCli {
    pub fn new(binary: impl Into<String>, call_timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            call_timeout,
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Run one subcommand with the workspace as working directory. A
    /// spawn failure is reported as exit code -1 with the error in
    /// stderr; exceeding the per-call timeout kills the child and sets
    /// `timed_out`.
    pub async fn run(&self, args: &[&str], cwd: &Path) -> CliOutput {
        debug!(binary = %self.binary, ?args, "invoking external CLI");

        let mut cmd = tokio::process::Command::new(&self.binary);
        cmd.args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let result = tokio::time::timeout(self.call_timeout, cmd.output()).await;

        match result {
            Ok(Ok(output)) => CliOutput {
                exit_code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                timed_out: false,
            },
            Ok(Err(e)) => CliOutput {
                exit_code: -1,
                stdout: String::new(),
                stderr: format!("failed to run {}: {e}", self.binary),
                timed_out: false,
            },
            Err(_) => CliOutput {
                exit_code: -1,
                stdout: String::new(),
                stderr: format!(
                    "{} timed out after {}s",
                    self.binary,
                    self.call_timeout.as_secs()
                ),
                timed_out: true,
            },
        }
    }

    /// Probe the CLI with `--version`; used by environment readiness
    /// checks before any test runs.
    pub async fn is_available(&self) -> bool {
        let tmp = std::env::temp_dir();
        self.run(&["--version"], &tmp).await.success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_exit_code_and_output() {
        let cli = ExternalCli::new("sh", Duration::from_secs(5));
        let out = cli
            .run(&["-c", "echo hello; exit 3"], &std::env::temp_dir())
            .await;
        assert_eq!(out.exit_code, 3);
        assert!(out.stdout.contains("hello"));
        assert!(!out.timed_out);
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let cli = ExternalCli::new("sleep", Duration::from_millis(100));
        let out = cli.run(&["5"], &std::env::temp_dir()).await;
        assert!(out.timed_out);
        assert!(!out.success());
    }

    #[tokio::test]
    async fn missing_binary_reported_not_raised() {
        let cli = ExternalCli::new("definitely-not-a-real-binary", Duration::from_secs(1));
        let out = cli.run(&["--version"], &std::env::temp_dir()).await;
        assert_eq!(out.exit_code, -1);
        assert!(out.stderr.contains("failed to run"));
    }
}

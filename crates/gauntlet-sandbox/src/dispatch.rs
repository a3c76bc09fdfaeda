use serde_json::json;
use tracing::debug;

use gauntlet_core::{Tool, ToolCall, ToolErrorKind, ToolResult, Trace};

use crate::external::ExternalCli;
use crate::workspace::Workspace;

/// The fixed, versioned tool surface exposed to the decision backend.
/// Argument schemas here are the wire contract; keep them stable so
/// recorded traces stay reproducible across harness versions.
pub fn tool_surface() -> Vec<Tool> {
    vec![
        Tool {
            name: "file_read".into(),
            description: "Read a file from the workspace. Path is relative to the workspace root."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Workspace-relative path to read"}
                },
                "required": ["path"]
            }),
            is_mutating: false,
        },
        Tool {
            name: "file_write".into(),
            description:
                "Write content to a workspace file (creates parent directories, overwrites)."
                    .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Workspace-relative path to write"},
                    "content": {"type": "string", "description": "Content to write"}
                },
                "required": ["path", "content"]
            }),
            is_mutating: true,
        },
        Tool {
            name: "file_list".into(),
            description: "List files under a workspace directory, recursively.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Workspace-relative directory (default: workspace root)"}
                }
            }),
            is_mutating: false,
        },
        Tool {
            name: "cli_quickstart".into(),
            description: "Initialize a new SDK project from an API description.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "spec": {"type": "string", "description": "Path to the API description"},
                    "target": {"type": "string", "description": "Target language, e.g. typescript, python, go"},
                    "name": {"type": "string", "description": "SDK name"},
                    "package": {"type": "string", "description": "Package name"},
                    "out_dir": {"type": "string", "description": "Output directory"}
                },
                "required": ["spec", "target"]
            }),
            is_mutating: true,
        },
        Tool {
            name: "cli_generate".into(),
            description: "Regenerate the SDK from the existing workflow configuration.".into(),
            parameters: json!({
                "type": "object",
                "properties": {}
            }),
            is_mutating: true,
        },
        Tool {
            name: "cli_lint".into(),
            description: "Lint an API description and report errors and warnings.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "spec": {"type": "string", "description": "Path to the API description"}
                },
                "required": ["spec"]
            }),
            is_mutating: false,
        },
        Tool {
            name: "cli_suggest".into(),
            description: "Generate suggested operation IDs for a spec as an overlay file.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "spec": {"type": "string", "description": "Path to the API description"},
                    "out": {"type": "string", "description": "Overlay output path"}
                },
                "required": ["spec", "out"]
            }),
            is_mutating: true,
        },
        Tool {
            name: "cli_overlay_apply".into(),
            description: "Apply an overlay to a spec, writing the merged result.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "spec": {"type": "string", "description": "Path to the base spec"},
                    "overlay": {"type": "string", "description": "Path to the overlay file"},
                    "out": {"type": "string", "description": "Merged output path"}
                },
                "required": ["spec", "overlay", "out"]
            }),
            is_mutating: true,
        },
        Tool {
            name: "cli_overlay_validate".into(),
            description: "Validate an overlay file.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "overlay": {"type": "string", "description": "Path to the overlay file"}
                },
                "required": ["overlay"]
            }),
            is_mutating: false,
        },
    ]
}

/// Executes tool calls against one workspace and records every
/// call/result pair in the trace, in invocation order. Owning both the
/// workspace and the trace makes this the single writer by construction.
pub struct Dispatcher {
    workspace: Workspace,
    cli: ExternalCli,
    trace: Trace,
}

impl Dispatcher {
    pub fn new(workspace: Workspace, cli: ExternalCli) -> Self {
        Self {
            workspace,
            cli,
            trace: Trace::new(),
        }
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Tear down into the finished trace and the workspace (for snapshot
    /// and release).
    pub fn finish(self) -> (Workspace, Trace) {
        (self.workspace, self.trace)
    }

    /// Execute one call. Every failure mode — bad arguments, I/O errors,
    /// non-zero exits, per-call timeouts — comes back as an error
    /// `ToolResult`; nothing propagates past this boundary.
    pub async fn dispatch(&mut self, call: &ToolCall) -> ToolResult {
        debug!(tool = %call.tool_name, "executing tool");
        let result = self.execute(call).await;
        self.trace.record(call.clone(), result.clone());
        result
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        match call.tool_name.as_str() {
            "file_read" => self.exec_file_read(call),
            "file_write" => self.exec_file_write(call),
            "file_list" => self.exec_file_list(call),
            "cli_quickstart" => self.exec_cli_quickstart(call).await,
            "cli_generate" => self.exec_cli(call, vec!["run".into(), "-y".into()]).await,
            "cli_lint" => match self.require_str(call, "spec") {
                Ok(spec) => {
                    self.exec_cli(
                        call,
                        vec![
                            "lint".into(),
                            "openapi".into(),
                            "--non-interactive".into(),
                            "-s".into(),
                            spec.to_string(),
                        ],
                    )
                    .await
                }
                Err(r) => r,
            },
            "cli_suggest" => match (self.require_str(call, "spec"), self.require_str(call, "out"))
            {
                (Ok(spec), Ok(out)) => {
                    self.exec_cli(
                        call,
                        vec![
                            "suggest".into(),
                            "operation-ids".into(),
                            "-s".into(),
                            spec.to_string(),
                            "-o".into(),
                            out.to_string(),
                        ],
                    )
                    .await
                }
                (Err(r), _) | (_, Err(r)) => r,
            },
            "cli_overlay_apply" => {
                let args = (
                    self.require_str(call, "spec"),
                    self.require_str(call, "overlay"),
                    self.require_str(call, "out"),
                );
                match args {
                    (Ok(spec), Ok(overlay), Ok(out)) => {
                        self.exec_cli(
                            call,
                            vec![
                                "overlay".into(),
                                "apply".into(),
                                "-s".into(),
                                spec.to_string(),
                                "-o".into(),
                                overlay.to_string(),
                                "--out".into(),
                                out.to_string(),
                            ],
                        )
                        .await
                    }
                    (Err(r), _, _) | (_, Err(r), _) | (_, _, Err(r)) => r,
                }
            }
            "cli_overlay_validate" => match self.require_str(call, "overlay") {
                Ok(overlay) => {
                    self.exec_cli(
                        call,
                        vec![
                            "overlay".into(),
                            "validate".into(),
                            "-o".into(),
                            overlay.to_string(),
                        ],
                    )
                    .await
                }
                Err(r) => r,
            },
            other => ToolResult::err(
                &call.id,
                ToolErrorKind::Validation,
                format!("tool not found: {other}"),
            ),
        }
    }

    fn require_str<'a>(
        &self,
        call: &'a ToolCall,
        key: &str,
    ) -> std::result::Result<&'a str, ToolResult> {
        call.arguments[key].as_str().ok_or_else(|| {
            ToolResult::err(
                &call.id,
                ToolErrorKind::Validation,
                format!("missing '{key}' argument"),
            )
        })
    }

    fn exec_file_read(&self, call: &ToolCall) -> ToolResult {
        let path = match self.require_str(call, "path") {
            Ok(p) => p,
            Err(r) => return r,
        };
        let full = match self.workspace.resolve(path) {
            Ok(p) => p,
            Err(e) => return ToolResult::err(&call.id, ToolErrorKind::Validation, e.to_string()),
        };
        match std::fs::read_to_string(&full) {
            Ok(content) => ToolResult::ok(&call.id, content),
            Err(e) => ToolResult::err(&call.id, ToolErrorKind::Io, format!("{path}: {e}")),
        }
    }

    fn exec_file_write(&self, call: &ToolCall) -> ToolResult {
        let path = match self.require_str(call, "path") {
            Ok(p) => p,
            Err(r) => return r,
        };
        let content = match self.require_str(call, "content") {
            Ok(c) => c,
            Err(r) => return r,
        };
        let full = match self.workspace.resolve(path) {
            Ok(p) => p,
            Err(e) => return ToolResult::err(&call.id, ToolErrorKind::Validation, e.to_string()),
        };
        if let Some(parent) = full.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            return ToolResult::err(&call.id, ToolErrorKind::Io, format!("{path}: {e}"));
        }
        match std::fs::write(&full, content) {
            Ok(()) => ToolResult::ok(&call.id, format!("wrote {path}")),
            Err(e) => ToolResult::err(&call.id, ToolErrorKind::Io, format!("{path}: {e}")),
        }
    }

    fn exec_file_list(&self, call: &ToolCall) -> ToolResult {
        let rel = call.arguments["path"].as_str().unwrap_or("");
        let base = if rel.is_empty() {
            self.workspace.dir().to_path_buf()
        } else {
            match self.workspace.resolve(rel) {
                Ok(p) => p,
                Err(e) => {
                    return ToolResult::err(&call.id, ToolErrorKind::Validation, e.to_string());
                }
            }
        };

        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(&base) {
            match entry {
                Ok(e) if e.file_type().is_file() => {
                    if let Ok(rel) = e.path().strip_prefix(self.workspace.dir()) {
                        files.push(rel.to_string_lossy().into_owned());
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    return ToolResult::err(&call.id, ToolErrorKind::Io, e.to_string());
                }
            }
        }
        files.sort();
        ToolResult::ok(&call.id, files.join("\n"))
    }

    async fn exec_cli_quickstart(&self, call: &ToolCall) -> ToolResult {
        let spec = match self.require_str(call, "spec") {
            Ok(s) => s,
            Err(r) => return r,
        };
        let target = match self.require_str(call, "target") {
            Ok(t) => t,
            Err(r) => return r,
        };

        let mut args: Vec<String> = vec![
            "quickstart".into(),
            "--skip-interactive".into(),
            "--output".into(),
            "console".into(),
            "-s".into(),
            spec.to_string(),
            "-t".into(),
            target.to_string(),
        ];
        if let Some(name) = call.arguments["name"].as_str() {
            args.push("-n".into());
            args.push(name.to_string());
        }
        if let Some(package) = call.arguments["package"].as_str() {
            args.push("-p".into());
            args.push(package.to_string());
        }
        if let Some(out_dir) = call.arguments["out_dir"].as_str() {
            args.push("-o".into());
            args.push(out_dir.to_string());
        }
        self.exec_cli(call, args).await
    }

    async fn exec_cli(&self, call: &ToolCall, args: Vec<String>) -> ToolResult {
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.cli.run(&arg_refs, self.workspace.dir()).await;

        if output.success() {
            ToolResult::ok(&call.id, output.combined())
        } else if output.timed_out {
            ToolResult::err(&call.id, ToolErrorKind::Execution, output.stderr)
        } else {
            ToolResult::err(
                &call.id,
                ToolErrorKind::Execution,
                format!("exit code {}: {}", output.exit_code, output.combined()),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::WorkspaceManager;
    use std::time::Duration;

    fn dispatcher_for(fixture_files: &[(&str, &str)]) -> (Dispatcher, tempfile::TempDir) {
        let fixture = tempfile::tempdir().unwrap();
        for (rel, content) in fixture_files {
            let path = fixture.path().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
        let manager = WorkspaceManager::new(None);
        let ws = manager.acquire("dispatch-test", fixture.path()).unwrap();
        let cli = ExternalCli::new("sh", Duration::from_secs(5));
        (Dispatcher::new(ws, cli), fixture)
    }

    fn call(name: &str, args: serde_json::Value) -> ToolCall {
        ToolCall {
            id: format!("call_{}", uuid::Uuid::new_v4()),
            tool_name: name.to_string(),
            arguments: args,
        }
    }

    #[tokio::test]
    async fn file_roundtrip_through_dispatcher() {
        let (mut d, _fixture) = dispatcher_for(&[("openapi.yaml", "openapi: 3.1.0")]);

        let read = d
            .dispatch(&call("file_read", json!({"path": "openapi.yaml"})))
            .await;
        assert!(!read.is_error());
        assert_eq!(read.content, "openapi: 3.1.0");

        let write = d
            .dispatch(&call(
                "file_write",
                json!({"path": "sdk/index.ts", "content": "export {}"}),
            ))
            .await;
        assert!(!write.is_error());

        let list = d.dispatch(&call("file_list", json!({}))).await;
        assert!(list.content.contains("sdk/index.ts"));
        assert_eq!(d.trace().len(), 3);
    }

    #[tokio::test]
    async fn missing_argument_is_validation_error() {
        let (mut d, _fixture) = dispatcher_for(&[("openapi.yaml", "x")]);
        let result = d.dispatch(&call("file_read", json!({}))).await;
        assert_eq!(
            result.error.as_ref().map(|e| e.kind),
            Some(ToolErrorKind::Validation)
        );
    }

    #[tokio::test]
    async fn traversal_is_validation_error() {
        let (mut d, _fixture) = dispatcher_for(&[("openapi.yaml", "x")]);
        let result = d
            .dispatch(&call("file_read", json!({"path": "../../etc/passwd"})))
            .await;
        assert_eq!(
            result.error.as_ref().map(|e| e.kind),
            Some(ToolErrorKind::Validation)
        );
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let (mut d, _fixture) = dispatcher_for(&[("openapi.yaml", "x")]);
        let result = d
            .dispatch(&call("file_read", json!({"path": "nope.yaml"})))
            .await;
        assert_eq!(
            result.error.as_ref().map(|e| e.kind),
            Some(ToolErrorKind::Io)
        );
    }

    #[tokio::test]
    async fn cli_call_timeout_is_execution_error() {
        use std::os::unix::fs::PermissionsExt;

        // A stand-in CLI that ignores its arguments and hangs.
        let bin_dir = tempfile::tempdir().unwrap();
        let script = bin_dir.path().join("slow-cli");
        std::fs::write(&script, "#!/bin/sh\nsleep 5\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let fixture = tempfile::tempdir().unwrap();
        std::fs::write(fixture.path().join("openapi.yaml"), "openapi: 3.1.0").unwrap();
        let manager = WorkspaceManager::new(None);
        let ws = manager.acquire("dispatch-timeout", fixture.path()).unwrap();
        let cli = ExternalCli::new(script.to_string_lossy(), Duration::from_millis(100));
        let mut d = Dispatcher::new(ws, cli);

        let result = d
            .dispatch(&call("cli_lint", json!({"spec": "openapi.yaml"})))
            .await;
        assert_eq!(
            result.error.as_ref().map(|e| e.kind),
            Some(ToolErrorKind::Execution)
        );
        assert!(result.content.contains("timed out"));
        assert_eq!(d.trace().len(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_is_terminating_error_result() {
        let (mut d, _fixture) = dispatcher_for(&[("openapi.yaml", "x")]);
        let result = d.dispatch(&call("teleport", json!({}))).await;
        assert!(result.is_error());
        assert!(result.content.contains("tool not found"));
        // Still recorded in the trace.
        assert_eq!(d.trace().len(), 1);
    }

    #[tokio::test]
    async fn every_call_lands_in_the_trace_in_order() {
        let (mut d, _fixture) = dispatcher_for(&[("openapi.yaml", "x")]);
        d.dispatch(&call("file_read", json!({"path": "openapi.yaml"})))
            .await;
        d.dispatch(&call("file_list", json!({}))).await;

        let (_ws, trace) = d.finish();
        assert_eq!(trace.first_call_of("file_read"), Some(0));
        assert_eq!(trace.first_call_of("file_list"), Some(1));
    }

    #[test]
    fn tool_surface_schemas_are_well_formed() {
        let tools = tool_surface();
        assert_eq!(tools.len(), 9);
        for tool in &tools {
            assert!(!tool.name.is_empty());
            assert!(tool.parameters["type"] == "object");
        }
    }
}

// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Shell command tool handler.
//!
//! Runs a command under the interpreter matching the caller-declared
//! platform. The command is always passed as a single argv element to the
//! interpreter, never re-parsed through an outer shell.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::error::ToolError;
use crate::tools::registry::{ToolHandler, ToolOutput};
use crate::tools::{parse_arguments, InputSchema, ToolDefinition, DEFAULT_TIMEOUT_MS};

/// Handler for the `shell_helper` tool.
pub struct ShellHandler;

/// Arguments for the shell_helper tool.
#[derive(Debug, Deserialize)]
struct ShellArgs {
    /// Platform label selecting the interpreter.
    platform: String,

    /// The command to execute.
    shell_command: String,
}

/// Interpreter selection by platform label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShellKind {
    Windows,
    Posix,
}

impl ShellKind {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "Windows" => Some(Self::Windows),
            "*nix" => Some(Self::Posix),
            _ => None,
        }
    }

    /// Argument vector running `command` under this interpreter.
    fn argv(self, command: &str) -> Vec<String> {
        match self {
            Self::Windows => vec![
                "powershell".to_string(),
                "-Command".to_string(),
                command.to_string(),
            ],
            Self::Posix => vec!["sh".to_string(), "-c".to_string(), command.to_string()],
        }
    }
}

#[async_trait]
impl ToolHandler for ShellHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "shell_helper",
            "Run a shell command on the platform given by the platform argument: \
             a PowerShell command on Windows, or an sh command on Linux/macOS",
        )
        .with_schema(
            InputSchema::new()
                .with_property(
                    "platform",
                    serde_json::json!({
                        "type": "string",
                        "description": "Operating system platform: \"Windows\" for Windows, \"*nix\" for Linux or macOS",
                        "enum": ["Windows", "*nix"]
                    }),
                )
                .with_property(
                    "shell_command",
                    serde_json::json!({
                        "type": "string",
                        "description": "The command to run; on Windows only PowerShell commands are accepted"
                    }),
                )
                .with_required(vec!["platform".to_string(), "shell_command".to_string()]),
        )
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: ShellArgs = parse_arguments(&input)?;

        if args.shell_command.trim().is_empty() {
            return Err(ToolError::InvalidInput(
                "shell_command must not be empty".to_string(),
            ));
        }

        let Some(kind) = ShellKind::from_label(&args.platform) else {
            return Ok(ToolOutput::error(format!(
                "Unsupported platform: {}",
                args.platform
            )));
        };

        let result = run_shell_command(kind, &args.shell_command).await?;

        debug!(
            exit_code = result.exit_code,
            duration_ms = result.duration.as_millis() as u64,
            "Shell command executed"
        );

        let success = result.exit_code == 0;
        let formatted = format_shell_output(&result);
        Ok(ToolOutput {
            content: formatted,
            success,
        })
    }
}

/// Result of executing a shell command.
struct ShellResult {
    stdout: String,
    stderr: String,
    exit_code: i32,
    duration: Duration,
}

async fn run_shell_command(kind: ShellKind, command: &str) -> Result<ShellResult, ToolError> {
    let start = Instant::now();
    let argv = kind.argv(command);

    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..])
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped());

    let timeout_duration = Duration::from_millis(DEFAULT_TIMEOUT_MS);
    let output_result = timeout(timeout_duration, cmd.output()).await;
    let duration = start.elapsed();

    match output_result {
        Ok(Ok(output)) => Ok(ShellResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
            duration,
        }),
        Ok(Err(e)) => Err(ToolError::ExecutionFailed(format!(
            "Failed to execute command: {e}"
        ))),
        Err(_) => Err(ToolError::Timeout(DEFAULT_TIMEOUT_MS)),
    }
}

fn format_shell_output(result: &ShellResult) -> String {
    let mut text = format!("Execution result:\n\n```\n{}```", result.stdout);

    if !result.stderr.is_empty() {
        text.push_str(&format!("\n\nError: {}", result.stderr));
    }

    text.push_str(&format!(
        "\n\nCommand finished with return code: {}\n\n",
        result.exit_code
    ));

    text
}

use super::process::ProcessRunner;
use crate::config::ShellToolConfig;
use crate::session::SessionContext;
use crate::tools::{Tool, ToolDefinition, ToolError, ToolResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

pub const TOOL_NAME: &str = "shell_command";

/// Characters that let one shell string run more than the program it names
const SHELL_METACHARACTERS: &[char] = &[';', '|', '&', '$', '`', '<', '>', '(', ')', '\n'];

pub struct ShellCommandTool {
    shell: String,
    allowed_commands: Vec<String>,
    runner: ProcessRunner,
}

impl ShellCommandTool {
    pub fn new(config: ShellToolConfig) -> Self {
        Self {
            shell: config.shell,
            allowed_commands: config.allowed_commands,
            runner: ProcessRunner::new(config.sandbox),
        }
    }

    /// With an allowlist configured, only a single listed program may run
    fn check_allowed(&self, command: &str) -> ToolResult<()> {
        if self.allowed_commands.is_empty() {
            return Ok(());
        }

        if command.contains(SHELL_METACHARACTERS) {
            return Err(ToolError::PermissionDenied(
                "Shell operators are not allowed when a command allowlist is set".to_string(),
            ));
        }

        let program = command.split_whitespace().next().unwrap_or_default();
        if !self.allowed_commands.iter().any(|c| c == program) {
            return Err(ToolError::PermissionDenied(format!(
                "Command '{}' is not allowed",
                program
            )));
        }
        Ok(())
    }

    pub async fn run(&self, command: &str) -> ToolResult<String> {
        self.check_allowed(command)?;

        let args = vec!["-c".to_string(), command.to_string()];
        let output = self.runner.run(&self.shell, &args, None, true).await?;

        if !output.success() {
            return Err(ToolError::ExecutionFailed(format!(
                "Error executing command: {}",
                output.stderr
            )));
        }

        if output.stdout.is_empty() {
            Ok("Command executed successfully with no output.".to_string())
        } else {
            Ok(output.stdout)
        }
    }
}

#[async_trait]
impl Tool for ShellCommandTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            TOOL_NAME,
            "Execute shell commands.",
            json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "Shell command to execute."
                    }
                },
                "required": ["command"]
            }),
        )
    }

    async fn call(&self, ctx: &SessionContext, arguments: Value) -> ToolResult<String> {
        let command = arguments["command"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'command'".to_string()))?;

        info!(target: "shell_command", session = %ctx.session_id(), command = %command, "Executing shell command");
        self.run(command).await.inspect_err(|e| {
            warn!(target: "shell_command", error = %e, "Shell command failed");
        })
    }
}

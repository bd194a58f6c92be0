use super::process::{ProcessOutput, ProcessRunner};
use crate::config::CodeToolConfig;
use crate::session::SessionContext;
use crate::tools::{Tool, ToolDefinition, ToolError, ToolResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

pub const TOOL_NAME: &str = "code_execution";

/// Runs each snippet in a fresh interpreter process fed through stdin.
/// Only success or failure is reported; the snippet's own stdout is discarded.
pub struct CodeExecutionTool {
    interpreter: String,
    args: Vec<String>,
    runner: ProcessRunner,
}

impl CodeExecutionTool {
    pub fn new(config: CodeToolConfig) -> Self {
        Self {
            interpreter: config.interpreter,
            args: config.args,
            runner: ProcessRunner::new(config.sandbox),
        }
    }

    pub async fn run(&self, code: &str) -> ToolResult<String> {
        let output = self
            .runner
            .run(&self.interpreter, &self.args, Some(code.to_string()), false)
            .await?;

        if output.success() {
            Ok("Code executed successfully.".to_string())
        } else {
            Err(ToolError::ExecutionFailed(format!(
                "Error during code execution: {}",
                failure_message(&output)
            )))
        }
    }
}

/// The last stderr line carries the exception for interpreters that print a
/// traceback; fall back to the exit status when stderr is silent.
fn failure_message(output: &ProcessOutput) -> String {
    output
        .stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("interpreter exited with {}", output.status))
}

#[async_trait]
impl Tool for CodeExecutionTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            TOOL_NAME,
            "Execute Python code snippets.",
            json!({
                "type": "object",
                "properties": {
                    "code": {
                        "type": "string",
                        "description": "Python code to execute."
                    }
                },
                "required": ["code"]
            }),
        )
    }

    async fn call(&self, ctx: &SessionContext, arguments: Value) -> ToolResult<String> {
        let code = arguments["code"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'code'".to_string()))?;

        info!(target: "code_execution", session = %ctx.session_id(), interpreter = %self.interpreter, bytes = code.len(), "Executing code snippet");
        self.run(code).await.inspect_err(|e| {
            warn!(target: "code_execution", error = %e, "Code execution failed");
        })
    }
}

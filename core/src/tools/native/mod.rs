pub mod code;
pub mod filesystem;
pub mod process;
pub mod shell;

pub use code::CodeExecutionTool;
pub use filesystem::{FileAction, FileManagementTool};
pub use process::ProcessRunner;
pub use shell::ShellCommandTool;

use crate::config::ToolsConfig;
use crate::tools::ToolRegistry;
use crate::Result;
use std::sync::Arc;
use tracing::info;

/// Register the built-in tools enabled in `config`
pub fn register_builtin_tools(registry: &ToolRegistry, config: &ToolsConfig) -> Result<()> {
    registry.register(Arc::new(FileManagementTool::new(config.files.clone())))?;

    if config.code.enabled {
        registry.register(Arc::new(CodeExecutionTool::new(config.code.clone())))?;
    } else {
        info!(target: "tool_registry", tool = code::TOOL_NAME, "Disabled by config");
    }

    if config.shell.enabled {
        registry.register(Arc::new(ShellCommandTool::new(config.shell.clone())))?;
    } else {
        info!(target: "tool_registry", tool = shell::TOOL_NAME, "Disabled by config");
    }

    Ok(())
}

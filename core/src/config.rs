// Tool and dispatcher configuration.
// Defaults consider TOOLGATE_* environment variables; apps overlay a config file on top.
use std::path::PathBuf;
use std::time::Duration;

use crate::{GatewayError, Result};

/// Configuration for every built-in tool plus the dispatcher
#[derive(Clone, Debug, Default)]
pub struct ToolsConfig {
    pub files: FileToolConfig,
    pub code: CodeToolConfig,
    pub shell: ShellToolConfig,
    pub dispatch: DispatchConfig,
}

impl ToolsConfig {
    /// Reject settings that would make every call of a tool fail
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.timeout_ms == 0 {
            return Err(GatewayError::Config("dispatch.timeout_ms must be positive".into()));
        }
        if self.code.enabled {
            if self.code.interpreter.trim().is_empty() {
                return Err(GatewayError::Config("code.interpreter is empty".into()));
            }
            if self.code.sandbox.timeout_ms == 0 {
                return Err(GatewayError::Config("code.sandbox.timeout_ms must be positive".into()));
            }
        }
        if self.shell.enabled {
            if self.shell.shell.trim().is_empty() {
                return Err(GatewayError::Config("shell.shell is empty".into()));
            }
            if self.shell.sandbox.timeout_ms == 0 {
                return Err(GatewayError::Config("shell.sandbox.timeout_ms must be positive".into()));
            }
        }
        Ok(())
    }
}

/// File management tool settings
#[derive(Clone, Debug)]
pub struct FileToolConfig {
    /// Relative filenames resolve against this directory
    pub base_dir: PathBuf,
    /// When set, every path must stay inside this directory
    pub workspace_root: Option<PathBuf>,
    /// Largest file `download_file` will return
    pub max_read_bytes: u64,
}

/// Restrictions applied to every spawned process
#[derive(Clone, Debug)]
pub struct SandboxConfig {
    /// Environment variables passed through; everything else is cleared
    pub env_allowlist: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout_ms: u64,
    /// Captured stdout/stderr is truncated past this many bytes
    pub max_output_bytes: usize,
}

/// Code execution tool settings
#[derive(Clone, Debug)]
pub struct CodeToolConfig {
    pub enabled: bool,
    pub interpreter: String,
    /// Arguments that make the interpreter read the program from stdin
    pub args: Vec<String>,
    pub sandbox: SandboxConfig,
}

/// Shell command tool settings
#[derive(Clone, Debug)]
pub struct ShellToolConfig {
    pub enabled: bool,
    pub shell: String,
    /// Programs the agent may run. Empty means unrestricted.
    pub allowed_commands: Vec<String>,
    pub sandbox: SandboxConfig,
}

/// Dispatcher settings
#[derive(Clone, Debug)]
pub struct DispatchConfig {
    /// Size of the worker pool running tool calls
    pub max_concurrent: usize,
    pub timeout_ms: u64,
    pub validate_arguments: bool,
}

impl Default for FileToolConfig {
    fn default() -> Self {
        Self {
            base_dir: env_string("TOOLGATE_BASE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            workspace_root: env_string("TOOLGATE_WORKSPACE_ROOT").map(PathBuf::from),
            max_read_bytes: env_parse("TOOLGATE_MAX_READ_BYTES").unwrap_or(10 * 1024 * 1024),
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            env_allowlist: env_list("TOOLGATE_ENV_ALLOWLIST").unwrap_or_else(|| {
                ["PATH", "HOME", "USER", "LANG", "LC_ALL", "TMPDIR"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            }),
            working_dir: env_string("TOOLGATE_WORKING_DIR").map(PathBuf::from),
            timeout_ms: env_parse("TOOLGATE_EXEC_TIMEOUT_MS").unwrap_or(20_000),
            max_output_bytes: env_parse("TOOLGATE_MAX_OUTPUT_BYTES").unwrap_or(64 * 1024),
        }
    }
}

impl SandboxConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for CodeToolConfig {
    fn default() -> Self {
        Self {
            enabled: env_bool("TOOLGATE_CODE_ENABLED").unwrap_or(true),
            interpreter: env_string("TOOLGATE_CODE_INTERPRETER")
                .unwrap_or_else(|| "python3".to_string()),
            args: env_list("TOOLGATE_CODE_ARGS").unwrap_or_else(|| vec!["-".to_string()]),
            sandbox: SandboxConfig::default(),
        }
    }
}

impl Default for ShellToolConfig {
    fn default() -> Self {
        Self {
            enabled: env_bool("TOOLGATE_SHELL_ENABLED").unwrap_or(true),
            shell: env_string("TOOLGATE_SHELL").unwrap_or_else(|| "sh".to_string()),
            allowed_commands: env_list("TOOLGATE_SHELL_ALLOW").unwrap_or_default(),
            sandbox: SandboxConfig::default(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: env_parse("TOOLGATE_MAX_CONCURRENT").unwrap_or(4),
            timeout_ms: env_parse("TOOLGATE_DISPATCH_TIMEOUT_MS").unwrap_or(30_000),
            validate_arguments: env_bool("TOOLGATE_VALIDATE_ARGUMENTS").unwrap_or(true),
        }
    }
}

impl DispatchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse::<T>().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    env_string(key).map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

/// Comma separated list; blank items are dropped
fn env_list(key: &str) -> Option<Vec<String>> {
    env_string(key).map(|v| {
        v.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

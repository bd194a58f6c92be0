use std::fs;
use std::path::{Path, PathBuf};

use toolgate_core::config::{
    CodeToolConfig, DispatchConfig, FileToolConfig, SandboxConfig, ShellToolConfig,
};
use toolgate_core::ToolsConfig;

/// High-level configuration for the assistant host
#[derive(Clone, Debug)]
pub struct AssistantConfig {
    pub tools: ToolsConfig,
    /// Instructions handed to the realtime client when the session is created
    pub system_prompt: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            tools: ToolsConfig::default(),
            system_prompt: std::env::var("ASSISTANT_SYSTEM_PROMPT")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| {
                    "You are a capable programming assistant. Use the file_management, \
                     code_execution and shell_command tools to act on the user's machine, \
                     and report tool failures plainly."
                        .into()
                }),
        }
    }
}

impl AssistantConfig {
    /// Load configuration from a TOML file (path via ASSISTANT_CONFIG or ./assistant.toml),
    /// overlaying values onto defaults and env-driven defaults.
    pub fn load() -> Self {
        let default = Self::default();
        let path = std::env::var("ASSISTANT_CONFIG").unwrap_or_else(|_| "assistant.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target: "assistant", path = %path, "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(p) {
            Ok(s) => match Self::from_toml_str(&s, default.clone()) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!(target: "assistant", error = %e, "Failed to parse TOML; using defaults");
                    default
                }
            },
            Err(e) => {
                tracing::warn!(target: "assistant", error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }

    pub fn from_toml_str(s: &str, base: AssistantConfig) -> Result<Self, toml::de::Error> {
        toml::from_str::<AssistantToml>(s).map(|t| t.overlay(base))
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct AssistantToml {
    pub system_prompt: Option<String>,
    pub files: Option<FilesToml>,
    pub code: Option<CodeToml>,
    pub shell: Option<ShellToml>,
    pub dispatch: Option<DispatchToml>,
}

impl AssistantToml {
    fn overlay(self, mut base: AssistantConfig) -> AssistantConfig {
        if let Some(p) = self.system_prompt {
            base.system_prompt = p;
        }
        if let Some(f) = self.files {
            f.apply(&mut base.tools.files);
        }
        if let Some(c) = self.code {
            c.apply(&mut base.tools.code);
        }
        if let Some(s) = self.shell {
            s.apply(&mut base.tools.shell);
        }
        if let Some(d) = self.dispatch {
            d.apply(&mut base.tools.dispatch);
        }
        base
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct FilesToml {
    pub base_dir: Option<PathBuf>,
    pub workspace_root: Option<PathBuf>,
    pub max_read_bytes: Option<u64>,
}
impl FilesToml {
    fn apply(self, f: &mut FileToolConfig) {
        if let Some(x) = self.base_dir {
            f.base_dir = x;
        }
        if let Some(x) = self.workspace_root {
            f.workspace_root = Some(x);
        }
        if let Some(x) = self.max_read_bytes {
            f.max_read_bytes = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct SandboxToml {
    pub env_allowlist: Option<Vec<String>>,
    pub working_dir: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
    pub max_output_bytes: Option<usize>,
}
impl SandboxToml {
    fn apply(self, s: &mut SandboxConfig) {
        if let Some(mut x) = self.env_allowlist {
            s.env_allowlist = x.drain(..).filter(|k| !k.is_empty()).collect();
        }
        if let Some(x) = self.working_dir {
            s.working_dir = Some(x);
        }
        if let Some(x) = self.timeout_ms {
            s.timeout_ms = x;
        }
        if let Some(x) = self.max_output_bytes {
            s.max_output_bytes = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct CodeToml {
    pub enabled: Option<bool>,
    pub interpreter: Option<String>,
    pub args: Option<Vec<String>>, // e.g., ["-I", "-"]
    pub sandbox: Option<SandboxToml>,
}
impl CodeToml {
    fn apply(self, c: &mut CodeToolConfig) {
        if let Some(x) = self.enabled {
            c.enabled = x;
        }
        if let Some(x) = self.interpreter {
            c.interpreter = x;
        }
        if let Some(x) = self.args {
            c.args = x;
        }
        if let Some(x) = self.sandbox {
            x.apply(&mut c.sandbox);
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ShellToml {
    pub enabled: Option<bool>,
    pub shell: Option<String>,
    pub allowed_commands: Option<Vec<String>>,
    pub sandbox: Option<SandboxToml>,
}
impl ShellToml {
    fn apply(self, s: &mut ShellToolConfig) {
        if let Some(x) = self.enabled {
            s.enabled = x;
        }
        if let Some(x) = self.shell {
            s.shell = x;
        }
        if let Some(x) = self.allowed_commands {
            s.allowed_commands = x;
        }
        if let Some(x) = self.sandbox {
            x.apply(&mut s.sandbox);
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct DispatchToml {
    pub max_concurrent: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub validate_arguments: Option<bool>,
}
impl DispatchToml {
    fn apply(self, d: &mut DispatchConfig) {
        if let Some(x) = self.max_concurrent {
            d.max_concurrent = x.max(1);
        }
        if let Some(x) = self.timeout_ms {
            d.timeout_ms = x;
        }
        if let Some(x) = self.validate_arguments {
            d.validate_arguments = x;
        }
    }
}

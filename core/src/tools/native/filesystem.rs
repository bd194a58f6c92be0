use crate::config::FileToolConfig;
use crate::session::SessionContext;
use crate::tools::{Tool, ToolDefinition, ToolError, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, error};

pub const TOOL_NAME: &str = "file_management";

/// One file management request, selected by the `action` argument
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FileAction {
    ListFiles {
        #[serde(default)]
        directory: Option<String>,
    },
    UploadFile {
        filename: String,
        content: String,
    },
    DownloadFile {
        filename: String,
    },
    DeleteFile {
        filename: String,
    },
}

impl FileAction {
    pub fn from_arguments(arguments: Value) -> ToolResult<Self> {
        serde_json::from_value(arguments).map_err(|e| {
            ToolError::InvalidArguments(format!("Invalid file management action: {}", e))
        })
    }

    fn label(&self) -> &'static str {
        match self {
            FileAction::ListFiles { .. } => "list_files",
            FileAction::UploadFile { .. } => "upload_file",
            FileAction::DownloadFile { .. } => "download_file",
            FileAction::DeleteFile { .. } => "delete_file",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// file_management
// ─────────────────────────────────────────────────────────────────────────────

pub struct FileManagementTool {
    config: FileToolConfig,
}

impl FileManagementTool {
    pub fn new(config: FileToolConfig) -> Self {
        Self { config }
    }

    /// Convenience for a tool rooted at (and confined to) `root`
    pub fn confined_to(root: PathBuf) -> Self {
        Self::new(FileToolConfig {
            base_dir: root.clone(),
            workspace_root: Some(root),
            ..FileToolConfig::default()
        })
    }

    pub async fn execute(&self, action: FileAction) -> ToolResult<String> {
        match action {
            FileAction::ListFiles { directory } => {
                self.list_files(directory.as_deref().unwrap_or(".")).await
            }
            FileAction::UploadFile { filename, content } => {
                self.upload_file(&filename, &content).await
            }
            FileAction::DownloadFile { filename } => self.download_file(&filename).await,
            FileAction::DeleteFile { filename } => self.delete_file(&filename).await,
        }
    }

    async fn list_files(&self, directory: &str) -> ToolResult<String> {
        let path = self.resolve(directory)?;
        let mut entries = fs::read_dir(&path).await?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().to_string());
        }

        if names.is_empty() {
            return Ok("No files found.".to_string());
        }
        names.sort();
        Ok(names.join("\n"))
    }

    async fn upload_file(&self, filename: &str, content: &str) -> ToolResult<String> {
        let path = self.resolve(filename)?;
        fs::write(&path, content).await?;
        Ok(format!("File '{}' uploaded successfully.", filename))
    }

    async fn download_file(&self, filename: &str) -> ToolResult<String> {
        let path = self.resolve(filename)?;
        if !fs::try_exists(&path).await? {
            return Ok(does_not_exist(filename));
        }

        let size = fs::metadata(&path).await?.len();
        if size > self.config.max_read_bytes {
            return Err(ToolError::Io(format!(
                "File '{}' is {} bytes, over the {} byte read limit",
                filename, size, self.config.max_read_bytes
            )));
        }

        let bytes = fs::read(&path).await?;
        String::from_utf8(bytes)
            .map_err(|_| ToolError::Io(format!("File '{}' is not valid UTF-8 text", filename)))
    }

    async fn delete_file(&self, filename: &str) -> ToolResult<String> {
        let path = self.resolve(filename)?;
        if !fs::try_exists(&path).await? {
            return Ok(does_not_exist(filename));
        }
        fs::remove_file(&path).await?;
        Ok(format!("File '{}' deleted successfully.", filename))
    }

    /// Join `raw` onto the base directory; absolute paths replace it.
    /// With a workspace root configured the result must stay inside it.
    fn resolve(&self, raw: &str) -> ToolResult<PathBuf> {
        let joined = self.config.base_dir.join(raw);
        let Some(root) = &self.config.workspace_root else {
            return Ok(joined);
        };

        let root = normalize(&absolutize(root)?);
        let path = normalize(&absolutize(&joined)?);
        if !path.starts_with(&root) {
            return Err(ToolError::PermissionDenied(format!(
                "Path '{}' is outside the workspace",
                raw
            )));
        }
        Ok(path)
    }
}

fn does_not_exist(filename: &str) -> String {
    format!("File '{}' does not exist.", filename)
}

fn absolutize(path: &Path) -> ToolResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[async_trait]
impl Tool for FileManagementTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            TOOL_NAME,
            "Manage local files. Actions include list_files, upload_file, download_file, delete_file.",
            json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": ["list_files", "upload_file", "download_file", "delete_file"],
                        "description": "Action to perform: list_files, upload_file, download_file, delete_file."
                    },
                    "filename": {
                        "type": "string",
                        "description": "Name of the file."
                    },
                    "content": {
                        "type": "string",
                        "description": "Content of the file for upload."
                    },
                    "directory": {
                        "type": "string",
                        "description": "Directory to list files from."
                    }
                },
                "required": ["action"]
            }),
        )
    }

    async fn call(&self, ctx: &SessionContext, arguments: Value) -> ToolResult<String> {
        let action = FileAction::from_arguments(arguments)?;
        let label = action.label();
        debug!(target: "file_management", session = %ctx.session_id(), action = label, "Running file action");

        self.execute(action).await.inspect_err(|e| {
            error!(target: "file_management", action = label, error = %e, "File management error");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_parent_components() {
        assert_eq!(
            normalize(Path::new("/work/a/../b/./c.txt")),
            PathBuf::from("/work/b/c.txt")
        );
        assert_eq!(normalize(Path::new("/work/../../etc")), PathBuf::from("/etc"));
    }

    #[test]
    fn confined_resolve_rejects_escapes() {
        let tool = FileManagementTool::confined_to(PathBuf::from("/work/space"));
        assert!(tool.resolve("notes.txt").is_ok());
        assert!(tool.resolve("sub/../notes.txt").is_ok());
        assert!(matches!(
            tool.resolve("../../etc/passwd"),
            Err(ToolError::PermissionDenied(_))
        ));
        assert!(matches!(
            tool.resolve("/etc/passwd"),
            Err(ToolError::PermissionDenied(_))
        ));
    }

    #[test]
    fn unconfined_resolve_honors_absolute_paths() {
        let tool = FileManagementTool::new(FileToolConfig {
            base_dir: PathBuf::from("/work"),
            workspace_root: None,
            max_read_bytes: 1024,
        });
        assert_eq!(tool.resolve("/tmp/x").unwrap(), PathBuf::from("/tmp/x"));
        assert_eq!(tool.resolve("x").unwrap(), PathBuf::from("/work/x"));
    }

    #[test]
    fn actions_parse_from_tagged_arguments() {
        let action = FileAction::from_arguments(json!({"action": "list_files"})).unwrap();
        assert_eq!(action, FileAction::ListFiles { directory: None });

        let action = FileAction::from_arguments(
            json!({"action": "upload_file", "filename": "a.txt", "content": "hi"}),
        )
        .unwrap();
        assert_eq!(
            action,
            FileAction::UploadFile {
                filename: "a.txt".into(),
                content: "hi".into()
            }
        );

        let err = FileAction::from_arguments(json!({"action": "rename_file"})).unwrap_err();
        assert!(err.to_string().contains("Invalid file management action"));

        let err = FileAction::from_arguments(json!({"action": "download_file"})).unwrap_err();
        assert!(err.to_string().contains("filename"));
    }
}

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Failures a tool call can end in. The `Display` text is what the model sees.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Error: {0}")]
    Io(String),

    #[error("{0}")]
    ExecutionFailed(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Tool timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Tool call cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Status channel attached to failed results
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    UnknownTool,
    InvalidArguments,
    Io,
    ExecutionFailed,
    PermissionDenied,
    Timeout,
    Cancelled,
    Internal,
}

impl ToolError {
    pub fn kind(&self) -> ToolErrorKind {
        match self {
            ToolError::UnknownTool(_) => ToolErrorKind::UnknownTool,
            ToolError::InvalidArguments(_) => ToolErrorKind::InvalidArguments,
            ToolError::Io(_) => ToolErrorKind::Io,
            ToolError::ExecutionFailed(_) => ToolErrorKind::ExecutionFailed,
            ToolError::PermissionDenied(_) => ToolErrorKind::PermissionDenied,
            ToolError::Timeout(_) => ToolErrorKind::Timeout,
            ToolError::Cancelled => ToolErrorKind::Cancelled,
            ToolError::Internal(_) => ToolErrorKind::Internal,
        }
    }
}

impl From<std::io::Error> for ToolError {
    fn from(e: std::io::Error) -> Self {
        ToolError::Io(e.to_string())
    }
}

pub type ToolResult<T> = Result<T, ToolError>;

// Toolgate Core Library
// Tool invocation gateway for realtime voice/text assistants

pub mod config;
pub mod dispatcher;
pub mod session;
pub mod tools;

// Export core types
pub use config::ToolsConfig;
pub use dispatcher::{DispatchStats, Dispatcher, ToolCallRequest, ToolCallResult};
pub use session::{Gateway, Session, SessionAdapter, SessionContext, ToolCallEvent};
pub use tools::{Tool, ToolDefinition, ToolError, ToolErrorKind, ToolRegistry, ToolResult};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, GatewayError>;

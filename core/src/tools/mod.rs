pub mod definition;
pub mod error;
pub mod native;
pub mod registry;
pub mod traits;

// Re-export common types
pub use definition::ToolDefinition;
pub use error::{ToolError, ToolErrorKind, ToolResult};
pub use registry::ToolRegistry;
pub use traits::Tool;

//! Tool registry behaviour

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use toolgate_core::tools::native::register_builtin_tools;
use toolgate_core::{
    GatewayError, SessionContext, Tool, ToolDefinition, ToolRegistry, ToolResult, ToolsConfig,
};

struct NamedTool(&'static str);

#[async_trait]
impl Tool for NamedTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.0, "test tool", json!({"type": "object", "properties": {}}))
    }

    async fn call(&self, _ctx: &SessionContext, _arguments: Value) -> ToolResult<String> {
        Ok(self.0.to_string())
    }
}

#[test]
fn resolve_returns_the_registered_handler() {
    let registry = ToolRegistry::new();
    let alpha: Arc<dyn Tool> = Arc::new(NamedTool("alpha"));
    let beta: Arc<dyn Tool> = Arc::new(NamedTool("beta"));

    registry.register(Arc::clone(&alpha)).unwrap();
    registry.register(Arc::clone(&beta)).unwrap();

    assert!(Arc::ptr_eq(&registry.resolve("alpha").unwrap(), &alpha));
    assert!(Arc::ptr_eq(&registry.resolve("beta").unwrap(), &beta));
    assert_eq!(registry.len(), 2);
}

#[test]
fn duplicate_names_are_rejected() {
    let registry = ToolRegistry::new();
    let first: Arc<dyn Tool> = Arc::new(NamedTool("alpha"));
    registry.register(Arc::clone(&first)).unwrap();

    let err = registry.register(Arc::new(NamedTool("alpha"))).unwrap_err();
    assert!(matches!(err, GatewayError::DuplicateTool(ref n) if n == "alpha"));

    // The original registration is untouched
    assert!(Arc::ptr_eq(&registry.resolve("alpha").unwrap(), &first));
    assert_eq!(registry.len(), 1);
}

#[test]
fn unknown_names_fail_to_resolve() {
    let registry = ToolRegistry::new();
    assert!(registry.is_empty());
    assert!(matches!(
        registry.resolve("missing"),
        Err(GatewayError::UnknownTool(ref n)) if n == "missing"
    ));
    assert!(registry.definition("missing").is_none());
}

#[test]
fn definitions_are_sorted_by_name() {
    let registry = ToolRegistry::new();
    for name in ["gamma", "alpha", "beta"] {
        registry.register(Arc::new(NamedTool(name))).unwrap();
    }
    assert_eq!(registry.names(), vec!["alpha", "beta", "gamma"]);
}

#[test]
fn builtin_tools_follow_config() {
    let mut config = ToolsConfig::default();
    config.code.enabled = true;
    config.shell.enabled = true;

    let registry = ToolRegistry::new();
    register_builtin_tools(&registry, &config).unwrap();
    assert_eq!(
        registry.names(),
        vec!["code_execution", "file_management", "shell_command"]
    );

    let def = registry.definition("file_management").unwrap();
    assert_eq!(def.required(), vec!["action"]);

    config.code.enabled = false;
    config.shell.enabled = false;
    let restricted = ToolRegistry::new();
    register_builtin_tools(&restricted, &config).unwrap();
    assert_eq!(restricted.names(), vec!["file_management"]);
}

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use toolgate_core::config::DispatchConfig;
use toolgate_core::{
    Dispatcher, SessionContext, Tool, ToolCallRequest, ToolDefinition, ToolErrorKind,
    ToolRegistry, ToolResult, ToolsConfig,
};

// Mock tool that echoes its `text` argument and counts invocations
struct EchoTool {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Tool for EchoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "test.echo",
            "Echo text back",
            json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            }),
        )
    }

    async fn call(&self, _ctx: &SessionContext, arguments: Value) -> ToolResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(arguments["text"].as_str().unwrap_or("<none>").to_string())
    }
}

// Mock tool that sleeps and tracks how many calls overlap
struct SlowTool {
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl SlowTool {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Tool for SlowTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("test.slow", "Sleep for a while", json!({"type": "object"}))
    }

    async fn call(&self, _ctx: &SessionContext, _arguments: Value) -> ToolResult<String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok("done".to_string())
    }
}

// Mock tool that panics
struct PanicTool;

#[async_trait]
impl Tool for PanicTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("test.panic", "Always panics", json!({"type": "object"}))
    }

    async fn call(&self, _ctx: &SessionContext, _arguments: Value) -> ToolResult<String> {
        panic!("handler blew up");
    }
}

fn dispatch_config(timeout_ms: u64, max_concurrent: usize) -> DispatchConfig {
    DispatchConfig {
        max_concurrent,
        timeout_ms,
        validate_arguments: true,
    }
}

fn dispatcher_with(tools: Vec<Arc<dyn Tool>>, config: DispatchConfig) -> Dispatcher {
    let registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool).unwrap();
    }
    Dispatcher::new(registry, config)
}

#[tokio::test]
async fn test_dispatch_success() {
    let calls = Arc::new(AtomicUsize::new(0));
    let dispatcher = dispatcher_with(
        vec![Arc::new(EchoTool {
            calls: Arc::clone(&calls),
        })],
        dispatch_config(5_000, 4),
    );

    let result = dispatcher
        .dispatch(
            &SessionContext::new(),
            ToolCallRequest::new("test.echo", json!({"text": "hi there"})),
        )
        .await;

    assert!(result.success);
    assert_eq!(result.text, "hi there");
    assert_eq!(result.error_kind, None);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_tool_is_a_failure_result() {
    let dispatcher = dispatcher_with(vec![], dispatch_config(5_000, 4));

    let result = dispatcher
        .dispatch(
            &SessionContext::new(),
            ToolCallRequest::new("no.such.tool", json!({})),
        )
        .await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ToolErrorKind::UnknownTool));
    assert_eq!(result.text, "Unknown tool: no.such.tool");
}

#[tokio::test]
async fn test_missing_required_argument_never_reaches_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let dispatcher = dispatcher_with(
        vec![Arc::new(EchoTool {
            calls: Arc::clone(&calls),
        })],
        dispatch_config(5_000, 4),
    );

    let result = dispatcher
        .dispatch(
            &SessionContext::new(),
            ToolCallRequest::new("test.echo", json!({})),
        )
        .await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ToolErrorKind::InvalidArguments));
    assert!(result.text.contains("'text'"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_validation_can_be_disabled() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut config = dispatch_config(5_000, 4);
    config.validate_arguments = false;
    let dispatcher = dispatcher_with(
        vec![Arc::new(EchoTool {
            calls: Arc::clone(&calls),
        })],
        config,
    );

    let result = dispatcher
        .dispatch(
            &SessionContext::new(),
            ToolCallRequest::new("test.echo", json!({})),
        )
        .await;

    assert!(result.success);
    assert_eq!(result.text, "<none>");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_timeout_is_reported_distinctly() {
    let dispatcher = dispatcher_with(
        vec![Arc::new(SlowTool::new(Duration::from_secs(10)))],
        dispatch_config(50, 4),
    );

    let result = dispatcher
        .dispatch(
            &SessionContext::new(),
            ToolCallRequest::new("test.slow", json!({})),
        )
        .await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ToolErrorKind::Timeout));

    let stats = dispatcher.stats().await;
    assert_eq!(stats.total_calls, 1);
    assert_eq!(stats.timeouts, 1);
}

#[tokio::test]
async fn test_session_cancellation_stops_in_flight_call() {
    let dispatcher = Arc::new(dispatcher_with(
        vec![Arc::new(SlowTool::new(Duration::from_secs(10)))],
        dispatch_config(30_000, 4),
    ));
    let ctx = SessionContext::new();

    let task = {
        let dispatcher = Arc::clone(&dispatcher);
        let ctx = ctx.clone();
        tokio::spawn(async move {
            dispatcher
                .dispatch(&ctx, ToolCallRequest::new("test.slow", json!({})))
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    ctx.cancel();

    let result = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("dispatch should return promptly after cancel")
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ToolErrorKind::Cancelled));
}

#[tokio::test]
async fn test_cancelled_session_rejects_new_calls() {
    let calls = Arc::new(AtomicUsize::new(0));
    let dispatcher = dispatcher_with(
        vec![Arc::new(EchoTool {
            calls: Arc::clone(&calls),
        })],
        dispatch_config(5_000, 4),
    );
    let ctx = SessionContext::new();
    ctx.cancel();

    let result = dispatcher
        .dispatch(&ctx, ToolCallRequest::new("test.echo", json!({"text": "x"})))
        .await;
    assert_eq!(result.error_kind, Some(ToolErrorKind::Cancelled));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_panicking_handler_is_contained() {
    let dispatcher = dispatcher_with(vec![Arc::new(PanicTool)], dispatch_config(5_000, 4));

    let result = dispatcher
        .dispatch(
            &SessionContext::new(),
            ToolCallRequest::new("test.panic", json!({})),
        )
        .await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ToolErrorKind::Internal));
    assert!(result.text.contains("handler blew up"));
}

#[tokio::test]
async fn test_worker_pool_bounds_concurrency() {
    let slow = Arc::new(SlowTool::new(Duration::from_millis(30)));
    let max_in_flight = Arc::clone(&slow.max_in_flight);
    let dispatcher = dispatcher_with(vec![slow as Arc<dyn Tool>], dispatch_config(5_000, 1));
    let ctx = SessionContext::new();

    let call = || dispatcher.dispatch(&ctx, ToolCallRequest::new("test.slow", json!({})));
    let (a, b, c, d) = tokio::join!(call(), call(), call(), call());

    assert!(a.success && b.success && c.success && d.success);
    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);

    let stats = dispatcher.stats().await;
    assert_eq!(stats.total_calls, 4);
    assert_eq!(stats.successes, 4);
    assert!(stats.avg_latency_ms > 0.0);
}

#[tokio::test]
async fn test_builtin_file_roundtrip_through_dispatcher() {
    let workspace = tempfile::tempdir().unwrap();
    let mut config = ToolsConfig::default();
    config.files.base_dir = workspace.path().to_path_buf();
    config.files.workspace_root = None;
    config.dispatch = dispatch_config(5_000, 4);

    let registry = ToolRegistry::new();
    toolgate_core::tools::native::register_builtin_tools(&registry, &config).unwrap();
    let dispatcher = Dispatcher::new(registry, config.dispatch.clone());
    let ctx = SessionContext::new();

    let upload = dispatcher
        .dispatch(
            &ctx,
            ToolCallRequest::new(
                "file_management",
                json!({"action": "upload_file", "filename": "hello.txt", "content": "hello world"}),
            ),
        )
        .await;
    assert!(upload.success, "{}", upload.text);

    let download = dispatcher
        .dispatch(
            &ctx,
            ToolCallRequest::new(
                "file_management",
                json!({"action": "download_file", "filename": "hello.txt"}),
            ),
        )
        .await;
    assert!(download.success);
    assert_eq!(download.text, "hello world");

    let missing_action = dispatcher
        .dispatch(&ctx, ToolCallRequest::new("file_management", json!({})))
        .await;
    assert_eq!(
        missing_action.error_kind,
        Some(ToolErrorKind::InvalidArguments)
    );

    let bad_dir = dispatcher
        .dispatch(
            &ctx,
            ToolCallRequest::new(
                "file_management",
                json!({"action": "list_files", "directory": "missing-dir"}),
            ),
        )
        .await;
    assert!(!bad_dir.success);
    assert_eq!(bad_dir.error_kind, Some(ToolErrorKind::Io));
    assert!(bad_dir.text.starts_with("Error: "));
}

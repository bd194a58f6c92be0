use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinError;
use tracing::{debug, warn};

use crate::config::DispatchConfig;
use crate::session::SessionContext;
use crate::tools::{ToolError, ToolErrorKind, ToolRegistry, ToolResult};

/// A model-issued function call, already detached from any session transport
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new(tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// The only thing handed back to the conversation for a tool call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallResult {
    pub success: bool,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ToolErrorKind>,
}

impl ToolCallResult {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: text.into(),
            error_kind: None,
        }
    }

    pub fn failure(error: &ToolError) -> Self {
        Self {
            success: false,
            text: error.to_string(),
            error_kind: Some(error.kind()),
        }
    }
}

/// Lightweight in-dispatcher counters for observability
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchStats {
    pub total_calls: u64,
    pub successes: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub cancellations: u64,
    pub avg_latency_ms: f64,
}

enum Race {
    Finished(Result<ToolResult<String>, JoinError>),
    TimedOut,
    Cancelled,
}

/// Resolves tool calls against the registry and runs them on a bounded worker pool.
/// Every failure comes back as a [`ToolCallResult`]; nothing escapes as an error or panic.
pub struct Dispatcher {
    registry: ToolRegistry,
    config: DispatchConfig,
    permits: Arc<Semaphore>,
    stats: Mutex<DispatchStats>,
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry, config: DispatchConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            registry,
            config,
            permits,
            stats: Mutex::new(DispatchStats::default()),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn stats(&self) -> DispatchStats {
        self.stats.lock().await.clone()
    }

    /// Resolve, validate and run one tool call.
    /// Contract:
    /// - Unknown tool: failure result, handler never consulted
    /// - Invalid arguments: failure result, handler never invoked
    /// - Handler error, panic, timeout or session cancellation: failure result
    #[tracing::instrument(name = "dispatcher.dispatch", skip(self, ctx, request), fields(tool.name = %request.tool_name, session = %ctx.session_id()))]
    pub async fn dispatch(&self, ctx: &SessionContext, request: ToolCallRequest) -> ToolCallResult {
        let started = Instant::now();
        let outcome = self.invoke(ctx, request).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.record(&outcome, elapsed_ms).await;

        match outcome {
            Ok(text) => {
                debug!(target: "dispatcher", latency_ms = %elapsed_ms, "Tool call succeeded");
                ToolCallResult::ok(text)
            }
            Err(e) => {
                warn!(target: "dispatcher", error = %e, kind = ?e.kind(), latency_ms = %elapsed_ms, "Tool call failed");
                ToolCallResult::failure(&e)
            }
        }
    }

    async fn invoke(&self, ctx: &SessionContext, request: ToolCallRequest) -> ToolResult<String> {
        let ToolCallRequest {
            tool_name,
            arguments,
        } = request;

        if ctx.is_cancelled() {
            return Err(ToolError::Cancelled);
        }

        let tool = self
            .registry
            .resolve(&tool_name)
            .map_err(|_| ToolError::UnknownTool(tool_name.clone()))?;

        if self.config.validate_arguments {
            if let Some(definition) = self.registry.definition(&tool_name) {
                definition.validate_arguments(&arguments)?;
            }
        }

        let permit = tokio::select! {
            permit = Arc::clone(&self.permits).acquire_owned() => permit
                .map_err(|_| ToolError::Internal("worker pool closed".to_string()))?,
            _ = ctx.cancelled() => return Err(ToolError::Cancelled),
        };

        let task_ctx = ctx.clone();
        let mut handle = tokio::spawn(async move {
            let _permit = permit;
            tool.call(&task_ctx, arguments).await
        });

        let timeout = self.config.timeout();
        let race = tokio::select! {
            joined = &mut handle => Race::Finished(joined),
            _ = tokio::time::sleep(timeout) => Race::TimedOut,
            _ = ctx.cancelled() => Race::Cancelled,
        };

        match race {
            Race::Finished(Ok(result)) => result,
            Race::Finished(Err(e)) if e.is_panic() => Err(ToolError::Internal(format!(
                "tool '{}' panicked: {}",
                tool_name,
                panic_message(e.into_panic())
            ))),
            Race::Finished(Err(_)) => Err(ToolError::Cancelled),
            Race::TimedOut => {
                // Dropping the task's future kills any child process it owns
                handle.abort();
                Err(ToolError::Timeout(timeout))
            }
            Race::Cancelled => {
                handle.abort();
                Err(ToolError::Cancelled)
            }
        }
    }

    async fn record(&self, outcome: &ToolResult<String>, elapsed_ms: f64) {
        let mut stats = self.stats.lock().await;
        stats.total_calls += 1;
        match outcome {
            Ok(_) => stats.successes += 1,
            Err(e) => {
                stats.failures += 1;
                match e {
                    ToolError::Timeout(_) => stats.timeouts += 1,
                    ToolError::Cancelled => stats.cancellations += 1,
                    _ => {}
                }
            }
        }
        let n = stats.total_calls as f64;
        stats.avg_latency_ms += (elapsed_ms - stats.avg_latency_ms) / n;
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

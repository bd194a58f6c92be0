//! Session layer: the per-session context handed to every tool call, the
//! adapter interface a realtime client implements, and the gateway that wires
//! the two together.
//!
//! A session is opened by registering every tool definition with the adapter.
//! Only once that completes does the caller get a [`Session`] able to route
//! tool-call events, so no call can reach the dispatcher before registration.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ToolsConfig;
use crate::dispatcher::{Dispatcher, ToolCallRequest, ToolCallResult};
use crate::tools::native::register_builtin_tools;
use crate::tools::{ToolDefinition, ToolRegistry};
use crate::{GatewayError, Result};

/// State scoped to one conversation, passed explicitly to every dispatch
#[derive(Clone, Debug)]
pub struct SessionContext {
    inner: Arc<ContextInner>,
}

#[derive(Debug)]
struct ContextInner {
    session_id: String,
    track_id: RwLock<String>,
    started_at: DateTime<Utc>,
    cancel: CancellationToken,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ContextInner {
                session_id: Uuid::new_v4().to_string(),
                track_id: RwLock::new(Uuid::new_v4().to_string()),
                started_at: Utc::now(),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    /// Identifier of the current response track
    pub async fn track_id(&self) -> String {
        self.inner.track_id.read().await.clone()
    }

    /// Start a new response track, returning its id
    pub async fn rotate_track_id(&self) -> String {
        let next = Uuid::new_v4().to_string();
        *self.inner.track_id.write().await = next.clone();
        next
    }

    /// Cancel every in-flight and future tool call of this session
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Resolves once the session is cancelled
    pub async fn cancelled(&self) {
        self.inner.cancel.cancelled().await
    }
}

/// A tool call as emitted by the realtime client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallEvent {
    pub call_id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl From<ToolCallEvent> for ToolCallRequest {
    fn from(event: ToolCallEvent) -> Self {
        ToolCallRequest::new(event.name, event.arguments)
    }
}

/// What the gateway needs from a realtime conversation client
#[async_trait]
pub trait SessionAdapter: Send + Sync {
    /// Surface a tool to the model and route matching calls back to the gateway
    async fn add_tool(&self, definition: ToolDefinition) -> Result<()>;

    /// Feed a tool result back into the model's context
    async fn send_tool_result(&self, call_id: String, result: ToolCallResult) -> Result<()>;
}

/// Owns the dispatcher and tracks open sessions
#[derive(Clone)]
pub struct Gateway {
    dispatcher: Arc<Dispatcher>,
    sessions: Arc<DashMap<String, SessionContext>>,
}

impl Gateway {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            sessions: Arc::new(DashMap::new()),
        }
    }

    /// Build a gateway with the built-in tools registered from `config`
    pub fn from_config(config: &ToolsConfig) -> Result<Self> {
        config.validate()?;
        let registry = ToolRegistry::new();
        register_builtin_tools(&registry, config)?;
        let dispatcher = Dispatcher::new(registry, config.dispatch.clone());
        Ok(Self::new(Arc::new(dispatcher)))
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Register every tool with `adapter` concurrently and hand back the session
    /// once all registrations have completed.
    pub async fn open_session(&self, adapter: Arc<dyn SessionAdapter>) -> Result<Session> {
        let ctx = SessionContext::new();
        let definitions = self.dispatcher.registry().definitions();
        let count = definitions.len();

        let mut registrations = JoinSet::new();
        for definition in definitions {
            let adapter = Arc::clone(&adapter);
            registrations.spawn(async move {
                let name = definition.name.clone();
                adapter.add_tool(definition).await.map_err(|e| (name, e))
            });
        }

        while let Some(joined) = registrations.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err((name, e))) => {
                    return Err(GatewayError::Session(format!(
                        "failed to register tool '{}': {}",
                        name, e
                    )))
                }
                Err(e) => {
                    return Err(GatewayError::Session(format!(
                        "tool registration task failed: {}",
                        e
                    )))
                }
            }
        }

        self.sessions
            .insert(ctx.session_id().to_string(), ctx.clone());
        info!(target: "session", session = %ctx.session_id(), tools = count, "Session opened");

        Ok(Session {
            ctx,
            adapter,
            dispatcher: Arc::clone(&self.dispatcher),
            sessions: Arc::clone(&self.sessions),
        })
    }

    /// Cancel and forget every open session
    pub fn shutdown(&self) {
        for entry in self.sessions.iter() {
            entry.value().cancel();
        }
        let closed = self.sessions.len();
        self.sessions.clear();
        info!(target: "session", closed, "Gateway shut down");
    }
}

/// An open conversation with tools registered. Closing (or dropping) it cancels
/// any tool call still running.
pub struct Session {
    ctx: SessionContext,
    adapter: Arc<dyn SessionAdapter>,
    dispatcher: Arc<Dispatcher>,
    sessions: Arc<DashMap<String, SessionContext>>,
}

impl Session {
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn id(&self) -> &str {
        self.ctx.session_id()
    }

    /// Dispatch one tool call and send its result back through the adapter.
    /// The returned error only ever concerns delivery, never the tool itself.
    pub async fn handle_tool_call(&self, event: ToolCallEvent) -> Result<ToolCallResult> {
        let call_id = event.call_id.clone();
        debug!(target: "session", session = %self.id(), call_id = %call_id, tool = %event.name, "Tool call received");

        let result = self.dispatcher.dispatch(&self.ctx, event.into()).await;
        if let Err(e) = self
            .adapter
            .send_tool_result(call_id.clone(), result.clone())
            .await
        {
            warn!(target: "session", call_id = %call_id, error = %e, "Failed to deliver tool result");
            return Err(e);
        }
        Ok(result)
    }

    /// The conversation was interrupted; start a new response track
    pub async fn interrupt(&self) -> String {
        let track = self.ctx.rotate_track_id().await;
        info!(target: "session", session = %self.id(), track_id = %track, "Conversation interrupted");
        track
    }

    pub fn close(&self) {
        if self.sessions.remove(self.id()).is_some() {
            let open_for = Utc::now() - self.ctx.started_at();
            info!(target: "session", session = %self.id(), open_ms = open_for.num_milliseconds(), "Session closed");
        }
        self.ctx.cancel();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

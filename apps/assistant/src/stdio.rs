// JSON-lines session adapter: stands in for a realtime client by reading
// events from stdin and writing registrations/results to stdout.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use toolgate_core::{Result, SessionAdapter, ToolCallEvent, ToolCallResult, ToolDefinition};

/// Events accepted on the input stream, one JSON object per line
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum InboundEvent {
    #[serde(rename = "tool_call")]
    ToolCall(ToolCallEvent),
    #[serde(rename = "conversation.interrupted")]
    Interrupted,
    #[serde(rename = "session.end")]
    End,
    /// Error reported by the client itself; logged, never answered
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        error: serde_json::Value,
    },
}

/// Events written to the output stream
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum OutboundEvent {
    #[serde(rename = "session.created")]
    SessionCreated {
        session_id: String,
        track_id: String,
        instructions: String,
    },
    #[serde(rename = "tool.registered")]
    ToolRegistered { tool: ToolDefinition },
    #[serde(rename = "tool.result")]
    ToolResult {
        call_id: String,
        result: ToolCallResult,
    },
    #[serde(rename = "conversation.track")]
    Track { track_id: String },
    #[serde(rename = "error")]
    Error { message: String },
}

pub struct JsonLinesAdapter<W> {
    out: Mutex<W>,
}

impl<W: AsyncWrite + Unpin + Send> JsonLinesAdapter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Write one event as a single line; lines from concurrent calls never interleave
    pub async fn send(&self, event: OutboundEvent) -> Result<()> {
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');

        let mut out = self.out.lock().await;
        out.write_all(&line).await?;
        out.flush().await?;
        Ok(())
    }

    #[cfg(test)]
    pub async fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> SessionAdapter for JsonLinesAdapter<W> {
    async fn add_tool(&self, definition: ToolDefinition) -> Result<()> {
        tracing::debug!(target: "assistant", tool = %definition.name, "Announcing tool");
        self.send(OutboundEvent::ToolRegistered { tool: definition })
            .await
    }

    async fn send_tool_result(&self, call_id: String, result: ToolCallResult) -> Result<()> {
        self.send(OutboundEvent::ToolResult { call_id, result }).await
    }
}

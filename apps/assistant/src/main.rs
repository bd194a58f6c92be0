mod config;
mod stdio;

use config::AssistantConfig;
use std::sync::Arc;
use stdio::{InboundEvent, JsonLinesAdapter, OutboundEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::task::JoinSet;
use toolgate_core::Gateway;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Logging / tracing (stderr keeps stdout free for the event stream)
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,toolgate_core=info,assistant=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(target: "assistant", "Starting assistant tool host: stdin events → dispatcher → tools");

    // Load configuration (defaults + env + optional TOML overlay)
    let cfg = AssistantConfig::load();
    let gateway = Gateway::from_config(&cfg.tools)?;

    let adapter = Arc::new(JsonLinesAdapter::new(tokio::io::stdout()));
    let session = Arc::new(gateway.open_session(adapter.clone()).await?);
    adapter
        .send(OutboundEvent::SessionCreated {
            session_id: session.id().to_string(),
            track_id: session.context().track_id().await,
            instructions: cfg.system_prompt.clone(),
        })
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight = JoinSet::new();
    // EOF lets running calls finish; an explicit end or Ctrl+C cancels them
    let mut drain = true;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<InboundEvent>(line) {
                    Ok(InboundEvent::ToolCall(event)) => {
                        let session = Arc::clone(&session);
                        in_flight.spawn(async move {
                            if let Err(e) = session.handle_tool_call(event).await {
                                error!(target: "assistant", error = %e, "Tool result could not be delivered");
                            }
                        });
                    }
                    Ok(InboundEvent::Interrupted) => {
                        let track_id = session.interrupt().await;
                        adapter.send(OutboundEvent::Track { track_id }).await?;
                    }
                    Ok(InboundEvent::Error { error }) => {
                        error!(target: "assistant", error = %error, "Client reported an error");
                    }
                    Ok(InboundEvent::End) => {
                        info!(target: "assistant", "Session end requested");
                        drain = false;
                        break;
                    }
                    Err(e) => {
                        warn!(target: "assistant", error = %e, "Invalid event");
                        adapter
                            .send(OutboundEvent::Error { message: format!("Invalid event: {}", e) })
                            .await?;
                    }
                }
            }
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            _ = signal::ctrl_c() => {
                info!(target: "assistant", "Received Ctrl+C");
                drain = false;
                break;
            }
        }
    }

    if !drain {
        session.close();
    }
    while in_flight.join_next().await.is_some() {}
    session.close();

    let stats = gateway.dispatcher().stats().await;
    info!(
        target: "assistant",
        calls = stats.total_calls,
        failures = stats.failures,
        timeouts = stats.timeouts,
        avg_latency_ms = stats.avg_latency_ms,
        "Assistant shutting down"
    );
    gateway.shutdown();
    Ok(())
}

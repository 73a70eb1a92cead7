//! Pooled WebSocket sends with JSON payloads.
//!
//! Spins up an in-process WebSocket echo server and round-trips JSON
//! messages through a pooled client. Each flushed frame travels as one
//! text message.
//!
//! Run with: cargo run --example ws_send

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::info;

use wirepool::{Client, PoolConfig, WsDialer};

async fn spawn_ws_echo() -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(message)) = ws.next().await {
                    if message.is_text() || message.is_binary() {
                        if ws.send(message).await.is_err() {
                            break;
                        }
                    } else if message.is_close() {
                        break;
                    }
                }
            });
        }
    });

    Ok(addr)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wirepool=debug".into()),
        )
        .init();

    let addr = spawn_ws_echo().await?;
    info!(%addr, "websocket echo server listening");

    let client = Client::new(
        Arc::new(WsDialer::new(format!("ws://{addr}"))?),
        PoolConfig::new()
            .with_capacity(4)
            .with_min_idle(1)
            .with_idle_timeout(Duration::from_secs(30))
            .with_sweep_interval(Duration::from_secs(10)),
    )?
    .with_write_timeout(Duration::from_secs(5))
    .with_read_timeout(Duration::from_secs(5));

    for seq in 0..5u32 {
        let payload = json!({ "seq": seq, "body": "hello over websocket" }).to_string();
        let reply = client.request(payload.as_bytes()).await?;
        let echoed: serde_json::Value = serde_json::from_slice(&reply)?;
        info!(seq = %echoed["seq"], "echoed");
    }

    info!(stats = ?client.stats(), "pool statistics");
    client.close().await;
    Ok(())
}

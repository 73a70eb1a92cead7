//! Pooled line-protocol sends over raw TCP.
//!
//! Spins up an in-process echo server, then drives it through a pooled
//! client from ten concurrent tasks.
//!
//! Run with: cargo run --example tcp_send

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::info;

use wirepool::{Client, LineFramer, LineReader, PoolConfig, ReturnOrder, TcpDialer};

async fn spawn_line_echo() -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (read_half, mut write_half) = stream.into_split();
                let mut lines = BufReader::new(read_half).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let reply = format!("{line}\n");
                    if write_half.write_all(reply.as_bytes()).await.is_err() {
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

    let addr = spawn_line_echo().await?;
    info!(%addr, "echo server listening");

    let client = Client::new(
        Arc::new(TcpDialer::new(addr.to_string()).with_connect_timeout(Duration::from_secs(3))),
        PoolConfig::new()
            .with_capacity(4)
            .with_min_idle(2)
            .with_pool_timeout(Duration::from_secs(5))
            .with_sweep_interval(Duration::from_secs(10))
            .with_return_order(ReturnOrder::Fifo),
    )?
    .with_write_framer(Arc::new(LineFramer))
    .with_read_framer(Arc::new(LineReader::default()))
    .with_write_timeout(Duration::from_secs(5))
    .with_read_timeout(Duration::from_secs(5));

    let mut tasks = Vec::new();
    for i in 0..10u32 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            let payload = format!("hello #{i}");
            match client.request(payload.as_bytes()).await {
                Ok(reply) => info!(reply = %String::from_utf8_lossy(&reply), "echoed"),
                Err(error) => tracing::error!(%error, "request failed"),
            }
        }));
    }
    for task in tasks {
        task.await?;
    }

    info!(stats = ?client.stats(), "pool statistics");
    client.close().await;
    Ok(())
}

//! Thin request-sending facade over the pool.
//!
//! [`Client`] wires a dial strategy and framing strategies together with a
//! [`Pool`] and exposes the acquire → write → release round as a single
//! call. It carries no pooling logic of its own.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wirepool::{Client, PoolConfig, WsDialer};
//!
//! let client = Client::new(
//!     Arc::new(WsDialer::new("ws://127.0.0.1:8081/ws")?),
//!     PoolConfig::new().with_capacity(50).with_min_idle(10),
//! )?;
//!
//! client.send(b"hello").await?;
//! # Ok::<_, wirepool::Error>(())
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use crate::config::PoolConfig;
use crate::error::Result;
use crate::pool::Pool;
use crate::stats::Stats;
use crate::transport::{ChunkReader, Dialer, FrameReader, FrameWriter, RawFramer};

// ============================================================================
// Client
// ============================================================================

/// Pool-backed client: one call per payload, connections reused underneath.
///
/// Defaults to [`RawFramer`] writes and [`ChunkReader`] reads with no I/O
/// deadlines; adjust with the `with_*` methods.
#[derive(Clone)]
pub struct Client {
    pool: Pool,
    write_framer: Arc<dyn FrameWriter>,
    read_framer: Arc<dyn FrameReader>,
    write_timeout: Duration,
    read_timeout: Duration,
}

impl Client {
    /// Creates a client with its own pool over the given dial strategy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the pool
    /// configuration fails validation.
    pub fn new(dialer: Arc<dyn Dialer>, config: PoolConfig) -> Result<Self> {
        Ok(Self {
            pool: Pool::new(dialer, config)?,
            write_framer: Arc::new(RawFramer),
            read_framer: Arc::new(ChunkReader::default()),
            write_timeout: Duration::ZERO,
            read_timeout: Duration::ZERO,
        })
    }

    /// Sets the write-framing strategy.
    #[inline]
    #[must_use]
    pub fn with_write_framer(mut self, framer: Arc<dyn FrameWriter>) -> Self {
        self.write_framer = framer;
        self
    }

    /// Sets the read-framing strategy.
    #[inline]
    #[must_use]
    pub fn with_read_framer(mut self, framer: Arc<dyn FrameReader>) -> Self {
        self.read_framer = framer;
        self
    }

    /// Bounds each framed write. Zero disables the deadline.
    #[inline]
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Bounds each framed read. Zero disables the deadline.
    #[inline]
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Returns the underlying pool.
    #[inline]
    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Takes a pool statistics snapshot.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> Stats {
        self.pool.stats()
    }
}

// ============================================================================
// Client - Operations
// ============================================================================

impl Client {
    /// Sends one payload: acquire, framed write, release.
    ///
    /// The connection is released back to the pool whether the write
    /// succeeds or not; the pool's time-based health check decides its
    /// fate on the next checkout.
    ///
    /// # Errors
    ///
    /// Any [`Pool::acquire`] error, or the write error.
    pub async fn send(&self, payload: &[u8]) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let result = conn
            .with_writer(self.write_timeout, self.write_framer.as_ref(), payload)
            .await;
        self.pool.release(conn).await;
        result
    }

    /// Sends one payload and reads one response frame on the same
    /// connection.
    ///
    /// # Errors
    ///
    /// Any [`Pool::acquire`] error, or the first write/read error.
    pub async fn request(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let mut conn = self.pool.acquire().await?;
        let result = async {
            conn.with_writer(self.write_timeout, self.write_framer.as_ref(), payload)
                .await?;
            conn.with_reader(self.read_timeout, self.read_framer.as_ref())
                .await
        }
        .await;
        self.pool.release(conn).await;
        result
    }

    /// Closes the underlying pool. Idempotent.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    use crate::transport::{LineFramer, LineReader, TcpDialer};

    /// Line-oriented echo server; returns its address.
    async fn spawn_line_echo() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

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

        addr
    }

    fn line_client(addr: std::net::SocketAddr) -> Client {
        Client::new(
            Arc::new(TcpDialer::new(addr.to_string())),
            PoolConfig::new().with_capacity(2).without_sweeper(),
        )
        .expect("client")
        .with_write_framer(Arc::new(LineFramer))
        .with_read_framer(Arc::new(LineReader::default()))
        .with_write_timeout(Duration::from_secs(5))
        .with_read_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_send_reuses_connections() {
        let addr = spawn_line_echo().await;
        let client = line_client(addr);

        client.send(b"one").await.expect("send");
        client.send(b"two").await.expect("send");
        client.send(b"three").await.expect("send");

        let stats = client.stats();
        assert_eq!(stats.total_created, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);

        client.close().await;
    }

    #[tokio::test]
    async fn test_request_round_trip() {
        let addr = spawn_line_echo().await;
        let client = line_client(addr);

        let reply = client.request(b"marco").await.expect("request");
        assert_eq!(reply, b"marco");

        // The same connection serves the follow-up.
        let reply = client.request(b"polo").await.expect("request");
        assert_eq!(reply, b"polo");
        assert_eq!(client.stats().total_created, 1);

        client.close().await;
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let addr = spawn_line_echo().await;
        let client = line_client(addr);

        client.close().await;
        let err = client.send(b"late").await.expect_err("must fail");
        assert!(matches!(err, crate::Error::PoolClosed));
    }

    #[tokio::test]
    async fn test_concurrent_sends_share_pool() {
        let addr = spawn_line_echo().await;
        let client = line_client(addr);

        let mut tasks = Vec::new();
        for i in 0..10u32 {
            let client = client.clone();
            tasks.push(tokio::spawn(async move {
                let payload = format!("msg-{i}");
                let reply = client.request(payload.as_bytes()).await.expect("request");
                assert_eq!(reply, payload.as_bytes());
            }));
        }
        for task in tasks {
            task.await.expect("task");
        }

        // Capacity 2: never more than two dials for ten requests.
        assert!(client.stats().total_created <= 2);
        client.close().await;
    }
}

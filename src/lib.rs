//! wirepool - Bounded connection pool for raw TCP and WebSocket transports.
//!
//! A transport-agnostic pool of reusable, long-lived connections shared by
//! concurrent callers, with health-based eviction, idle warm-up, and
//! backpressure when exhausted.
//!
//! # Architecture
//!
//! ```text
//! Client.send ──► Pool.acquire ──► Dialer (miss) / idle registry (hit)
//!                     │
//!                     ▼
//!            Connection (exclusive) ──► FrameWriter / FrameReader
//!                     │
//!                     ▼
//!               Pool.release ──► health check ──► idle registry / closed
//!                                       ▲
//!                          background sweeper (evict + warm-up)
//! ```
//!
//! Key guarantees:
//!
//! - **No double-use**: a checked-out connection is owned by exactly one
//!   caller; exclusivity is enforced by move semantics.
//! - **Bounded**: in-use plus idle connections never exceed capacity; an
//!   exhausted pool applies backpressure with a configurable wait.
//! - **No leaks**: every retirement path frees the admission slot exactly
//!   once, including cancelled acquires and dropped checkouts.
//! - **Timely recycling**: stale connections (by age or idle time) are
//!   evicted on checkout, on release, and by the background sweeper.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use wirepool::{Client, PoolConfig, Result, WsDialer};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::new(
//!         Arc::new(WsDialer::new("ws://127.0.0.1:8081/ws")?),
//!         PoolConfig::new()
//!             .with_capacity(50)
//!             .with_min_idle(10)
//!             .with_pool_timeout(std::time::Duration::from_secs(5)),
//!     )?;
//!
//!     client.send(b"hello").await?;
//!     println!("{:?}", client.stats());
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`pool`] | Pool manager: acquire/release, sweeper, admission control |
//! | [`client`] | Thin acquire → write → release facade |
//! | [`config`] | Pool configuration and checkout-order policy |
//! | [`stats`] | Statistics snapshot |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`transport`] | Connection wrapper, dialers, framing strategies |

// ============================================================================
// Modules
// ============================================================================

/// Thin request-sending facade over the pool.
pub mod client;

/// Pool configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Connection pool manager.
pub mod pool;

/// Pool statistics.
pub mod stats;

/// Transport layer: connection wrapper and pluggable transport hooks.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::Client;

// Configuration types
pub use config::{PoolConfig, ReturnOrder};

// Error types
pub use error::{Error, Result};

// Pool types
pub use pool::{Pool, PooledConnection};

// Statistics types
pub use stats::Stats;

// Transport types
pub use transport::{
    ChunkReader, Connection, Dialer, FrameReader, FrameWriter, LineFramer, LineReader, RawFramer,
    TcpDialer, Transport, WsDialer, WsMode, WsStream,
};

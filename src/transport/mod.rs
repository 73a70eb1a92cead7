//! Transport layer: pooled connections and pluggable transport hooks.
//!
//! The pool core never touches a concrete transport. It works against three
//! narrow seams, each supplied per pool instance:
//!
//! ```text
//! ┌──────────────┐   dial()    ┌──────────────────────────────┐
//! │     Pool     │────────────►│ Dialer (tcp, websocket, ...) │
//! └──────┬───────┘             └──────────────────────────────┘
//!        │ hands out
//! ┌──────▼───────┐  write_frame  ┌────────────────────────────┐
//! │  Connection  │──────────────►│ FrameWriter / FrameReader  │
//! └──────────────┘  read_frame   └────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Buffered connection wrapper with deadline bookkeeping |
//! | `framing` | Frame encoding/decoding strategy traits and stock impls |
//! | `tcp` | Raw TCP dialer |
//! | `ws` | WebSocket dialer and byte-stream adapter |

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// Buffered connection wrapper.
pub mod connection;

/// Frame encoding and decoding strategies.
pub mod framing;

/// Raw TCP transport.
pub mod tcp;

/// WebSocket transport.
pub mod ws;

// ============================================================================
// Transport
// ============================================================================

/// A live byte-stream transport handle.
///
/// Anything that is `AsyncRead + AsyncWrite + Send + Unpin` qualifies:
/// [`tokio::net::TcpStream`], the crate's [`ws::WsStream`] adapter,
/// [`tokio::io::DuplexStream`] in tests, and so on.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

// ============================================================================
// Dialer
// ============================================================================

/// Dial strategy: establishes one new transport.
///
/// Invoked by the pool on an acquire miss and by the sweeper during idle
/// warm-up. Dial failures are propagated verbatim to the acquiring caller;
/// the pool performs no retry or backoff. Cancelling the returned future
/// (dropping it) aborts the dial.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Establishes a new transport, including any transport-level
    /// handshake (for example the WebSocket upgrade).
    ///
    /// # Errors
    ///
    /// Returns the underlying transport error on failure.
    async fn dial(&self) -> Result<Box<dyn Transport>>;
}

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::Connection;
pub use framing::{ChunkReader, FrameReader, FrameWriter, LineFramer, LineReader, RawFramer};
pub use tcp::TcpDialer;
pub use ws::{WsDialer, WsMode, WsStream};

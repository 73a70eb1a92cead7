//! Buffered connection wrapper.
//!
//! [`Connection`] wraps one live transport with a buffered reader, a frame
//! staging buffer for writes, and the timestamp bookkeeping the pool's
//! health checks rely on.
//!
//! # Ownership
//!
//! A `Connection` handed out by the pool is owned exclusively by the caller
//! until it is released; `&mut self` on every I/O operation serializes
//! reads and writes by construction. The pool keeps no handle to a
//! checked-out connection beyond its admission accounting.
//!
//! # Deadlines
//!
//! Scoped operations take a fixed timeout; zero means no deadline. The
//! effective deadline for a positive timeout is now + timeout. Callers
//! carrying their own deadline wrap the call in [`tokio::time::timeout`];
//! nested timeouts resolve to whichever deadline is earlier. Every scoped
//! operation stamps the last-used time on entry: attempted use, not
//! successful use.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::time::{self, Instant};
use tracing::trace;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::transport::framing::{FrameReader, FrameWriter};
use crate::transport::Transport;

// ============================================================================
// Connection
// ============================================================================

/// One live, pooled transport connection.
///
/// Created by the pool from a successful dial; destroyed when it fails a
/// health check, when the pool shuts down, or when the sweeper evicts it.
pub struct Connection {
    /// Connection id for log correlation.
    id: Uuid,

    /// Transport behind a buffered reader; writes pass through unbuffered.
    stream: BufReader<Box<dyn Transport>>,

    /// Frame staging buffer: framers encode a complete frame here, then
    /// the whole frame is flushed with a single write.
    write_buf: Vec<u8>,

    /// Creation time.
    created_at: Instant,

    /// Last-used time as milliseconds since `created_at`. Written on every
    /// scoped operation, readable while another context updates it.
    used_at_ms: AtomicU64,

    /// Whether any post-dial handshake has completed.
    initialized: bool,

    /// Whether this connection has entered pool accounting.
    pooled: bool,
}

// ============================================================================
// Connection - Construction & Bookkeeping
// ============================================================================

impl Connection {
    /// Wraps a freshly dialed transport.
    #[must_use]
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            id: Uuid::new_v4(),
            stream: BufReader::new(transport),
            write_buf: Vec::new(),
            created_at: Instant::now(),
            used_at_ms: AtomicU64::new(0),
            initialized: false,
            pooled: false,
        }
    }

    /// Returns the connection id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the creation time.
    #[inline]
    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Returns the last-used time.
    #[inline]
    #[must_use]
    pub fn used_at(&self) -> Instant {
        self.created_at + Duration::from_millis(self.used_at_ms.load(Ordering::Relaxed))
    }

    /// Stamps the last-used time to the current instant.
    #[inline]
    pub(crate) fn touch(&self) {
        let elapsed_ms = self.created_at.elapsed().as_millis() as u64;
        self.used_at_ms.store(elapsed_ms, Ordering::Relaxed);
    }

    /// Returns `true` once any post-dial handshake has completed.
    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Marks the post-dial handshake as completed.
    #[inline]
    pub fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    /// Returns `true` once the connection has entered pool accounting.
    #[inline]
    #[must_use]
    pub fn is_pooled(&self) -> bool {
        self.pooled
    }

    #[inline]
    pub(crate) fn mark_pooled(&mut self) {
        self.pooled = true;
    }

    /// Returns `true` if the connection has exceeded either limit.
    ///
    /// A `None` limit never expires the connection.
    #[must_use]
    pub(crate) fn is_stale(
        &self,
        max_conn_age: Option<Duration>,
        idle_timeout: Option<Duration>,
        now: Instant,
    ) -> bool {
        if let Some(max_age) = max_conn_age
            && now.saturating_duration_since(self.created_at) > max_age
        {
            return true;
        }
        if let Some(idle) = idle_timeout
            && now.saturating_duration_since(self.used_at()) > idle
        {
            return true;
        }
        false
    }
}

// ============================================================================
// Connection - I/O
// ============================================================================

impl Connection {
    /// Writes bytes directly to the transport, bypassing the frame buffer.
    ///
    /// Returns the number of bytes written; a single call may write less
    /// than the full slice.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on transport failure.
    pub async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let written = self.stream.write(buf).await?;
        trace!(conn_id = %self.id, written, "direct write");
        Ok(written)
    }

    /// Scoped buffered write: encodes one frame and flushes it atomically.
    ///
    /// Resets the staging buffer if a previous call terminated abnormally
    /// and left unflushed bytes behind, so a stale partial frame never
    /// corrupts this one. The buffer is empty again when this returns,
    /// success or not.
    ///
    /// A positive `timeout` bounds the whole operation; zero applies no
    /// deadline.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if the deadline elapses
    /// - [`Error::InvalidFrame`] if the framer rejects the payload
    /// - [`Error::Io`] on transport failure
    pub async fn with_writer(
        &mut self,
        timeout: Duration,
        framer: &dyn FrameWriter,
        payload: &[u8],
    ) -> Result<()> {
        self.touch();

        if !self.write_buf.is_empty() {
            trace!(
                conn_id = %self.id,
                leftover = self.write_buf.len(),
                "resetting dirty write buffer"
            );
            self.write_buf.clear();
        }

        let result = if timeout.is_zero() {
            self.flush_frame(framer, payload).await
        } else {
            match time::timeout(timeout, self.flush_frame(framer, payload)).await {
                Ok(result) => result,
                Err(_) => Err(Error::timeout("write", timeout.as_millis() as u64)),
            }
        };

        if result.is_err() {
            self.write_buf.clear();
        }
        result
    }

    /// Encodes the frame into the staging buffer and writes it out.
    async fn flush_frame(&mut self, framer: &dyn FrameWriter, payload: &[u8]) -> Result<()> {
        framer.write_frame(&mut self.write_buf, payload)?;
        self.stream.write_all(&self.write_buf).await?;
        self.stream.flush().await?;
        self.write_buf.clear();
        Ok(())
    }

    /// Scoped read: decodes one frame through the buffered reader.
    ///
    /// Same deadline rule as [`with_writer`](Self::with_writer). Reads
    /// need no buffer reset: bytes left in the read buffer by an aborted
    /// call are simply the next bytes of the stream.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if the deadline elapses
    /// - [`Error::Io`] on transport failure or truncated frame
    pub async fn with_reader(
        &mut self,
        timeout: Duration,
        framer: &dyn FrameReader,
    ) -> Result<Vec<u8>> {
        self.touch();

        if timeout.is_zero() {
            framer.read_frame(&mut self.stream).await
        } else {
            match time::timeout(timeout, framer.read_frame(&mut self.stream)).await {
                Ok(result) => result,
                Err(_) => Err(Error::timeout("read", timeout.as_millis() as u64)),
            }
        }
    }

    /// Shuts the transport down.
    ///
    /// The pool guarantees at most one close per connection; behavior of a
    /// second close is transport-defined.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the transport shutdown fails.
    pub async fn close(&mut self) -> Result<()> {
        trace!(conn_id = %self.id, "closing connection");
        self.stream.shutdown().await?;
        Ok(())
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("initialized", &self.initialized)
            .field("pooled", &self.pooled)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

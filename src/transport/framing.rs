//! Frame encoding and decoding strategies.
//!
//! The pool treats payloads as opaque bytes; how they are laid out on the
//! wire is a per-client choice. A [`FrameWriter`] encodes one complete
//! frame into a connection's staging buffer (the same shape as
//! `tokio_util`'s `Encoder`); a [`FrameReader`] decodes one frame's
//! payload from the buffered reader.
//!
//! Stock strategies:
//!
//! - [`RawFramer`] / [`ChunkReader`]: opaque byte passthrough. The
//!   natural choice over the WebSocket transport, where message framing is
//!   handled below this seam.
//! - [`LineFramer`] / [`LineReader`]: newline-delimited frames over raw
//!   byte streams.

// ============================================================================
// Imports
// ============================================================================

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default upper bound on a single decoded frame.
const DEFAULT_MAX_FRAME: usize = 64 * 1024;

// ============================================================================
// Strategy Traits
// ============================================================================

/// Write-framing strategy: encodes one payload as one complete frame.
///
/// Implementations append exactly one frame to `dst`; the connection
/// flushes the buffer as a unit afterwards.
pub trait FrameWriter: Send + Sync {
    /// Encodes `payload` into `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFrame`] if the payload cannot be represented
    /// in this framing.
    fn write_frame(&self, dst: &mut Vec<u8>, payload: &[u8]) -> Result<()>;
}

/// Read-framing strategy: decodes one frame's payload from the stream.
#[async_trait]
pub trait FrameReader: Send + Sync {
    /// Reads one frame, returning its payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on transport failure or a truncated stream.
    async fn read_frame(
        &self,
        reader: &mut (dyn AsyncBufRead + Send + Unpin),
    ) -> Result<Vec<u8>>;
}

// ============================================================================
// Raw Frames
// ============================================================================

/// Passthrough framing: the payload is the frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawFramer;

impl FrameWriter for RawFramer {
    fn write_frame(&self, dst: &mut Vec<u8>, payload: &[u8]) -> Result<()> {
        dst.extend_from_slice(payload);
        Ok(())
    }
}

/// Reads whatever bytes the transport has ready, up to `max_frame`.
///
/// Mirrors the raw-TCP read strategy: a single read, no delimiter. An
/// empty result means the remote closed the stream.
#[derive(Debug, Clone, Copy)]
pub struct ChunkReader {
    /// Maximum bytes returned per frame.
    pub max_frame: usize,
}

impl Default for ChunkReader {
    fn default() -> Self {
        Self {
            max_frame: DEFAULT_MAX_FRAME,
        }
    }
}

#[async_trait]
impl FrameReader for ChunkReader {
    async fn read_frame(
        &self,
        reader: &mut (dyn AsyncBufRead + Send + Unpin),
    ) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.max_frame];
        let read = reader.read(&mut buf).await?;
        buf.truncate(read);
        Ok(buf)
    }
}

// ============================================================================
// Line Frames
// ============================================================================

/// Newline-delimited framing for raw byte streams.
///
/// Rejects payloads containing an embedded newline, since they cannot be
/// reconstructed by the matching [`LineReader`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LineFramer;

impl FrameWriter for LineFramer {
    fn write_frame(&self, dst: &mut Vec<u8>, payload: &[u8]) -> Result<()> {
        if payload.contains(&b'\n') {
            return Err(Error::invalid_frame("payload contains embedded newline"));
        }
        dst.reserve(payload.len() + 1);
        dst.extend_from_slice(payload);
        dst.push(b'\n');
        Ok(())
    }
}

/// Reads one newline-terminated frame, stripping the delimiter.
#[derive(Debug, Clone, Copy)]
pub struct LineReader {
    /// Maximum accepted frame length, delimiter included.
    pub max_frame: usize,
}

impl Default for LineReader {
    fn default() -> Self {
        Self {
            max_frame: DEFAULT_MAX_FRAME,
        }
    }
}

#[async_trait]
impl FrameReader for LineReader {
    async fn read_frame(
        &self,
        reader: &mut (dyn AsyncBufRead + Send + Unpin),
    ) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let read = reader.read_until(b'\n', &mut buf).await?;
        if read == 0 {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream closed before frame",
            )));
        }
        if buf.len() > self.max_frame {
            return Err(Error::invalid_frame(format!(
                "frame exceeds {} bytes",
                self.max_frame
            )));
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        Ok(buf)
    }
}

// ============================================================================
// Tests
// ============================================================================

//! WebSocket transport.
//!
//! [`WsDialer`] performs the WebSocket client handshake and adapts the
//! message stream into the crate's byte-oriented [`Transport`] via
//! [`WsStream`].
//!
//! # Framing
//!
//! tungstenite owns WebSocket frame encoding end to end, so the adapter
//! sits below the [`FrameWriter`](crate::FrameWriter) seam: bytes written
//! through the adapter accumulate until a flush, and every flush becomes
//! exactly one text or binary message. A pooled connection's scoped write
//! flushes once per frame, so one `with_writer` call produces one message.
//! On the read side, each incoming data message is surfaced as its payload
//! bytes; control frames are handled by tungstenite and never surface.

// ============================================================================
// Imports
// ============================================================================

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use async_trait::async_trait;
use futures_util::{Sink, Stream};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_tungstenite::tungstenite::{Bytes, Error as WsError, Message};
use tokio_tungstenite::{WebSocketStream, connect_async};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::transport::{Dialer, Transport};

// ============================================================================
// WsMode
// ============================================================================

/// Message type used for outgoing frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WsMode {
    /// Flushed bytes are sent as text messages (must be valid UTF-8).
    #[default]
    Text,
    /// Flushed bytes are sent as binary messages.
    Binary,
}

// ============================================================================
// WsStream
// ============================================================================

/// Byte-stream adapter over a WebSocket message stream.
///
/// Writes accumulate until a flush; each flush sends one message. Reads
/// drain incoming data messages payload by payload. A close frame or the
/// end of the message stream reads as EOF.
pub struct WsStream<S> {
    /// Underlying message stream.
    ws: WebSocketStream<S>,

    /// Outgoing message type.
    mode: WsMode,

    /// Bytes written since the last flush.
    out_buf: Vec<u8>,

    /// Unconsumed payload of the last data message.
    in_buf: Bytes,

    /// Remote sent a close frame or the stream ended.
    read_closed: bool,
}

impl<S> WsStream<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    /// Wraps an established WebSocket stream.
    #[must_use]
    pub fn new(ws: WebSocketStream<S>, mode: WsMode) -> Self {
        Self {
            ws,
            mode,
            out_buf: Vec::new(),
            in_buf: Bytes::new(),
            read_closed: false,
        }
    }
}

/// Maps a tungstenite error onto `io::Error`, unwrapping I/O causes.
fn ws_to_io(error: WsError) -> io::Error {
    match error {
        WsError::Io(io_error) => io_error,
        other => io::Error::other(other),
    }
}

impl<S> AsyncRead for WsStream<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            if !this.in_buf.is_empty() {
                let take = this.in_buf.len().min(buf.remaining());
                buf.put_slice(&this.in_buf.split_to(take));
                return Poll::Ready(Ok(()));
            }
            if this.read_closed {
                return Poll::Ready(Ok(()));
            }
            match ready!(Pin::new(&mut this.ws).poll_next(cx)) {
                Some(Ok(message)) => match message {
                    Message::Close(_) => this.read_closed = true,
                    // Control frames are answered by tungstenite itself.
                    Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
                    data => this.in_buf = data.into_data(),
                },
                Some(Err(error)) => return Poll::Ready(Err(ws_to_io(error))),
                None => this.read_closed = true,
            }
        }
    }
}

impl<S> AsyncWrite for WsStream<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.get_mut().out_buf.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if !this.out_buf.is_empty() {
            ready!(Pin::new(&mut this.ws).poll_ready(cx)).map_err(ws_to_io)?;
            let payload = std::mem::take(&mut this.out_buf);
            let message = match this.mode {
                WsMode::Binary => Message::binary(payload),
                WsMode::Text => {
                    let text = String::from_utf8(payload).map_err(|error| {
                        io::Error::new(io::ErrorKind::InvalidData, error)
                    })?;
                    Message::text(text)
                }
            };
            Pin::new(&mut this.ws).start_send(message).map_err(ws_to_io)?;
        }
        Pin::new(&mut this.ws).poll_flush(cx).map_err(ws_to_io)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        ready!(self.as_mut().poll_flush(cx))?;
        let this = self.get_mut();
        match ready!(Pin::new(&mut this.ws).poll_close(cx)) {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => {
                Poll::Ready(Ok(()))
            }
            Err(error) => Poll::Ready(Err(ws_to_io(error))),
        }
    }
}

// ============================================================================
// WsDialer
// ============================================================================

/// Dial strategy for WebSocket connections.
///
/// Performs the client handshake and returns a [`WsStream`] transport.
/// Only `ws://` URLs are supported.
///
/// # Example
///
/// ```ignore
/// use wirepool::{WsDialer, WsMode};
///
/// let dialer = WsDialer::new("ws://127.0.0.1:8081/ws")?
///     .with_mode(WsMode::Binary);
/// # Ok::<_, wirepool::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct WsDialer {
    /// Validated WebSocket URL.
    url: String,

    /// Outgoing message type for dialed connections.
    mode: WsMode,
}

impl WsDialer {
    /// Creates a dialer for the given `ws://` URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL does not parse or does not use
    /// the `ws` scheme.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let parsed =
            Url::parse(&url).map_err(|error| Error::config(format!("invalid url: {error}")))?;
        match parsed.scheme() {
            "ws" => Ok(Self {
                url,
                mode: WsMode::default(),
            }),
            "wss" => Err(Error::config("wss:// is not supported (no TLS transport)")),
            other => Err(Error::config(format!("unsupported scheme: {other}"))),
        }
    }

    /// Sets the outgoing message type.
    #[inline]
    #[must_use]
    pub fn with_mode(mut self, mode: WsMode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns the target URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Dialer for WsDialer {
    async fn dial(&self) -> Result<Box<dyn Transport>> {
        let (ws, response) = connect_async(self.url.as_str()).await?;
        debug!(url = %self.url, status = %response.status(), "websocket handshake completed");
        Ok(Box::new(WsStream::new(ws, self.mode)))
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Raw TCP transport.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time;
use tracing::debug;

use crate::error::{Error, Result};
use crate::transport::{Dialer, Transport};

// ============================================================================
// TcpDialer
// ============================================================================

/// Dial strategy for plain TCP connections.
///
/// # Example
///
/// ```ignore
/// use wirepool::TcpDialer;
///
/// let dialer = TcpDialer::new("127.0.0.1:9000")
///     .with_connect_timeout(std::time::Duration::from_secs(3));
/// ```
#[derive(Debug, Clone)]
pub struct TcpDialer {
    /// Target address, `host:port`.
    addr: String,

    /// Optional bound on connection establishment.
    connect_timeout: Option<Duration>,
}

impl TcpDialer {
    /// Creates a dialer for the given `host:port` address.
    #[inline]
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout: None,
        }
    }

    /// Bounds how long a single dial may take.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Returns the target address.
    #[inline]
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    async fn dial(&self) -> Result<Box<dyn Transport>> {
        let stream = match self.connect_timeout {
            Some(timeout) => time::timeout(timeout, TcpStream::connect(self.addr.as_str()))
                .await
                .map_err(|_| Error::timeout("connect", timeout.as_millis() as u64))??,
            None => TcpStream::connect(self.addr.as_str()).await?,
        };
        debug!(addr = %self.addr, "tcp connection established");
        Ok(Box::new(stream))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_dial_reaches_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let mut buf = [0u8; 2];
            stream.read_exact(&mut buf).await.expect("read");
            buf
        });

        let dialer = TcpDialer::new(addr.to_string());
        let mut transport = dialer.dial().await.expect("dial");
        transport.write_all(b"ok").await.expect("write");

        assert_eq!(&server.await.expect("join"), b"ok");
    }

    #[tokio::test]
    async fn test_dial_refused() {
        // Bind then drop to get a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let dialer = TcpDialer::new(addr.to_string());
        let result = dialer.dial().await;
        assert!(result.is_err());
    }
}

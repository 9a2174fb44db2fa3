//! TCP client implementation.

use super::framing::RecordFrameCodec;
use crate::connection::{Connection, Transport};
use crate::error::TransportError;
use futures::{SinkExt, StreamExt};
use seqfeed_core::{Record, RequestFrame};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

/// Configuration for TCP client.
#[derive(Debug, Clone)]
pub struct TcpClientConfig {
    /// Server address to connect to.
    pub server_addr: SocketAddr,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Enable TCP_NODELAY.
    pub tcp_nodelay: bool,
    /// Receive buffer size.
    pub recv_buffer_size: Option<usize>,
}

impl Default for TcpClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            connect_timeout: Duration::from_secs(5),
            tcp_nodelay: true,
            recv_buffer_size: None,
        }
    }
}

impl TcpClientConfig {
    /// Creates a new client config with the specified server address.
    #[must_use]
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            server_addr,
            ..Default::default()
        }
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets TCP_NODELAY option.
    #[must_use]
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }

    /// Sets the socket receive buffer size.
    #[must_use]
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = Some(size);
        self
    }
}

/// TCP connection speaking the record protocol.
pub struct TcpClient {
    framed: Framed<TcpStream, RecordFrameCodec>,
    peer_addr: SocketAddr,
}

impl TcpClient {
    /// Connects to a server with the given configuration.
    ///
    /// # Errors
    /// Returns `TransportError` if connection fails.
    pub async fn connect(config: &TcpClientConfig) -> Result<Self, TransportError> {
        let stream = tokio::time::timeout(
            config.connect_timeout,
            TcpStream::connect(config.server_addr),
        )
        .await
        .map_err(|_| TransportError::ConnectTimeout)?
        .map_err(TransportError::Io)?;

        stream.set_nodelay(config.tcp_nodelay)?;
        if let Some(size) = config.recv_buffer_size {
            socket2::SockRef::from(&stream).set_recv_buffer_size(size)?;
        }

        let peer_addr = stream.peer_addr()?;
        tracing::info!("Connected to server at {}", peer_addr);

        Ok(Self {
            framed: Framed::new(stream, RecordFrameCodec::new()),
            peer_addr,
        })
    }

    /// Sends a request to the server.
    ///
    /// # Errors
    /// Returns `TransportError` if send fails.
    pub async fn send(&mut self, request: RequestFrame) -> Result<(), TransportError> {
        self.framed.send(request).await
    }

    /// Receives the next record from the server.
    ///
    /// # Returns
    /// `Ok(Some(record))` if a record was received, `Ok(None)` if connection closed.
    ///
    /// # Errors
    /// Returns `TransportError` if receive fails or a frame is malformed.
    pub async fn recv(&mut self) -> Result<Option<Record>, TransportError> {
        self.framed.next().await.transpose()
    }

    /// Returns the peer address.
    #[must_use]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Flushes pending requests and shuts down the write half.
    pub async fn close(mut self) -> Result<(), TransportError> {
        SinkExt::<RequestFrame>::close(&mut self.framed).await?;
        tracing::debug!("Closed connection to {}", self.peer_addr);
        Ok(())
    }
}

impl Connection for TcpClient {
    async fn send(&mut self, request: RequestFrame) -> Result<(), TransportError> {
        TcpClient::send(self, request).await
    }

    async fn recv(&mut self) -> Result<Option<Record>, TransportError> {
        TcpClient::recv(self).await
    }

    async fn close(self) -> Result<(), TransportError> {
        TcpClient::close(self).await
    }
}

/// [`Transport`] opening a fresh [`TcpClient`] per round.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    config: TcpClientConfig,
}

impl TcpTransport {
    /// Creates a transport with the given client configuration.
    #[must_use]
    pub fn new(config: TcpClientConfig) -> Self {
        Self { config }
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &TcpClientConfig {
        &self.config
    }
}

impl Transport for TcpTransport {
    type Connection = TcpClient;

    async fn connect(&self) -> Result<TcpClient, TransportError> {
        TcpClient::connect(&self.config).await
    }
}

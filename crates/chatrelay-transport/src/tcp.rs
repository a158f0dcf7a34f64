//! TCP implementation of the transport traits.
//!
//! One `TcpConnection` wraps a split `TcpStream`: the buffered read half
//! and the write half each sit behind their own async mutex, so a reader
//! task and a sender can operate concurrently on clones of the same
//! handle. A `watch` channel carries the local close signal, which lets
//! [`close`](TcpConnection::close) unblock a task that is parked in
//! [`recv_line`](TcpConnection::recv_line).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, watch};

use crate::{Connection, ConnectionId, Connector, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A TCP-based [`Transport`] that listens for incoming connections.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Binds a new TCP transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::BindFailed)?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self { listener })
    }
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let conn = TcpConnection::from_stream(stream);
        tracing::debug!(id = %conn.id(), %addr, "accepted TCP connection");
        Ok(conn)
    }

    fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }
}

/// Dials outbound TCP connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

impl Connector for TcpDialer {
    type Conn = TcpConnection;
    type Error = TransportError;

    async fn connect(
        &self,
        host: &str,
        port: u32,
    ) -> Result<Self::Conn, Self::Error> {
        // Ports above u16 range fail address resolution here, which is
        // reported the same way as any other unreachable endpoint.
        let addr = format!("{host}:{port}");
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(TransportError::ConnectFailed)?;

        let conn = TcpConnection::from_stream(stream);
        tracing::debug!(id = %conn.id(), %addr, "connected");
        Ok(conn)
    }
}

/// A single line-oriented TCP connection.
#[derive(Clone)]
pub struct TcpConnection {
    id: ConnectionId,
    reader: Arc<Mutex<BufReader<OwnedReadHalf>>>,
    writer: Arc<Mutex<OwnedWriteHalf>>,
    closed: Arc<watch::Sender<bool>>,
}

impl TcpConnection {
    fn from_stream(stream: TcpStream) -> Self {
        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        let (reader, writer) = stream.into_split();
        let (closed, _) = watch::channel(false);
        Self {
            id,
            reader: Arc::new(Mutex::new(BufReader::new(reader))),
            writer: Arc::new(Mutex::new(writer)),
            closed: Arc::new(closed),
        }
    }

    async fn read_one_line(&self) -> Result<Option<String>, TransportError> {
        let mut reader = self.reader.lock().await;
        let mut line = String::new();
        let n = reader
            .read_line(&mut line)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if n == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }
}

impl Connection for TcpConnection {
    type Error = TransportError;

    async fn send_line(&self, line: &str) -> Result<(), Self::Error> {
        if *self.closed.borrow() {
            return Err(TransportError::Closed);
        }

        // One buffer per line so the payload and terminator can't be
        // interleaved with another sender's write.
        let mut framed = Vec::with_capacity(line.len() + 1);
        framed.extend_from_slice(line.as_bytes());
        framed.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&framed)
            .await
            .map_err(TransportError::SendFailed)?;
        writer.flush().await.map_err(TransportError::SendFailed)
    }

    async fn recv_line(&self) -> Result<Option<String>, Self::Error> {
        let mut closed = self.closed.subscribe();
        if *closed.borrow_and_update() {
            return Ok(None);
        }
        tokio::select! {
            result = self.read_one_line() => result,
            _ = closed.changed() => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        if self.closed.send_replace(true) {
            // Already closed by another handle.
            return Ok(());
        }
        let mut writer = self.writer.lock().await;
        writer.shutdown().await.map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

// =========================================================================
// Tests
// =========================================================================

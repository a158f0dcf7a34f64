//! Transport layer for Chatrelay.
//!
//! Provides the [`Transport`], [`Connection`], and [`Connector`] traits
//! that the session layer is written against, plus their TCP
//! implementations ([`TcpTransport`], [`TcpConnection`], [`TcpDialer`]).
//!
//! The wire unit is one UTF-8 text line, `\n` terminated. The transport
//! strips the terminator on receive and appends it on send; nothing above
//! this layer ever sees a newline.

#![allow(async_fn_in_trait)]

mod error;
mod tcp;

pub use error::TransportError;
pub use tcp::{TcpConnection, TcpDialer, TcpTransport};

use std::fmt;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections (server side).
pub trait Transport: Send + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Returns the local address the transport is bound to.
    fn local_addr(&self) -> std::io::Result<std::net::SocketAddr>;
}

/// A single peer link that can send and receive text lines.
///
/// Implementations are handles: cloning yields another handle to the same
/// underlying socket, so one clone can sit in a read loop while another
/// is held by the session for sends and forced closure.
pub trait Connection: Clone + Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one line to the remote peer (terminator appended).
    async fn send_line(&self, line: &str) -> Result<(), Self::Error>;

    /// Receives the next line from the remote peer (terminator stripped).
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed, either
    /// by the remote end or by a local [`close`](Self::close).
    async fn recv_line(&self) -> Result<Option<String>, Self::Error>;

    /// Closes the connection. Any task blocked in
    /// [`recv_line`](Self::recv_line) observes `Ok(None)`.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

/// Opens outbound connections (client side).
///
/// This is the session layer's dial hook: the client session decides
/// *when* to connect (the `#login` command), the connector decides *how*.
/// Tests substitute a mock connector to drive the state machine without
/// sockets.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced on a successful dial.
    type Conn: Connection;
    /// The error type for failed dials.
    type Error: std::error::Error + Send + Sync;

    /// Dials `host:port` and returns the established connection.
    async fn connect(
        &self,
        host: &str,
        port: u32,
    ) -> Result<Self::Conn, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_equality() {
        let a = ConnectionId::new(1);
        let b = ConnectionId::new(1);
        let c = ConnectionId::new(2);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1), "alice");
        map.insert(ConnectionId::new(2), "bob");
        assert_eq!(map[&ConnectionId::new(1)], "alice");
    }
}

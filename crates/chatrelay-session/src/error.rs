//! Error types for the session layer.

/// Errors that can occur while executing a command against a session.
///
/// These are the illegal-state-transition and setup failures of the
/// client and server state machines. All of them are handled at the
/// console boundary: the error's message is shown on the display sink
/// and the session state stays exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Opening the connection (dial or handshake send) failed.
    /// The client stays disconnected; retry by reissuing `#login`.
    #[error("connection setup failed: {0}")]
    Setup(String),

    /// `#login` was issued while the client is already connected.
    #[error("the client is already connected to a server")]
    AlreadyConnected,

    /// `#logoff` was issued while the client is not connected.
    #[error("the client is not connected to a server")]
    NotConnected,

    /// `#sethost`/`#setport` was issued while the client is connected.
    /// The argument names the setting for the report ("host" or "port").
    #[error("cannot change the {0} while connected to a server")]
    ConfigWhileConnected(&'static str),

    /// `#start` was issued while the server is already listening.
    #[error("the server is already listening for clients")]
    AlreadyListening,

    /// `#stop` was issued while the server is already stopped.
    #[error("the server is already stopped")]
    AlreadyStopped,

    /// `#stop`/`#close` was issued after the server closed.
    #[error("the server is already closed")]
    AlreadyClosed,

    /// A new peer arrived while the server is not listening.
    #[error("the server is not accepting new clients")]
    NotAccepting,

    /// `#setport` was issued while listening or with peers connected.
    /// One combined error covers both conditions.
    #[error(
        "the port can only be changed while the server is not listening \
         and no clients are connected"
    )]
    PortChangeRejected,
}

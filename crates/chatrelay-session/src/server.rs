//! The server session: listening state, the peer registry, and the relay.
//!
//! The listening side is a three-state machine:
//!
//! ```text
//!   Listening ──(#stop)──→ Stopped ──(#start: rebind)──→ Listening
//!       │                     │
//!       └───────(#close)──────┴──→ Closed ──(#start: rebind)──→ Listening
//! ```
//!
//! `#stop` keeps the socket open and the active peers connected but
//! rejects new admissions; `#close` drops everything. The configured
//! port may change only while not listening with zero peers, and takes
//! effect on the next `#start`.
//!
//! Binding sockets is the runner's job (it owns the acceptor); this type
//! owns every legality decision and is the single source of the
//! listen-state notifications, so they are printed exactly once.
//!
//! # Concurrency
//!
//! Peer tasks, the accept loop, and the operator console all call into
//! one `ServerSession` concurrently. All shared state sits behind a
//! single coarse mutex; broadcasts snapshot the peer set under the lock
//! and send outside it, so a slow peer cannot stall a join or leave.

use std::collections::HashMap;

use chatrelay_protocol::{is_login_attempt, parse_login, tag_peer, tag_server};
use chatrelay_transport::{Connection, ConnectionId};
use tokio::sync::Mutex;

use crate::{DisplaySink, SessionError};

/// Lifecycle state of the listening socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenState {
    /// Accepting new peers.
    Listening,
    /// Socket open, active peers kept, new peers rejected.
    Stopped,
    /// Socket gone, all peers dropped.
    Closed,
}

/// One connected peer: its connection and its identity.
///
/// `id` starts unset and is assigned exactly once, by the peer's first
/// inbound line, which must be a login command. A peer that never
/// identifies itself is disconnected on its first non-login line.
pub struct PeerRecord<C: Connection> {
    connection: C,
    id: Option<String>,
}

impl<C: Connection> PeerRecord<C> {
    /// Returns the peer's identity, if the login handshake completed.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

struct Inner<C: Connection> {
    port: u32,
    state: ListenState,
    peers: HashMap<ConnectionId, PeerRecord<C>>,
}

/// The server's configuration, peer registry, and relay.
pub struct ServerSession<C: Connection, D: DisplaySink> {
    display: D,
    inner: Mutex<Inner<C>>,
}

impl<C: Connection, D: DisplaySink> ServerSession<C, D> {
    /// Creates a session in the Closed state with the given configured
    /// port. The runner binds the socket and then calls
    /// [`listening_started`](Self::listening_started).
    pub fn new(port: u32, display: D) -> Self {
        Self {
            display,
            inner: Mutex::new(Inner {
                port,
                state: ListenState::Closed,
                peers: HashMap::new(),
            }),
        }
    }

    /// Returns the configured port.
    pub async fn port(&self) -> u32 {
        self.inner.lock().await.port
    }

    /// Returns the current listen state.
    pub async fn state(&self) -> ListenState {
        self.inner.lock().await.state
    }

    /// Returns the number of connected peers.
    pub async fn peer_count(&self) -> usize {
        self.inner.lock().await.peers.len()
    }

    // -- Listen-state transitions -----------------------------------------

    /// Records that the runner's bind succeeded and announces it. The
    /// announcement lives here, and only here.
    pub async fn listening_started(&self) {
        let port = {
            let mut inner = self.inner.lock().await;
            inner.state = ListenState::Listening;
            inner.port
        };
        tracing::info!(port, "listening for connections");
        self.display.display(&format!(
            "Server listening for connections on port {port}."
        ));
    }

    /// Checks that `#start` is legal right now and returns the port the
    /// runner should bind. State does not change until the bind succeeds
    /// and [`listening_started`](Self::listening_started) is called.
    pub async fn begin_start(&self) -> Result<u32, SessionError> {
        let inner = self.inner.lock().await;
        match inner.state {
            ListenState::Listening => Err(SessionError::AlreadyListening),
            ListenState::Stopped | ListenState::Closed => Ok(inner.port),
        }
    }

    /// `#stop`: stop admitting peers, keep everything else running.
    pub async fn stop_listening(&self) -> Result<(), SessionError> {
        {
            let mut inner = self.inner.lock().await;
            match inner.state {
                ListenState::Listening => inner.state = ListenState::Stopped,
                ListenState::Stopped => {
                    return Err(SessionError::AlreadyStopped);
                }
                ListenState::Closed => {
                    return Err(SessionError::AlreadyClosed);
                }
            }
        }
        tracing::info!("stopped listening");
        self.display
            .display("Server has stopped listening for connections.");
        Ok(())
    }

    /// `#close`: disconnect every peer and close down the listening
    /// socket. Per-peer close failures are logged, not propagated.
    pub async fn close(&self) -> Result<(), SessionError> {
        let dropped: Vec<C> = {
            let mut inner = self.inner.lock().await;
            if inner.state == ListenState::Closed {
                return Err(SessionError::AlreadyClosed);
            }
            inner.state = ListenState::Closed;
            inner
                .peers
                .drain()
                .map(|(_, record)| record.connection)
                .collect()
        };

        for conn in dropped {
            if let Err(e) = conn.close().await {
                tracing::warn!(peer = %conn.id(), error = %e, "peer close failed");
            }
        }

        tracing::info!("server closed");
        self.display.display("The server has closed.");
        Ok(())
    }

    /// `#setport`: legal only while not listening with zero peers.
    pub async fn set_port(&self, port: u32) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.state == ListenState::Listening || !inner.peers.is_empty() {
            return Err(SessionError::PortChangeRejected);
        }
        inner.port = port;
        Ok(())
    }

    // -- Peer lifecycle ----------------------------------------------------

    /// Admits a freshly accepted connection into the peer registry.
    ///
    /// Rejected (and the caller must close the connection) unless the
    /// session is Listening.
    pub async fn admit(&self, connection: C) -> Result<(), SessionError> {
        {
            let mut inner = self.inner.lock().await;
            if inner.state != ListenState::Listening {
                return Err(SessionError::NotAccepting);
            }
            let id = connection.id();
            inner.peers.insert(
                id,
                PeerRecord {
                    connection,
                    id: None,
                },
            );
            tracing::debug!(peer = %id, "peer admitted");
        }
        self.display.display("A new client has connected. Welcome!");
        Ok(())
    }

    /// Handles one inbound line from a peer.
    ///
    /// Returns `true` if the peer must be disconnected (its registry
    /// entry is already removed; the caller closes the connection and
    /// ends the read loop).
    pub async fn handle_peer_line(
        &self,
        peer: ConnectionId,
        line: &str,
    ) -> bool {
        enum Action<C> {
            LoggedOn(String),
            RejectFirstLine(C),
            RepeatLogin(C),
            Relay { from: String },
        }

        let action = {
            let mut inner = self.inner.lock().await;
            let Some(record) = inner.peers.get_mut(&peer) else {
                return true;
            };
            match record.id.clone() {
                // The mandatory handshake: identify the peer, once.
                None => match parse_login(line) {
                    Some(id) => {
                        record.id = Some(id.to_string());
                        Action::LoggedOn(id.to_string())
                    }
                    // First line was not a login: one error, goodbye.
                    None => {
                        let conn = record.connection.clone();
                        inner.peers.remove(&peer);
                        Action::RejectFirstLine(conn)
                    }
                },
                // Identified peers cannot log in again.
                Some(_) if is_login_attempt(line) => {
                    Action::RepeatLogin(record.connection.clone())
                }
                Some(from) => Action::Relay { from },
            }
        };

        match action {
            Action::LoggedOn(id) => {
                tracing::info!(%peer, id = %id, "peer logged on");
                self.display.display(&format!("{id} has logged on."));
                false
            }
            Action::RejectFirstLine(conn) => {
                tracing::warn!(%peer, "first line was not a login; dropping peer");
                if let Err(e) = conn
                    .send_line("ERROR - Missing login id. Disconnecting.")
                    .await
                {
                    tracing::debug!(%peer, error = %e, "error notice failed");
                }
                true
            }
            Action::RepeatLogin(conn) => {
                if let Err(e) = conn
                    .send_line(
                        "ERROR - Login can only be used when first connecting.",
                    )
                    .await
                {
                    tracing::debug!(%peer, error = %e, "error notice failed");
                }
                false
            }
            Action::Relay { from } => {
                self.display.display(&format!(
                    "Message received: {line} from {from}"
                ));
                self.broadcast(&tag_peer(&from, line), None).await;
                false
            }
        }
    }

    /// Handles a peer's connection going away (EOF or read error).
    ///
    /// Idempotent: a peer already removed — say by [`close`](Self::close)
    /// — produces no second notice.
    pub async fn handle_peer_disconnect(&self, peer: ConnectionId) {
        let removed = {
            let mut inner = self.inner.lock().await;
            inner.peers.remove(&peer)
        };
        if let Some(record) = removed {
            tracing::info!(
                %peer,
                id = record.id().unwrap_or("<unidentified>"),
                "peer disconnected"
            );
            self.display
                .display("A client has disconnected. Have a nice day!");
        }
    }

    // -- Relay -------------------------------------------------------------

    /// Broadcasts one line to every connected peer except `exclude`.
    ///
    /// Iterates a snapshot of the peer set taken under the lock: every
    /// peer present at broadcast start receives the line at most once;
    /// joins and leaves during delivery are not observed. Per-peer send
    /// failures are logged once and do not abort the remaining sends.
    /// Returns the number of successful deliveries.
    pub async fn broadcast(
        &self,
        payload: &str,
        exclude: Option<ConnectionId>,
    ) -> usize {
        let snapshot: Vec<C> = {
            let inner = self.inner.lock().await;
            inner
                .peers
                .values()
                .filter(|record| Some(record.connection.id()) != exclude)
                .map(|record| record.connection.clone())
                .collect()
        };

        let mut delivered = 0;
        for conn in &snapshot {
            match conn.send_line(payload).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        peer = %conn.id(),
                        error = %e,
                        "broadcast delivery failed"
                    );
                }
            }
        }
        delivered
    }

    /// Handles plain operator input: echo it locally and relay it to
    /// every peer under the server tag.
    pub async fn handle_operator_message(&self, text: &str) -> usize {
        self.display.display(text);
        self.broadcast(&tag_server(text), None).await
    }
}

// =========================================================================
// Tests
// =========================================================================

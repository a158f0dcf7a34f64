//! `ChatServer`: binds the listener and wires transport to session.
//!
//! The server is three loops around one [`ServerSession`]:
//!
//!   1. The **accept loop** admits new connections while the session is
//!      listening, and spawns a peer task per admitted connection.
//!   2. One **peer task** per connection feeds inbound lines into the
//!      session until the peer drops or is dropped.
//!   3. The **operator console loop** dispatches `#`-commands and
//!      broadcasts everything else.
//!
//! Rebinding lives here: `#start` tears the old accept loop down and
//! binds a fresh socket on whatever port the session has configured.
//! Everything else — legality, the peer registry, the relay — is the
//! session's business.

use std::net::SocketAddr;
use std::sync::Arc;

use chatrelay_protocol::Command;
use chatrelay_session::{
    CommandTarget, DisplaySink, Flow, ListenState, ServerSession,
    SessionError, dispatch,
};
use chatrelay_transport::{Connection, TcpConnection, TcpTransport, Transport};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::ChatRelayError;

/// A running accept loop and the means to stop it.
struct AcceptorTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
    local_addr: SocketAddr,
}

/// A chat relay server: session state plus the listening socket.
pub struct ChatServer<D: DisplaySink + Clone> {
    session: Arc<ServerSession<TcpConnection, D>>,
    display: D,
    acceptor: Option<AcceptorTask>,
}

impl<D: DisplaySink + Clone> ChatServer<D> {
    /// Binds the listening socket and starts accepting peers.
    ///
    /// A bind failure here aborts startup — the caller reports it and
    /// exits non-zero. Passing port `0` binds an ephemeral port, and the
    /// session's configured port is updated to the one actually bound.
    pub async fn start(
        port: u32,
        display: D,
    ) -> Result<Self, ChatRelayError> {
        let session = Arc::new(ServerSession::new(port, display.clone()));

        let transport = TcpTransport::bind(&format!("0.0.0.0:{port}")).await?;
        let local_addr = transport
            .local_addr()
            .map_err(chatrelay_transport::TransportError::BindFailed)?;

        let actual = u32::from(local_addr.port());
        if actual != port {
            // Ephemeral bind: record the real port before announcing it.
            session
                .set_port(actual)
                .await
                .map_err(ChatRelayError::Session)?;
        }

        session.listening_started().await;
        let acceptor =
            spawn_acceptor(transport, local_addr, Arc::clone(&session));

        Ok(Self {
            session,
            display,
            acceptor: Some(acceptor),
        })
    }

    /// Returns the address of the live listening socket, if any.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.acceptor.as_ref().map(|task| task.local_addr)
    }

    /// Returns the configured port.
    pub async fn port(&self) -> u32 {
        self.session.port().await
    }

    /// Returns the current listen state.
    pub async fn state(&self) -> ListenState {
        self.session.state().await
    }

    /// Returns the number of connected peers.
    pub async fn peer_count(&self) -> usize {
        self.session.peer_count().await
    }

    /// Runs the operator console until `#quit` or end of input.
    pub async fn run_console(mut self) -> Result<(), ChatRelayError> {
        let mut stdin = BufReader::new(tokio::io::stdin());
        let mut input = String::new();

        loop {
            input.clear();
            let read = stdin
                .read_line(&mut input)
                .await
                .map_err(ChatRelayError::Console)?;
            if read == 0 {
                // Console gone: shut down as if the operator quit.
                self.shutdown().await;
                break;
            }
            let line = input.trim_end_matches(['\r', '\n']).to_string();
            if dispatch(&line, &mut self).await == Flow::Terminate {
                break;
            }
        }
        Ok(())
    }

    /// `#quit`: close everything and announce termination. Close
    /// failures are reported but never block shutdown.
    pub async fn shutdown(&mut self) {
        match self.session.close().await {
            Ok(()) | Err(SessionError::AlreadyClosed) => {}
            Err(e) => self.report_error(&e),
        }
        self.teardown_acceptor().await;
        self.display.display("Terminating the server.");
    }

    /// `#start`: rebind on the configured port and resume listening.
    async fn start_listening(&mut self) {
        let port = match self.session.begin_start().await {
            Ok(port) => port,
            Err(e) => {
                self.report_error(&e);
                return;
            }
        };

        // Release the previous socket (if stop left it open) before
        // binding again, possibly on a different port.
        self.teardown_acceptor().await;

        match TcpTransport::bind(&format!("0.0.0.0:{port}")).await {
            Ok(transport) => {
                let local_addr = match transport.local_addr() {
                    Ok(addr) => addr,
                    Err(e) => {
                        tracing::error!(error = %e, "restart failed");
                        self.display.display(
                            "ERROR - The server was unable to start.",
                        );
                        return;
                    }
                };
                self.session.listening_started().await;
                self.acceptor = Some(spawn_acceptor(
                    transport,
                    local_addr,
                    Arc::clone(&self.session),
                ));
            }
            Err(e) => {
                // State is unchanged; the operator can retry.
                tracing::error!(error = %e, port, "restart failed");
                self.display
                    .display("ERROR - The server was unable to start.");
            }
        }
    }

    /// `#close`: drop peers via the session, then release the socket.
    async fn close_server(&mut self) {
        match self.session.close().await {
            Ok(()) => self.teardown_acceptor().await,
            Err(e) => self.report_error(&e),
        }
    }

    async fn teardown_acceptor(&mut self) {
        if let Some(task) = self.acceptor.take() {
            let _ = task.shutdown.send(true);
            if let Err(e) = task.handle.await {
                tracing::debug!(error = %e, "acceptor task ended abnormally");
            }
        }
    }

    fn report_error(&self, error: &SessionError) {
        self.display.display(&format!("ERROR - {error}"));
    }
}

impl<D: DisplaySink + Clone> CommandTarget for ChatServer<D> {
    fn report(&self, text: &str) {
        self.display.display(text);
    }

    async fn apply(&mut self, command: Command) -> Flow {
        match command {
            Command::Quit => {
                self.shutdown().await;
                return Flow::Terminate;
            }
            Command::Stop => {
                if let Err(e) = self.session.stop_listening().await {
                    self.report_error(&e);
                }
            }
            Command::Start => self.start_listening().await,
            Command::Close => self.close_server().await,
            Command::SetPort(port) => {
                match self.session.set_port(port).await {
                    Ok(()) => self.display.display(&format!(
                        "The port has now been set to {port}."
                    )),
                    Err(e) => self.report_error(&e),
                }
            }
            Command::GetPort => {
                let port = self.session.port().await;
                self.display.display(&format!("The port is {port}."));
            }
            // Client-side commands mean nothing on the server console.
            Command::Login
            | Command::Logoff
            | Command::SetHost(_)
            | Command::GetHost => {
                self.report("The command was not recognized.");
            }
        }
        Flow::Continue
    }

    async fn forward(&mut self, message: &str) -> Flow {
        self.session.handle_operator_message(message).await;
        Flow::Continue
    }
}

/// Spawns the accept loop. It runs until told to shut down; the
/// listening socket closes when the task drops the transport.
fn spawn_acceptor<D: DisplaySink + Clone>(
    mut transport: TcpTransport,
    local_addr: SocketAddr,
    session: Arc<ServerSession<TcpConnection, D>>,
) -> AcceptorTask {
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                accepted = transport.accept() => match accepted {
                    Ok(conn) => {
                        match session.admit(conn.clone()).await {
                            Ok(()) => {
                                spawn_peer_task(conn, Arc::clone(&session));
                            }
                            Err(e) => {
                                // Stopped: reject without dropping the
                                // peers that are already in.
                                tracing::debug!(
                                    peer = %conn.id(),
                                    error = %e,
                                    "rejecting connection"
                                );
                                let _ = conn.close().await;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                }
            }
        }
    });

    AcceptorTask {
        shutdown,
        handle,
        local_addr,
    }
}

/// Spawns the read loop for one admitted peer.
fn spawn_peer_task<D: DisplaySink + Clone>(
    conn: TcpConnection,
    session: Arc<ServerSession<TcpConnection, D>>,
) {
    tokio::spawn(async move {
        loop {
            match conn.recv_line().await {
                Ok(Some(line)) => {
                    if session.handle_peer_line(conn.id(), &line).await {
                        // Session already removed the record; just make
                        // sure the socket is gone.
                        let _ = conn.close().await;
                        break;
                    }
                }
                Ok(None) => {
                    session.handle_peer_disconnect(conn.id()).await;
                    break;
                }
                Err(e) => {
                    tracing::debug!(
                        peer = %conn.id(),
                        error = %e,
                        "peer read failed"
                    );
                    session.handle_peer_disconnect(conn.id()).await;
                    let _ = conn.close().await;
                    break;
                }
            }
        }
    });
}

//! The client session: one user's view of their connection to the server.
//!
//! A client session is a two-state machine:
//!
//! ```text
//!   Disconnected ──(#login: dial + handshake)──→ Connected
//!        ↑                                           │
//!        └──────(#logoff / connection lost)──────────┘
//! ```
//!
//! Host and port are mutable only while Disconnected. Chat input is
//! forwarded to the connection; a failed send is fatal to the process
//! (the session reports it and answers [`Flow::Terminate`]), as is an
//! abnormal disconnection noticed by the inbound reader.

use chatrelay_protocol::{Command, login_line};
use chatrelay_transport::{Connection, Connector};

use crate::{CommandTarget, DisplaySink, Flow, SessionError};

/// A chat client's identity, configuration, and connection.
///
/// Generic over the [`Connector`] so the state machine can be driven by
/// mock transports in tests; the binaries plug in the TCP dialer.
pub struct ClientSession<N: Connector, D: DisplaySink> {
    id: String,
    host: String,
    port: u32,
    connector: N,
    display: D,
    connection: Option<N::Conn>,
}

impl<N: Connector, D: DisplaySink> ClientSession<N, D> {
    /// Creates a session in the Disconnected state.
    ///
    /// `id` is the immutable login identity; it is sent in the handshake
    /// and used by the server to tag this client's messages. Call
    /// [`login`](Self::login) for the initial best-effort connection
    /// attempt.
    pub fn new(
        id: impl Into<String>,
        host: impl Into<String>,
        port: u32,
        connector: N,
        display: D,
    ) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            port,
            connector,
            display,
            connection: None,
        }
    }

    /// Returns the login identity.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the configured host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the configured port.
    pub fn port(&self) -> u32 {
        self.port
    }

    /// Returns `true` while a connection is open.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Returns a handle to the open connection, if any, for the inbound
    /// reader loop.
    pub fn connection(&self) -> Option<N::Conn> {
        self.connection.clone()
    }

    /// Opens the connection and performs the login handshake.
    ///
    /// On success the session is Connected, the handshake line
    /// `"#login <id>"` has been sent, and a logon notice is displayed.
    /// On failure the session stays Disconnected and the error is
    /// returned for the caller to report.
    pub async fn login(&mut self) -> Result<(), SessionError> {
        if self.connection.is_some() {
            return Err(SessionError::AlreadyConnected);
        }

        let conn = self
            .connector
            .connect(&self.host, self.port)
            .await
            .map_err(|e| SessionError::Setup(e.to_string()))?;

        if let Err(e) = conn.send_line(&login_line(&self.id)).await {
            let _ = conn.close().await;
            return Err(SessionError::Setup(e.to_string()));
        }

        tracing::info!(
            id = %self.id,
            host = %self.host,
            port = self.port,
            "logged on"
        );
        self.display.display(&format!("{} has logged on.", self.id));
        self.connection = Some(conn);
        Ok(())
    }

    /// Closes the connection and returns to Disconnected.
    pub async fn logoff(&mut self) -> Result<(), SessionError> {
        let conn = self.connection.take().ok_or(SessionError::NotConnected)?;
        if let Err(e) = conn.close().await {
            tracing::debug!(error = %e, "close during logoff failed");
        }
        tracing::info!(id = %self.id, "logged off");
        self.display.display("Connection closed.");
        Ok(())
    }

    /// Best-effort close on the way out; close failures are swallowed.
    pub async fn quit(&mut self) {
        if let Some(conn) = self.connection.take() {
            let _ = conn.close().await;
        }
    }

    /// Changes the configured host. Only legal while Disconnected.
    pub fn set_host(
        &mut self,
        host: impl Into<String>,
    ) -> Result<(), SessionError> {
        if self.connection.is_some() {
            return Err(SessionError::ConfigWhileConnected("host"));
        }
        self.host = host.into();
        Ok(())
    }

    /// Changes the configured port. Only legal while Disconnected.
    pub fn set_port(&mut self, port: u32) -> Result<(), SessionError> {
        if self.connection.is_some() {
            return Err(SessionError::ConfigWhileConnected("port"));
        }
        self.port = port;
        Ok(())
    }

    /// Forwards an inbound server line verbatim to the display sink.
    pub fn handle_inbound(&self, message: &str) {
        self.display.display(message);
    }

    /// Handles the inbound reader noticing the connection is gone
    /// without a local `#logoff`. Fail-fast: report and terminate.
    pub async fn handle_connection_lost(&mut self) -> Flow {
        self.display.display("Abnormal termination of connection.");
        self.quit().await;
        Flow::Terminate
    }

    fn report_error(&self, error: &SessionError) {
        self.display.display(&format!("ERROR - {error}"));
    }
}

impl<N: Connector, D: DisplaySink> CommandTarget for ClientSession<N, D> {
    fn report(&self, text: &str) {
        self.display.display(text);
    }

    async fn apply(&mut self, command: Command) -> Flow {
        match command {
            Command::Quit => {
                self.quit().await;
                return Flow::Terminate;
            }
            Command::Login => {
                if let Err(e) = self.login().await {
                    self.report_error(&e);
                }
            }
            Command::Logoff => {
                if let Err(e) = self.logoff().await {
                    self.report_error(&e);
                }
            }
            Command::SetHost(host) => match self.set_host(host.clone()) {
                Ok(()) => {
                    self.display.display(&format!("Host set to: {host}."))
                }
                Err(e) => self.report_error(&e),
            },
            Command::SetPort(port) => match self.set_port(port) {
                Ok(()) => {
                    self.display.display(&format!("Port set to: {port}."))
                }
                Err(e) => self.report_error(&e),
            },
            Command::GetHost => {
                self.display
                    .display(&format!("The host is {}.", self.host));
            }
            Command::GetPort => {
                self.display
                    .display(&format!("The port is {}.", self.port));
            }
            // Server-side commands mean nothing on a client console.
            Command::Stop | Command::Close | Command::Start => {
                self.report("The command was not recognized.");
            }
        }
        Flow::Continue
    }

    async fn forward(&mut self, message: &str) -> Flow {
        let sent = match &self.connection {
            Some(conn) => match conn.send_line(message).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "send to server failed");
                    false
                }
            },
            None => false,
        };

        if sent {
            Flow::Continue
        } else {
            self.display.display(
                "Could not send message to server. Terminating client.",
            );
            self.quit().await;
            Flow::Terminate
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

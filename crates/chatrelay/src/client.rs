//! `ChatClient`: the console loop around a [`ClientSession`].
//!
//! One `select!` multiplexes two sources: lines typed on the console
//! (dispatched as commands or sent as chat) and lines arriving from the
//! server (displayed verbatim). When the session is disconnected the
//! inbound branch parks on a pending future until the next `#login`
//! installs a fresh connection.

use chatrelay_session::{
    ClientSession, DisplaySink, Flow, dispatch,
};
use chatrelay_transport::{Connection, TcpConnection, TcpDialer, TransportError};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::ChatRelayError;

/// A chat client: session state plus the console loop.
pub struct ChatClient<D: DisplaySink + Clone> {
    session: ClientSession<TcpDialer, D>,
    display: D,
}

impl<D: DisplaySink + Clone> ChatClient<D> {
    /// Creates a client in the Disconnected state.
    pub fn new(
        id: impl Into<String>,
        host: impl Into<String>,
        port: u32,
        display: D,
    ) -> Self {
        Self {
            session: ClientSession::new(
                id,
                host,
                port,
                TcpDialer,
                display.clone(),
            ),
            display,
        }
    }

    /// The constructor-time best-effort connection attempt: failure is
    /// reported and the client waits for commands instead of exiting.
    pub async fn connect_initial(&mut self) {
        if let Err(e) = self.session.login().await {
            tracing::debug!(error = %e, "initial connection failed");
            self.display
                .display("Cannot open connection. Awaiting command.");
        }
    }

    /// Runs the console until `#quit`, a fatal send failure, an abnormal
    /// disconnection, or end of console input.
    pub async fn run_console(mut self) -> Result<(), ChatRelayError> {
        let mut stdin = BufReader::new(tokio::io::stdin());
        let mut input = String::new();

        loop {
            input.clear();
            let conn = self.session.connection();

            tokio::select! {
                read = stdin.read_line(&mut input) => {
                    let n = read.map_err(ChatRelayError::Console)?;
                    if n == 0 {
                        self.session.quit().await;
                        break;
                    }
                    let line =
                        input.trim_end_matches(['\r', '\n']).to_string();
                    if dispatch(&line, &mut self.session).await
                        == Flow::Terminate
                    {
                        break;
                    }
                }
                inbound = next_line(&conn) => match inbound {
                    Ok(Some(message)) => {
                        self.session.handle_inbound(&message);
                    }
                    Ok(None) | Err(_) => {
                        // Only abnormal if we still think we're
                        // connected; a local #logoff is not an error.
                        if self.session.is_connected()
                            && self.session.handle_connection_lost().await
                                == Flow::Terminate
                        {
                            break;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Waits for the next inbound line, or forever if disconnected.
async fn next_line(
    conn: &Option<TcpConnection>,
) -> Result<Option<String>, TransportError> {
    match conn {
        Some(conn) => conn.recv_line().await,
        None => std::future::pending().await,
    }
}

//! # Chatrelay
//!
//! Minimal multi-client chat relay over line-oriented TCP.
//!
//! A server accepts named clients, relays every chat line to all
//! connected clients, and both ends carry an administrative `#`-command
//! channel for controlling connection state (start/stop listening, set
//! host/port, login/logoff). This meta crate ties the layers together:
//! transport → protocol → session → console loops, and ships the
//! `chat-server` and `chat-client` binaries.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use chatrelay::{ChatServer, ConsoleSink};
//!
//! # async fn run() -> Result<(), chatrelay::ChatRelayError> {
//! let server = ChatServer::start(5555, ConsoleSink).await?;
//! server.run_console().await
//! # }
//! ```

pub mod cli;
mod client;
mod error;
mod server;

pub use client::ChatClient;
pub use error::ChatRelayError;
pub use server::ChatServer;

// The pieces embedders and tests need to drive a relay directly.
pub use chatrelay_protocol::DEFAULT_PORT;
pub use chatrelay_session::{
    CommandTarget, ConsoleSink, DisplaySink, Flow, ListenState, MemorySink,
    dispatch,
};

/// Initializes the process-wide `tracing` subscriber.
///
/// Filter defaults to `info`; override with `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

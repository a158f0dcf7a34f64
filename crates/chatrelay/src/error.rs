//! Unified error type for the Chatrelay meta crate.

use chatrelay_session::SessionError;
use chatrelay_transport::TransportError;

/// Top-level error that wraps the layer-specific errors.
///
/// Almost every failure in the relay is handled where it occurs and
/// surfaced on the display sink; the variants here are the few that are
/// allowed to end the process — the initial bind, and console I/O.
#[derive(Debug, thiserror::Error)]
pub enum ChatRelayError {
    /// A transport-level error (bind, connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A session-level error (illegal transition, setup failure).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Reading the local console failed.
    #[error("console read failed: {0}")]
    Console(#[source] std::io::Error),
}

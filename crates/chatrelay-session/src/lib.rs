//! Session state machines and command dispatch for Chatrelay.
//!
//! This crate owns the rules of the chat relay:
//!
//! 1. **Dispatch** ([`dispatch`], [`CommandTarget`], [`Flow`]) — one
//!    interpreter routes console lines to whichever role owns the
//!    console.
//! 2. **Client** ([`ClientSession`]) — identity, host/port config, and
//!    the Disconnected/Connected state machine.
//! 3. **Server** ([`ServerSession`]) — the Listening/Stopped/Closed
//!    state machine, the peer registry, and the relay.
//! 4. **Display** ([`DisplaySink`]) — where user-facing output goes.
//!
//! # How it fits in the stack
//!
//! ```text
//! Runner layer (above)   ← owns sockets, tasks, and console loops
//!     ↕
//! Session layer (this crate)  ← decides what every line may legally do
//!     ↕
//! Transport layer (below)  ← provides Connection/Connector/lines
//! ```
//!
//! The sessions are generic over the transport traits, so every legality
//! rule here is unit-tested against mock connections — no sockets, no
//! sleeps.

#![allow(async_fn_in_trait)]

mod client;
mod display;
mod error;
mod interpreter;
mod server;
#[cfg(test)]
mod testing;

pub use client::ClientSession;
pub use display::{ConsoleSink, DisplaySink, MemorySink};
pub use error::SessionError;
pub use interpreter::{CommandTarget, Flow, dispatch};
pub use server::{ListenState, PeerRecord, ServerSession};

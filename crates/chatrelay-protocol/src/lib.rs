//! Wire protocol for Chatrelay.
//!
//! This crate defines the "language" spoken on a chat connection and on
//! the operator console:
//!
//! - **Commands** ([`Command`], [`Input`], [`parse`]) — the `#`-sentinel
//!   command grammar shared by the client and server consoles.
//! - **Wire lines** ([`login_line`], [`parse_login`], [`tag_peer`],
//!   [`tag_server`]) — the login handshake shape and broadcast prefixes.
//! - **Errors** ([`CommandError`]) — what can go wrong while parsing.
//!
//! # Architecture
//!
//! The protocol layer is pure text-in, values-out. It doesn't know about
//! sockets or session state — classifying a line and deciding whether the
//! resulting command is *legal right now* are different jobs, and the
//! latter belongs to the session layer.
//!
//! ```text
//! Transport (lines) → Protocol (Input/Command) → Session (state machine)
//! ```

mod command;
mod error;
mod wire;

pub use command::{Command, Input, parse};
pub use error::CommandError;
pub use wire::{
    COMMAND_SENTINEL, DEFAULT_PORT, LOGIN_VERB, PORT_MAX, PORT_MIN,
    SERVER_TAG, is_login_attempt, login_line, parse_login, tag_peer,
    tag_server, validate_port,
};

//! The command grammar shared by the client and server consoles.
//!
//! A console line is either a chat **message** (relayed/sent verbatim) or
//! a **command** (first character is `#`). Both consoles speak the same
//! grammar; which commands are *legal* for a given role is decided by the
//! session executing them, not by the parser.

use crate::wire::{COMMAND_SENTINEL, validate_port};
use crate::CommandError;

/// A parsed console directive.
///
/// One enum covers both roles. The client executes `Login`, `Logoff`,
/// `SetHost`, `GetHost`; the server executes `Stop`, `Close`, `Start`;
/// both execute `Quit`, `SetPort`, `GetPort`. A command issued to the
/// wrong role is reported as unrecognized by that role's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Shut the session down and terminate the process.
    Quit,
    /// Client: close the connection and stay running.
    Logoff,
    /// Client: open a connection and perform the login handshake.
    Login,
    /// Client: print the configured host.
    GetHost,
    /// Print the configured port.
    GetPort,
    /// Server: stop admitting new peers; active peers are kept.
    Stop,
    /// Server: drop every peer and close the listening socket.
    Close,
    /// Server: resume listening on the configured port.
    Start,
    /// Client: change the configured host (only while disconnected).
    SetHost(String),
    /// Change the configured port (only while down with no peers).
    SetPort(u32),
}

/// The classification of one console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Plain chat content, returned verbatim for send/relay.
    Message(String),
    /// A recognized command.
    Command(Command),
}

/// Classifies and parses one console line.
///
/// Classification looks at the trimmed line: a leading `#` makes it a
/// command, anything else is a message (returned verbatim, untrimmed).
/// An empty line has no first character to test; it is looked up as a
/// zero-length command token and falls through to
/// [`CommandError::Unrecognized`] rather than panicking.
///
/// Zero-argument verbs match case-insensitively and exactly. The
/// two-token commands match on "contains the verb", then require exactly
/// two space-separated tokens ([`CommandError::Format`] otherwise).
pub fn parse(line: &str) -> Result<Input, CommandError> {
    let trimmed = line.trim();

    if !trimmed.starts_with(COMMAND_SENTINEL) {
        if trimmed.is_empty() {
            return Err(CommandError::Unrecognized(String::new()));
        }
        return Ok(Input::Message(line.to_string()));
    }

    let lower = trimmed.to_ascii_lowercase();
    let command = match lower.as_str() {
        "#quit" => Command::Quit,
        "#logoff" => Command::Logoff,
        "#login" => Command::Login,
        "#gethost" => Command::GetHost,
        "#getport" => Command::GetPort,
        "#stop" => Command::Stop,
        "#close" => Command::Close,
        "#start" => Command::Start,
        _ if lower.contains("sethost") => {
            Command::SetHost(split_argument(trimmed)?.to_string())
        }
        _ if lower.contains("setport") => {
            Command::SetPort(validate_port(split_argument(trimmed)?)?)
        }
        _ => return Err(CommandError::Unrecognized(trimmed.to_string())),
    };

    Ok(Input::Command(command))
}

/// Splits a two-token command and returns the argument token.
///
/// The split is on single spaces: `"#sethost  x"` produces three tokens
/// (one empty) and is rejected, matching the strict console grammar.
fn split_argument(line: &str) -> Result<&str, CommandError> {
    let tokens: Vec<&str> = line.split(' ').collect();
    match tokens.as_slice() {
        [_verb, argument] => Ok(argument),
        _ => Err(CommandError::Format),
    }
}

// =========================================================================
// Tests
// =========================================================================

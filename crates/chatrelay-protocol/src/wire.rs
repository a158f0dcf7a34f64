//! Wire-line shapes: the login handshake and broadcast tagging.
//!
//! Every line on the wire is plain UTF-8 text. The only structured line
//! is the login handshake (`"#login <id>"`), which must be the first
//! thing a newly connected peer sends. Everything else is chat content,
//! which the server prefixes with the sender's identity before relaying.

use crate::CommandError;

/// The character that marks a console line as a command.
pub const COMMAND_SENTINEL: char = '#';

/// The verb of the mandatory first line from a connecting peer.
pub const LOGIN_VERB: &str = "#login";

/// Prefix applied to operator-originated broadcast lines.
pub const SERVER_TAG: &str = "SERVER MESSAGE> ";

/// Port used when neither the CLI nor a `#setport` supplies one.
pub const DEFAULT_PORT: u32 = 5555;

/// Lowest port accepted by `#setport` and the CLI.
pub const PORT_MIN: u32 = 1;

/// Highest port accepted by `#setport` and the CLI (five digits).
pub const PORT_MAX: u32 = 99_999;

/// Formats the login handshake line for the given identity.
pub fn login_line(id: &str) -> String {
    format!("{LOGIN_VERB} {id}")
}

/// Parses a login handshake line, returning the identity token.
///
/// The line must be exactly two space-separated tokens, the first being
/// the login verb (case-insensitive) and the second non-empty. Anything
/// else — a missing token, extra tokens, a bare `#login` — is not a
/// valid handshake and returns `None`.
pub fn parse_login(line: &str) -> Option<&str> {
    let tokens: Vec<&str> = line.trim().split(' ').collect();
    match tokens.as_slice() {
        [verb, id] if verb.eq_ignore_ascii_case(LOGIN_VERB) && !id.is_empty() => {
            Some(id)
        }
        _ => None,
    }
}

/// Returns `true` if the line's first token is the login verb.
///
/// Used to detect a *repeated* login attempt from an already-identified
/// peer, which is rejected even when the rest of the line is malformed.
pub fn is_login_attempt(line: &str) -> bool {
    line.trim_start()
        .split(' ')
        .next()
        .is_some_and(|token| token.eq_ignore_ascii_case(LOGIN_VERB))
}

/// Tags a relayed chat line with the sending peer's identity.
pub fn tag_peer(id: &str, message: &str) -> String {
    format!("{id}> {message}")
}

/// Tags an operator-originated broadcast line.
pub fn tag_server(message: &str) -> String {
    format!("{SERVER_TAG}{message}")
}

/// Validates a raw `#setport` argument into a port number.
///
/// The argument must parse as an integer ([`CommandError::PortFormat`])
/// and fall inside `PORT_MIN..=PORT_MAX` inclusive
/// ([`CommandError::PortRange`]).
pub fn validate_port(raw: &str) -> Result<u32, CommandError> {
    let port: i64 = raw
        .parse()
        .map_err(|_| CommandError::PortFormat(raw.to_string()))?;
    if port < i64::from(PORT_MIN) || port > i64::from(PORT_MAX) {
        return Err(CommandError::PortRange(port));
    }
    Ok(port as u32)
}

// =========================================================================
// Tests
// =========================================================================

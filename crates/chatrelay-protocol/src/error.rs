//! Error types for the protocol layer.

/// Errors produced while classifying and parsing a console line.
///
/// Every variant is non-fatal: the dispatcher reports the error through
/// the session's display sink and leaves all state unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// A two-token command (`#sethost`, `#setport`) split into the wrong
    /// number of tokens.
    #[error("command format is incorrect")]
    Format,

    /// The `#setport` argument did not parse as an integer.
    #[error("port value \"{0}\" is not an integer")]
    PortFormat(String),

    /// The `#setport` argument parsed but is outside `1..=99999`.
    #[error("port {0} is out of bounds (expected 1-99999)")]
    PortRange(i64),

    /// The line started with the command sentinel but matched nothing in
    /// the command table. An empty line lands here too — it is looked up
    /// as a zero-length command token rather than treated specially.
    #[error("command not recognized: \"{0}\"")]
    Unrecognized(String),
}

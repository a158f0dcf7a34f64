//! Command-line argument types for the two binaries.

use chatrelay_protocol::DEFAULT_PORT;
use clap::Parser;

/// Arguments for the `chat-client` binary.
///
/// `-h` selects the host here (matching the flags the relay has always
/// taken), so clap's short help flag is disabled and help is long-only.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "chat-client",
    about = "Connect to a chat relay server",
    disable_help_flag = true
)]
pub struct ClientArgs {
    /// Login id announced to the server on connect.
    pub id: String,

    /// Server host to connect to.
    #[arg(short = 'h', long, default_value = "localhost")]
    pub host: String,

    /// Server port to connect on.
    #[arg(
        short = 'p',
        long,
        default_value_t = DEFAULT_PORT,
        value_parser = clap::value_parser!(u32).range(1..=99_999)
    )]
    pub port: u32,

    /// Print help.
    #[arg(long, action = clap::ArgAction::Help)]
    help: Option<bool>,
}

/// Arguments for the `chat-server` binary.
#[derive(Parser, Debug, Clone)]
#[command(name = "chat-server", about = "Run a chat relay server")]
pub struct ServerArgs {
    /// Port to listen on.
    #[arg(
        default_value_t = DEFAULT_PORT,
        value_parser = clap::value_parser!(u32).range(1..=99_999)
    )]
    pub port: u32,
}

// =========================================================================
// Tests
// =========================================================================

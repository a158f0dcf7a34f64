//! The chat client binary.

use anyhow::Result;
use chatrelay::cli::ClientArgs;
use chatrelay::{ChatClient, ConsoleSink, init_tracing};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = ClientArgs::parse();
    let mut client =
        ChatClient::new(args.id, args.host, args.port, ConsoleSink);
    client.connect_initial().await;
    client.run_console().await?;
    Ok(())
}

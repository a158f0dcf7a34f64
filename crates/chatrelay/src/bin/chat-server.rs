//! The chat relay server binary.

use anyhow::Result;
use chatrelay::cli::ServerArgs;
use chatrelay::{ChatServer, ConsoleSink, init_tracing};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = ServerArgs::parse();
    let server = match ChatServer::start(args.port, ConsoleSink).await {
        Ok(server) => server,
        Err(e) => {
            println!("ERROR - Could not listen for clients!");
            return Err(e.into());
        }
    };

    server.run_console().await?;
    Ok(())
}

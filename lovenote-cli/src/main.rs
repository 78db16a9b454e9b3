//! Binary crate for the `lovenote` command.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Loading `.env` and setting up logging
//! - Mapping the run outcome to output and exit status

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    cli::init_tracing();

    let cmd = cli::Cli::parse();
    cmd.run().await
}

//! docqa
//!
//! Ingest a folder of text documents into a persistent vector index and
//! answer questions grounded in them.
//!
//! # Commands
//!
//! - `ingest`: chunk, embed, and index `.txt` files
//! - `ask`: retrieve context and generate an answer
//! - `stats`: count indexed chunks
//!
//! OpenAI credentials come from the environment (or a `.env` file); pass
//! `--offline` to run without them.

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod telemetry;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    telemetry::init(cli.verbose);

    match &cli.command {
        Command::Ingest(args) => commands::ingest(&cli, args).await,
        Command::Ask(args) => commands::ask(&cli, args).await,
        Command::Stats => commands::stats(&cli).await,
    }
}

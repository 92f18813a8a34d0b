#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # ember-node
//!
//! The command-line entry point for running an ember peer and interacting
//! with a locally running one.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::*;

#[derive(Parser, Debug)]
#[clap(
    name = "ember-node",
    version,
    about = "An ember peer: identity admission, post dissemination, and end-to-end direct messages.",
    long_about = "Runs an ember peer over a loopback or LAN overlay, or drives a one-shot operation (claiming a handle, composing a post, sending a direct message) against an already-running one."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the node's main event loop until interrupted.
    Run(run::RunArgs),

    /// Identity admission: claim a handle.
    Identity(identity::IdentityArgs),

    /// Post composition and carriage.
    Post(post::PostArgs),

    /// Send an end-to-end encrypted direct message.
    Dm(dm::DmArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    ember_telemetry::init_tracing(std::env::var("EMBER_LOG_JSON").is_ok())?;

    match cli.command {
        Commands::Run(args) => run::run(args).await,
        Commands::Identity(args) => identity::run(args).await,
        Commands::Post(args) => post::run(args).await,
        Commands::Dm(args) => dm::run(args).await,
    }
}

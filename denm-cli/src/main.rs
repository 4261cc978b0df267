//! ## denm-cli
//! **Command-line front end for the DENM alert services**
//!
//! - `simulate`: run a built-in or YAML scenario in the deterministic harness
//! - `decode`: print a hex-encoded DENM frame
//!
//! ### Future:
//! - Live mode against an external geo-networking stack

use clap::Parser;

mod commands;
mod error;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    commands::run_command(cli).await
}

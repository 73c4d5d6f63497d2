//! Main entry point for the chatterbox simulation
//!
//! Starts a population of simulated callers and streams their call log
//! until `q`, Ctrl-C, or the optional run timer stops it.

use std::time::Instant;

use clap::Parser;

mod cli;
mod trigger;

use cli::Cli;

#[tokio::main]
async fn main() {
    let process_start = Instant::now();
    let cli = Cli::parse();

    if let Err(e) = cli.execute(process_start).await {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

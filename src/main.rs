mod auth;
mod cli;
mod client;
mod config;
mod draft;
mod model;
mod server;
mod storage;
mod store;
mod validate;

use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use config::Config;

fn main() {
    let cli = cli::Cli::parse();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run(cli, &config) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

//! kindle - local Kubernetes clusters on ignite micro-VMs or docker

use clap::Parser;
use kindle_cli::cli::Cli;
use kindle_cli::output::json;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "KINDLE_LOG";

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json_mode = cli.json;
    if let Err(e) = cli.run().await {
        let message = format!("{e:#}");
        match json::format_error(&message, "command_failed") {
            Ok(doc) if json_mode => println!("{doc}"),
            _ => eprintln!("Error: {message}"),
        }
        std::process::exit(1);
    }
}

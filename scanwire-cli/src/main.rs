mod cli;
mod client;
mod commands;
mod error;
mod output;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::client::ApiClient;
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let client = ApiClient::new(&cli.server);
    let writer = OutputWriter::new(cli.output);

    match cli.command {
        Commands::Scan {
            target,
            mode,
            seed,
            fail,
            watch,
        } => commands::scan::run(&client, &writer, &target, &mode, seed, fail, watch).await,
        Commands::Sessions => commands::sessions::list(&client, &writer).await,
        Commands::Status { session_id } => {
            commands::status::run(&client, &writer, &session_id).await
        }
        Commands::Watch { session_id } => commands::watch::run(&client, &session_id).await,
        Commands::Evict { session_id } => commands::sessions::evict(&client, &session_id).await,
    }
}

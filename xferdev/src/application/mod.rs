pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use clap::Parser;
use xfer_core::error::Result;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let g = &cli.global;
    match cli.command {
        Commands::Tally => handlers::handle_tally(g),
        Commands::Gather => handlers::handle_gather(g),
        Commands::Package { chunk_id } => handlers::handle_package(g, &chunk_id),
        Commands::Upload { chunk_id } => handlers::handle_upload(g, &chunk_id),
        Commands::Run => handlers::handle_run(g),
        Commands::List { archive } => handlers::handle_list(&archive),
        Commands::VerifyLocal { path, length } => handlers::handle_verify_local(&path, length),
        Commands::Manifest { table, id, version } => {
            handlers::handle_manifest(&table, &id, version)
        }
    }
}

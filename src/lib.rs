mod cli;
mod commands;
pub mod config;
pub mod error;
pub mod miner;
pub mod pools;
pub mod rank;
mod state;

use clap::Parser;
use cli::{Cli, CliCommand};
use commands::mining::PoolChoice;
use error::AppError;
use state::AppState;
use std::process::ExitCode;

pub fn run() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(dispatch(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> Result<(), AppError> {
    if let CliCommand::Rank { balance } = cli.command {
        commands::rank::show_rank(balance);
        return Ok(());
    }

    let config = match cli.config.or_else(config::default_config_path) {
        Some(path) => config::load_or_default(&path)?,
        None => config::Config::default(),
    };
    let state = AppState::new(config)?;

    match cli.command {
        CliCommand::Pools { json, retries } => {
            commands::pools::list_pools(&state, json, retries).await
        }
        CliCommand::Mine {
            address,
            pool,
            template,
            retries,
        } => {
            let choice = match (pool, template) {
                (_, Some(template)) => PoolChoice::Template(template),
                (Some(index), None) => PoolChoice::Index(index),
                (None, None) => return Err(AppError::NoSelection),
            };
            commands::mining::mine(&state, &address, choice, retries).await
        }
        CliCommand::Rank { .. } => Ok(()),
    }
}

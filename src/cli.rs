use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pool-miner", version, about = "Pick a mining pool and run the miner")]
pub struct Cli {
    /// Path to config.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download and print the pool list
    Pools {
        /// Print JSON instead of a numbered list
        #[arg(long)]
        json: bool,
        /// Retries after a failed download, each after the cooldown
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },
    /// Start the miner with a pool and wallet address
    Mine {
        /// Wallet address substituted into the pool command
        #[arg(long)]
        address: String,
        /// Index of the pool in the downloaded list
        #[arg(long, conflicts_with = "template", required_unless_present = "template")]
        pool: Option<usize>,
        /// Use this command template instead of the downloaded list
        #[arg(long)]
        template: Option<String>,
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },
    /// Show the rank badge for a balance
    Rank { balance: f64 },
}

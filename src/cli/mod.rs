//! Command-line front end for PoW registration (`btcli-pow`)
//!
//! # Commands
//!
//! - `register` - Solve the registration puzzle and register a hotkey on a subnet
//! - `faucet` - Solve faucet puzzles to drip test TAO to a coldkey

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::logging::{init_logging, LogFormat};

pub mod commands;
pub mod utils;

/// Bittensor PoW registration CLI
#[derive(Parser)]
#[command(name = "btcli-pow")]
#[command(author = "Cortex Foundation")]
#[command(version)]
#[command(about = "Bittensor proof-of-work registration and faucet", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Network to connect to (finney, test, archive, local, or custom URL)
    #[arg(short, long, global = true)]
    pub network: Option<String>,

    /// Custom RPC endpoint (overrides --network)
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Don't prompt for confirmations or secrets
    #[arg(long, global = true)]
    pub no_prompt: bool,

    /// JSON config file (default: ~/.bittensor/pow_config.json if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Log format (text, json, compact)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Register a hotkey on a subnet by proof of work
    #[command(alias = "r")]
    Register(commands::register::RegisterCommand),

    /// Obtain test TAO from the testnet faucet by proof of work
    #[command(alias = "f")]
    Faucet(commands::faucet::FaucetCommand),
}

impl Cli {
    /// Config file, environment, then global flags.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load_or_default(self.config.as_deref())
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?
            .apply_env();
        config.subtensor.chain_endpoint =
            utils::resolve_endpoint(&config, self.network.as_deref(), self.endpoint.as_deref());
        if let Some(network) = &self.network {
            config.subtensor.network = network.clone();
        }
        if self.debug {
            config.logging.debug = true;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        Ok(config)
    }
}

/// Run the CLI application
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    init_logging(&config.logging);

    match &cli.command {
        Commands::Register(cmd) => commands::register::execute(cmd, &cli, config).await,
        Commands::Faucet(cmd) => commands::faucet::execute(cmd, &cli, config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_register() {
        let cli = Cli::try_parse_from([
            "btcli-pow",
            "--network",
            "local",
            "register",
            "--netuid",
            "3",
            "--hotkey-uri",
            "//Alice",
            "--coldkey",
            "//Bob",
            "--num-processes",
            "2",
        ])
        .unwrap();
        assert_eq!(cli.network.as_deref(), Some("local"));
        match cli.command {
            Commands::Register(cmd) => {
                assert_eq!(cmd.netuid, 3);
                assert_eq!(cmd.solver.num_processes, Some(2));
            }
            Commands::Faucet(_) => panic!("expected register"),
        }
    }

    #[test]
    fn test_parse_faucet_with_cuda() {
        let cli = Cli::try_parse_from([
            "btcli-pow",
            "faucet",
            "--cuda",
            "--dev-id",
            "0",
            "--dev-id",
            "1",
            "--max-successes",
            "5",
        ])
        .unwrap();
        match cli.command {
            Commands::Faucet(cmd) => {
                assert!(cmd.solver.cuda);
                assert_eq!(cmd.solver.dev_id, vec![0, 1]);
                assert_eq!(cmd.max_successes, Some(5));
            }
            Commands::Register(_) => panic!("expected faucet"),
        }
    }
}

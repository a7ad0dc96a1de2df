//! `btcli-pow` binary entrypoint.
//!
//! Logging is installed by `cli::run` once the config is loaded.

use bittensor_pow::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::run().await
}

//! `faucet`: solve faucet puzzles for a coldkey until enough drips succeed.

use clap::Args;

use super::{cancel_on_ctrl_c, SolverArgs, WaitFor};
use crate::chain::{signer_from_seed, BittensorClient};
use crate::cli::utils::{
    confirm, create_table_with_headers, format_duration, print_error, print_info, print_success,
    print_warning, secret_or_prompt, spinner,
};
use crate::cli::Cli;
use crate::config::Config;
use crate::core::constants::NETWORK_TEST;
use crate::extrinsics::{run_faucet, FaucetStop, FaucetSubmitter};
use crate::pow::CancelToken;
use crate::utils::ss58::ss58_encode;

#[derive(Args, Clone, Debug)]
pub struct FaucetCommand {
    /// Coldkey secret URI; prompted if omitted
    #[arg(long)]
    pub coldkey_uri: Option<String>,

    /// Successful drips before stopping
    #[arg(long)]
    pub max_successes: Option<u32>,

    /// When a faucet extrinsic counts as submitted
    #[arg(long, value_enum, default_value = "finalization")]
    pub wait_for: WaitFor,

    #[command(flatten)]
    pub solver: SolverArgs,
}

pub async fn execute(cmd: &FaucetCommand, cli: &Cli, mut config: Config) -> anyhow::Result<()> {
    cmd.solver.apply(&mut config.pow_register);
    if let Some(n) = cmd.max_successes {
        config.pow_register.max_successes = n;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    if config.subtensor.network != NETWORK_TEST {
        print_warning("The faucet is only enabled on test networks");
    }

    let coldkey_uri = secret_or_prompt(cmd.coldkey_uri.as_deref(), "Coldkey URI", cli.no_prompt)?;
    let coldkey_signer = signer_from_seed(&coldkey_uri)?;
    let coldkey = coldkey_signer.public_key();

    let endpoint = config.subtensor.chain_endpoint.clone();
    print_info(&format!("Coldkey: {}", ss58_encode(&coldkey)));
    print_info(&format!(
        "Target: {} successful drips, {} failed attempts allowed",
        config.pow_register.max_successes, config.pow_register.max_allowed_attempts
    ));

    if !confirm("Run the faucet?", cli.no_prompt) {
        print_info("Faucet cancelled");
        return Ok(());
    }

    let sp = spinner(&format!("Connecting to {}...", endpoint));
    let client = BittensorClient::new(&endpoint)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect: {}", e))?;
    sp.finish_and_clear();

    let submitter = FaucetSubmitter::new(&client, &coldkey_signer).with_wait(cmd.wait_for.into());
    let solver_config = config.pow_register.solver_config();
    let policy = config.pow_register.policy();
    let cancel = CancelToken::new();
    let interrupt = cancel_on_ctrl_c(cancel.clone());
    let started = std::time::Instant::now();

    let result = run_faucet(
        &client,
        &submitter,
        coldkey,
        &solver_config,
        &policy,
        &cancel,
    )
    .await;
    interrupt.abort();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            print_error(&format!("Faucet failed: {}", e));
            return Err(anyhow::anyhow!("Faucet failed: {}", e));
        }
    };

    let mut table = create_table_with_headers(&["#", "Transaction"]);
    for (i, tx_hash) in report.tx_hashes.iter().enumerate() {
        table.add_row(vec![(i + 1).to_string(), tx_hash.clone()]);
    }
    if !report.tx_hashes.is_empty() {
        println!("\n{table}");
    }

    let elapsed = format_duration(started.elapsed().as_secs());
    match report.stopped {
        FaucetStop::MaxSuccesses => {
            print_success(&format!(
                "Faucet finished: {} drips in {}",
                report.successes, elapsed
            ));
            Ok(())
        }
        FaucetStop::Cancelled => {
            print_warning(&format!(
                "Faucet stopped after {} drips in {}",
                report.successes, elapsed
            ));
            Ok(())
        }
        FaucetStop::AttemptsExhausted => {
            let reason = report.last_error.unwrap_or_else(|| "unknown error".to_string());
            print_error(&format!(
                "Faucet gave up after {} drips: {}",
                report.successes, reason
            ));
            Err(anyhow::anyhow!("Faucet failed: {}", reason))
        }
    }
}

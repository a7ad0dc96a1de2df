//! `register`: solve the registration puzzle for a hotkey and submit it.

use clap::Args;
use zeroize::Zeroizing;

use super::{cancel_on_ctrl_c, SolverArgs, WaitFor};
use crate::chain::{signer_from_seed, BittensorClient};
use crate::cli::utils::{
    confirm, create_table_with_headers, format_address, print_error, print_info, print_success,
    print_warning, secret_or_prompt, spinner,
};
use crate::cli::Cli;
use crate::config::Config;
use crate::extrinsics::{register_with_pow, RegisterSubmitter, RegistrationOutcome};
use crate::pow::CancelToken;
use crate::utils::ss58::{parse_account, ss58_encode};

#[derive(Args, Clone, Debug)]
pub struct RegisterCommand {
    /// Subnet ID
    #[arg(short = 'u', long)]
    pub netuid: u16,

    /// Hotkey secret URI (mnemonic, 0x seed or //Dev path); prompted if omitted
    #[arg(long)]
    pub hotkey_uri: Option<String>,

    /// Coldkey SS58 address, 0x public key, or secret URI; prompted if omitted
    #[arg(long)]
    pub coldkey: Option<String>,

    /// When the register extrinsic counts as submitted
    #[arg(long, value_enum, default_value = "inclusion")]
    pub wait_for: WaitFor,

    #[command(flatten)]
    pub solver: SolverArgs,
}

/// A coldkey argument is a public identifier if it parses as one, otherwise a secret URI.
fn resolve_coldkey(input: &str) -> anyhow::Result<[u8; 32]> {
    if let Ok(public) = parse_account(input) {
        return Ok(public);
    }
    let signer = signer_from_seed(input)
        .map_err(|e| anyhow::anyhow!("Coldkey is neither an address nor a secret URI: {}", e))?;
    Ok(signer.public_key())
}

pub async fn execute(cmd: &RegisterCommand, cli: &Cli, mut config: Config) -> anyhow::Result<()> {
    cmd.solver.apply(&mut config.pow_register);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let hotkey_uri = secret_or_prompt(cmd.hotkey_uri.as_deref(), "Hotkey URI", cli.no_prompt)?;
    let hotkey_signer = signer_from_seed(&hotkey_uri)?;
    let hotkey = hotkey_signer.public_key();

    let coldkey_input: Zeroizing<String> = secret_or_prompt(
        cmd.coldkey.as_deref(),
        "Coldkey address or URI",
        cli.no_prompt,
    )?;
    let coldkey = resolve_coldkey(&coldkey_input)?;

    let endpoint = config.subtensor.chain_endpoint.clone();
    print_info(&format!("Registering on subnet {}", cmd.netuid));
    print_info(&format!("Hotkey: {}", ss58_encode(&hotkey)));
    print_info(&format!("Coldkey: {}", ss58_encode(&coldkey)));
    print_info(&format!("Backend: {:?}", config.pow_register.backend()));

    if !confirm("Proceed with registration?", cli.no_prompt) {
        print_info("Registration cancelled");
        return Ok(());
    }

    let sp = spinner(&format!("Connecting to {}...", endpoint));
    let client = BittensorClient::new(&endpoint)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect: {}", e))?;
    sp.finish_and_clear();

    let submitter = RegisterSubmitter::new(&client, &hotkey_signer, cmd.netuid, hotkey, coldkey)
        .with_wait(cmd.wait_for.into());
    let solver_config = config.pow_register.solver_config();
    let policy = config.pow_register.policy();
    let cancel = CancelToken::new();
    let interrupt = cancel_on_ctrl_c(cancel.clone());

    let result = register_with_pow(
        &client,
        &submitter,
        cmd.netuid,
        hotkey,
        &solver_config,
        &policy,
        &cancel,
    )
    .await;
    interrupt.abort();

    match result {
        Ok(RegistrationOutcome::Registered { solution, tx_hash }) => {
            print_success("Registration successful!");
            let mut table = create_table_with_headers(&["Field", "Value"]);
            table.add_row(vec!["Subnet".to_string(), cmd.netuid.to_string()]);
            table.add_row(vec![
                "Hotkey".to_string(),
                format_address(&ss58_encode(&hotkey)),
            ]);
            table.add_row(vec!["Block".to_string(), solution.block_number.to_string()]);
            table.add_row(vec!["Nonce".to_string(), solution.nonce.to_string()]);
            table.add_row(vec!["Difficulty".to_string(), solution.difficulty.to_string()]);
            table.add_row(vec!["Seal".to_string(), solution.seal_hex()]);
            table.add_row(vec!["Transaction".to_string(), tx_hash]);
            println!("\n{table}");
            Ok(())
        }
        Ok(RegistrationOutcome::AlreadyRegistered) => {
            print_success(&format!(
                "Hotkey is already registered on subnet {}",
                cmd.netuid
            ));
            Ok(())
        }
        Ok(RegistrationOutcome::Cancelled) => {
            print_warning("Registration cancelled");
            Ok(())
        }
        Ok(RegistrationOutcome::AttemptsExhausted {
            attempts,
            last_error,
        }) => {
            print_error(&format!(
                "Registration failed after {} attempts: {}",
                attempts, last_error
            ));
            Err(anyhow::anyhow!("Registration failed: {}", last_error))
        }
        Err(e) => {
            print_error(&format!("Registration failed: {}", e));
            Err(anyhow::anyhow!("Registration failed: {}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_coldkey_address() {
        let address = ss58_encode(&[5u8; 32]);
        assert_eq!(resolve_coldkey(&address).unwrap(), [5u8; 32]);
    }

    #[test]
    fn test_resolve_coldkey_uri() {
        let expected = signer_from_seed("//Bob").unwrap().public_key();
        assert_eq!(resolve_coldkey("//Bob").unwrap(), expected);
    }
}

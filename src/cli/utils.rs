//! CLI utility functions for terminal interaction and formatting.

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use console::{style, Term};
use dialoguer::{Confirm, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use zeroize::Zeroizing;

use crate::config::{network_endpoint, Config};

/// Prompt for confirmation with default behavior based on `no_prompt` flag.
/// If `no_prompt` is true, returns true without prompting.
pub fn confirm(message: &str, no_prompt: bool) -> bool {
    if no_prompt {
        return true;
    }

    Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .unwrap_or(false)
}

/// Prompt for a secret (hidden characters). The buffer is wiped on drop.
pub fn prompt_secret(message: &str) -> anyhow::Result<Zeroizing<String>> {
    let secret = Password::new()
        .with_prompt(message)
        .interact()
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", message, e))?;
    Ok(Zeroizing::new(secret))
}

/// Use `provided` when given, otherwise prompt. Fails instead of prompting
/// under `--no-prompt`.
pub fn secret_or_prompt(
    provided: Option<&str>,
    message: &str,
    no_prompt: bool,
) -> anyhow::Result<Zeroizing<String>> {
    match provided {
        Some(value) => Ok(Zeroizing::new(value.to_string())),
        None if no_prompt => Err(anyhow::anyhow!(
            "{} is required when --no-prompt is set",
            message
        )),
        None => prompt_secret(message),
    }
}

/// Create a spinner progress bar with message.
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Print success message in green.
pub fn print_success(message: &str) {
    let term = Term::stdout();
    let _ = term.write_line(&format!("{} {}", style("✓").green().bold(), message));
}

/// Print error message in red.
pub fn print_error(message: &str) {
    let term = Term::stderr();
    let _ = term.write_line(&format!("{} {}", style("✗").red().bold(), message));
}

/// Print info message in blue.
pub fn print_info(message: &str) {
    let term = Term::stdout();
    let _ = term.write_line(&format!("{} {}", style("ℹ").blue().bold(), message));
}

/// Print warning message in yellow.
pub fn print_warning(message: &str) {
    let term = Term::stdout();
    let _ = term.write_line(&format!("{} {}", style("⚠").yellow().bold(), message));
}

/// Format SS58 address (truncated for display).
/// Shows first 8 and last 8 characters with "..." in between.
pub fn format_address(address: &str) -> String {
    if address.len() <= 18 {
        return address.to_string();
    }
    format!("{}...{}", &address[..8], &address[address.len() - 8..])
}

/// Create a table with custom headers.
pub fn create_table_with_headers(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| style(*h).bold().to_string()));
    table
}

/// Endpoint to connect to: `--endpoint`, then `--network` (a known name or a
/// raw URL), then the loaded config.
pub fn resolve_endpoint(config: &Config, network: Option<&str>, endpoint: Option<&str>) -> String {
    if let Some(endpoint) = endpoint {
        return endpoint.to_string();
    }

    match network {
        Some(network) => network_endpoint(&network.to_lowercase())
            .map(str::to_string)
            .unwrap_or_else(|| network.to_string()),
        None => config.subtensor.chain_endpoint.clone(),
    }
}

/// Format duration for display.
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        let mins = seconds / 60;
        let secs = seconds % 60;
        format!("{}m {}s", mins, secs)
    } else {
        let hours = seconds / 3600;
        let mins = (seconds % 3600) / 60;
        format!("{}h {}m", hours, mins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants;

    #[test]
    fn test_format_address() {
        let addr = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
        assert_eq!(format_address(addr), "5GrwvaEF...oHGKutQY");

        let short = "5GrwvaEF";
        assert_eq!(format_address(short), "5GrwvaEF");
    }

    #[test]
    fn test_resolve_endpoint() {
        let config = Config::for_network("test");
        assert_eq!(
            resolve_endpoint(&config, None, None),
            constants::FINNEY_TEST_ENDPOINT
        );
        assert_eq!(
            resolve_endpoint(&config, Some("LOCAL"), None),
            constants::LOCAL_ENDPOINT
        );
        assert_eq!(
            resolve_endpoint(&config, Some("ws://node:9944"), None),
            "ws://node:9944"
        );
        assert_eq!(
            resolve_endpoint(&config, Some("finney"), Some("ws://custom:9944")),
            "ws://custom:9944"
        );
    }

    #[test]
    fn test_secret_required_without_prompt() {
        assert!(secret_or_prompt(None, "Hotkey URI", true).is_err());
        let secret = secret_or_prompt(Some("//Alice"), "Hotkey URI", true).unwrap();
        assert_eq!(secret.as_str(), "//Alice");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(7260), "2h 1m");
    }
}

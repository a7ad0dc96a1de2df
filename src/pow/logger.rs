//! Progress output for a running search

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use super::stats::RegistrationStatistics;

/// Renders [`RegistrationStatistics`] either as an in-place spinner line or as
/// one log event per update.
pub struct StatisticsLogger {
    verbose: bool,
    bar: Option<ProgressBar>,
}

impl StatisticsLogger {
    pub fn new(output_in_place: bool, verbose: bool) -> Self {
        let bar = output_in_place.then(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
                    .template("{spinner:.blue} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message("Solving");
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        Self { verbose, bar }
    }

    pub fn update(&self, stats: &RegistrationStatistics) {
        let line = self.render(stats);
        match &self.bar {
            Some(bar) => bar.set_message(line),
            None => info!(
                block = stats.block_number,
                difficulty = stats.difficulty,
                hash_rate = %format_hash_rate(stats.hash_rate),
                rounds = stats.rounds_total,
                "Solving"
            ),
        }
    }

    fn render(&self, stats: &RegistrationStatistics) -> String {
        if self.verbose {
            format!(
                "Solving | block {} ({}) | difficulty {} | {} (avg {}) | rounds {} | {:.2}s elapsed, {:.4}s/round",
                stats.block_number,
                short_hash(&stats.block_hash),
                stats.difficulty,
                format_hash_rate(stats.hash_rate),
                format_hash_rate(stats.hash_rate_perpetual),
                stats.rounds_total,
                stats.time_spent_total,
                stats.time_average,
            )
        } else {
            format!(
                "Solving | block {} | difficulty {} | {}",
                stats.block_number,
                stats.difficulty,
                format_hash_rate(stats.hash_rate)
            )
        }
    }

    /// Print the final statistics table in verbose mode.
    pub fn print_summary(&self, stats: &RegistrationStatistics) {
        if self.verbose {
            println!("{}", summary_table(stats));
        }
    }

    /// Stop the steady tick and clear the spinner line.
    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for StatisticsLogger {
    fn drop(&mut self) {
        self.finish();
    }
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

/// Human-readable hashes per second.
pub fn format_hash_rate(rate: f64) -> String {
    const UNITS: [&str; 5] = ["H/s", "KH/s", "MH/s", "GH/s", "TH/s"];
    let mut value = if rate.is_finite() { rate.max(0.0) } else { 0.0 };
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// Final statistics as a table.
pub fn summary_table(stats: &RegistrationStatistics) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Statistic", "Value"]);
    table.add_row(vec!["Block".to_string(), stats.block_number.to_string()]);
    table.add_row(vec!["Block hash".to_string(), stats.block_hash.clone()]);
    table.add_row(vec!["Difficulty".to_string(), stats.difficulty.to_string()]);
    table.add_row(vec!["Rounds".to_string(), stats.rounds_total.to_string()]);
    table.add_row(vec![
        "Time spent".to_string(),
        format!("{:.2}s", stats.time_spent_total),
    ]);
    table.add_row(vec!["Hash rate".to_string(), format_hash_rate(stats.hash_rate)]);
    table.add_row(vec![
        "Average hash rate".to_string(),
        format_hash_rate(stats.hash_rate_perpetual),
    ]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hash_rate_units() {
        assert_eq!(format_hash_rate(0.0), "0.00 H/s");
        assert_eq!(format_hash_rate(999.0), "999.00 H/s");
        assert_eq!(format_hash_rate(1_500.0), "1.50 KH/s");
        assert_eq!(format_hash_rate(2_000_000.0), "2.00 MH/s");
        assert_eq!(format_hash_rate(f64::NAN), "0.00 H/s");
    }

    #[test]
    fn test_summary_table_contains_block() {
        let stats = RegistrationStatistics {
            block_number: 77,
            ..Default::default()
        };
        assert!(summary_table(&stats).to_string().contains("77"));
    }

    #[test]
    fn test_logger_finish_is_idempotent() {
        let mut logger = StatisticsLogger::new(true, true);
        logger.update(&RegistrationStatistics::default());
        logger.finish();
        logger.finish();
    }
}

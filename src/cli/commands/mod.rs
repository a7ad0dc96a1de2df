//! CLI command implementations
//!
//! Each module contains the command definition and execution logic for one
//! subcommand. Solver flags shared by both live here.

pub mod faucet;
pub mod register;

use clap::{Args, ValueEnum};
use tokio::task::JoinHandle;

use crate::chain::ExtrinsicWait;
use crate::cli::utils::print_warning;
use crate::config::PowRegisterConfig;
use crate::pow::CancelToken;

/// PoW tunables; unset flags keep the config file / environment value
#[derive(Args, Clone, Debug, Default)]
pub struct SolverArgs {
    /// CPU worker threads (default: all cores)
    #[arg(long, alias = "processes")]
    pub num_processes: Option<usize>,

    /// Nonces per worker batch
    #[arg(long)]
    pub update_interval: Option<u64>,

    /// Solve on CUDA devices instead of the CPU
    #[arg(long)]
    pub cuda: bool,

    /// CUDA device id (repeat for several devices)
    #[arg(long)]
    pub dev_id: Vec<usize>,

    /// CUDA threads per block
    #[arg(long)]
    pub tpb: Option<u32>,

    /// Log statistics lines instead of an in-place status line
    #[arg(long)]
    pub no_output_in_place: bool,

    /// Detailed statistics
    #[arg(short, long)]
    pub verbose: bool,

    /// Failed submissions before giving up
    #[arg(long)]
    pub max_allowed_attempts: Option<u32>,
}

impl SolverArgs {
    /// Overlay these flags onto `pow`.
    pub fn apply(&self, pow: &mut PowRegisterConfig) {
        if let Some(n) = self.num_processes {
            pow.num_processes = Some(n);
        }
        if let Some(n) = self.update_interval {
            pow.update_interval = n;
        }
        if self.cuda {
            pow.cuda.use_cuda = true;
        }
        if !self.dev_id.is_empty() {
            pow.cuda.dev_id = self.dev_id.clone();
        }
        if let Some(tpb) = self.tpb {
            pow.cuda.tpb = tpb;
        }
        if self.no_output_in_place {
            pow.output_in_place = false;
        }
        if self.verbose {
            pow.verbose = true;
        }
        if let Some(n) = self.max_allowed_attempts {
            pow.max_allowed_attempts = n;
        }
    }
}

/// When a submission counts as done
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitFor {
    None,
    Inclusion,
    Finalization,
}

impl From<WaitFor> for ExtrinsicWait {
    fn from(wait: WaitFor) -> Self {
        match wait {
            WaitFor::None => ExtrinsicWait::None,
            WaitFor::Inclusion => ExtrinsicWait::Included,
            WaitFor::Finalization => ExtrinsicWait::Finalized,
        }
    }
}

/// Cancel `token` on the first Ctrl-C.
pub(crate) fn cancel_on_ctrl_c(token: CancelToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            print_warning("Interrupted, stopping workers...");
            token.cancel();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solver_args_overlay() {
        let mut pow = PowRegisterConfig::default();
        let args = SolverArgs {
            num_processes: Some(4),
            cuda: true,
            dev_id: vec![1],
            no_output_in_place: true,
            ..SolverArgs::default()
        };
        args.apply(&mut pow);
        assert_eq!(pow.num_processes, Some(4));
        assert!(pow.cuda.use_cuda);
        assert_eq!(pow.cuda.dev_id, vec![1]);
        assert!(!pow.output_in_place);
        assert_eq!(pow.update_interval, crate::core::constants::DEFAULT_UPDATE_INTERVAL);
    }

    #[test]
    fn test_empty_args_keep_config() {
        let mut pow = PowRegisterConfig::default();
        SolverArgs::default().apply(&mut pow);
        assert_eq!(pow, PowRegisterConfig::default());
    }
}

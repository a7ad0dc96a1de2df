//! Extrinsics fed by the registration engine

pub mod registration;

pub use registration::{
    faucet_args, is_already_registered_error, is_registered, register_args, register_with_pow,
    run_faucet, FaucetReport, FaucetStop, FaucetSubmitter, RegisterSubmitter, RegistrationOutcome,
    RegistrationPolicy, SolutionSubmitter,
};

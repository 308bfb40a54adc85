//! Command-line surfaces for the three front-end binaries (`salloc`,
//! `scrun`, `slurm-update-job`).
//!
//! Each binary owns its own `clap::Parser` struct; this module only
//! holds the argument definitions, not dispatch — `main.rs`/`src/bin/*`
//! wire parsed args into the option-model and command layers.

pub mod salloc_args;
pub mod scrun_args;
pub mod update_args;

pub use salloc_args::SallocArgs;
pub use scrun_args::ScrunArgs;
pub use update_args::UpdateArgs;

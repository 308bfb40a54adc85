//! Interactive allocation front-end, OCI container runtime front-end,
//! and job-update client for a cluster resource manager — the
//! `salloc`/`scrun`/`slurm-update-job` trio, sharing one value-parser
//! layer, option model, and error type.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod client;
pub mod config;
pub mod container;
pub mod error;
pub mod jobupdate;
pub mod optmodel;
pub mod parsers;
pub mod supervisor;
pub mod wrapper;

pub type Result<T> = error::SallocResult<T>;

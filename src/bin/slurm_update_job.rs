//! `slurm-update-job`: the job-update client (C7, §4.7), standing in
//! for `scontrol update JobId=...`.

use clap::Parser;

use slurm_alloc_client::cli::update_args::UpdateArgs;
use slurm_alloc_client::error::{SallocError, SallocResult};
use slurm_alloc_client::jobupdate::{resize::ResizedAllocation, ControllerQuery, UpdateRequest};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = UpdateArgs::parse();
    let exit_code = match run(&args) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{}", e.user_friendly_message("slurm-update-job"));
            e.exit_code()
        }
    };
    std::process::exit(exit_code);
}

fn run(args: &UpdateArgs) -> SallocResult<()> {
    let uid = match &args.uid {
        Some(name) => Some(resolve_uid(name)?),
        None => None,
    };
    let cwd = std::env::current_dir()?;
    let controller = NoopController;
    slurm_alloc_client::jobupdate::run(&args.tokens, uid, &cwd, &controller)
}

/// Resolve a `--uid=USER` argument. A bare numeric string is accepted
/// directly; anything else would require a password-database lookup
/// this client does not otherwise need (see [`crate::optmodel::defaults::ProcessIdentity`]
/// for the one place that lookup already lives).
fn resolve_uid(raw: &str) -> SallocResult<u32> {
    raw.parse()
        .map_err(|_| SallocError::parse("uid", format!("'{raw}' is not a numeric uid")))
}

/// The controller RPC this client submits updates to (and queries
/// names/time-limits/post-resize facts from) is out of scope (spec.md
/// §1). This stand-in reports every call as a transport failure so the
/// binary at least fails loudly rather than silently no-op-ing.
struct NoopController;

impl ControllerQuery for NoopController {
    fn current_time_limit(&self, _job_id: &str) -> SallocResult<u32> {
        Err(SallocError::TransportError(
            "no controller connection is configured".to_string(),
        ))
    }

    fn resolve_name(&self, _name: &str, _uid: Option<u32>) -> SallocResult<Vec<String>> {
        Err(SallocError::TransportError(
            "no controller connection is configured".to_string(),
        ))
    }

    fn submit_update(&self, _job_id: &str, _req: &UpdateRequest) -> SallocResult<()> {
        Err(SallocError::TransportError(
            "no controller connection is configured".to_string(),
        ))
    }

    fn resized_allocation(&self, _job_id: &str) -> SallocResult<ResizedAllocation> {
        Err(SallocError::TransportError(
            "no controller connection is configured".to_string(),
        ))
    }
}

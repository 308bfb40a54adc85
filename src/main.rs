//! `salloc`: the interactive allocation front-end (§1-§8).
//!
//! Ties together the option model (C2), allocation client (C4), and
//! supervisor (C5): resolve the hetjob descriptor(s), submit and block
//! until granted, export the `SLURM_*` environment (§6), run the user
//! command, and release the allocation on every exit path.

use std::collections::HashMap;
use std::sync::Arc;

use log::{info, warn};

use slurm_alloc_client::client::protocol::RealTransport;
use slurm_alloc_client::client::{AllocState, AllocationClient, AllocationResponse};
use slurm_alloc_client::config::{self, PartialRuntimeConfig, RuntimeConfig};
use slurm_alloc_client::error::SallocError;
use slurm_alloc_client::optmodel::defaults::OsIdentity;
use slurm_alloc_client::optmodel::job_desc::{JobDesc, NO_VAL};
use slurm_alloc_client::optmodel::validate::OsHostfileReader;
use slurm_alloc_client::optmodel::{build_hetjob, HetJob};
use slurm_alloc_client::supervisor;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let exit_code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.user_friendly_message("salloc"));
            e.exit_code()
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<i32, SallocError> {
    let argv: Vec<String> = std::env::args().collect();
    let env: HashMap<String, String> = std::env::vars().collect();

    let hetjob = build_hetjob(&argv, &env, &OsIdentity, &OsHostfileReader)?;
    let cfg = config::load(PartialRuntimeConfig::default())
        .map_err(|e| SallocError::validation(e.to_string()))?;

    let transport = Arc::new(RealTransport::new(cfg.controller_addr.clone()));
    let client = AllocationClient::new(transport);

    let printed_job_id = Arc::new(std::sync::Mutex::new(None));
    let cb_job_id = Arc::clone(&printed_job_id);
    let pending_cb: Arc<dyn Fn(u32) + Send + Sync> = Arc::new(move |job_id| {
        let mut guard = cb_job_id.lock().unwrap();
        if guard.is_none() {
            println!("salloc: Pending job allocation {job_id}");
            *guard = Some(job_id);
        }
    });

    let (listen_port, sup_rx) = client.start_listener(pending_cb)?;

    let responses = match client.submit(&hetjob, listen_port) {
        Ok(r) => r,
        Err(SallocError::UserAbort) => return Ok(0),
        Err(e) => return Err(e),
    };

    let first = responses.first().ok_or_else(|| {
        SallocError::Internal("controller granted an allocation with no components".to_string())
    })?;
    println!("salloc: Granted job allocation {}", first.job_id);

    let primary = &hetjob[0];
    let budget = JobDesc::readiness_budget(cfg.suspend_timeout, cfg.resume_timeout);
    let ready = client.wait_ready(first.job_id, primary.wait_all_nodes.unwrap_or(false), budget)?;
    if !ready {
        warn!("salloc: allocation {} revoked before it became ready", first.job_id);
        client.complete(first.job_id, NO_VAL)?;
        return Ok(cfg.exit_error);
    }

    let mut job_env = env.clone();
    export_job_environment(&mut job_env, &hetjob, &responses, &cfg);

    let outcome = supervisor::run(
        &primary.command,
        &job_env,
        primary.no_shell,
        true,
        primary.kill_command_signal,
        sup_rx,
    )?;

    if client.state() != AllocState::Revoked {
        client.complete(first.job_id, outcome.exit_code as u32)?;
    }
    info!("salloc: exiting with code {}", outcome.exit_code);
    Ok(outcome.exit_code)
}

/// Export the `SLURM_*` variables of §6's "Environment output" list
/// into the user command's environment, in place.
fn export_job_environment(
    job_env: &mut HashMap<String, String>,
    hetjob: &HetJob,
    responses: &[AllocationResponse],
    cfg: &RuntimeConfig,
) {
    let first = &responses[0];
    let primary = &hetjob[0];

    job_env.insert("SLURM_JOB_ID".to_string(), first.job_id.to_string());
    job_env.insert("SLURM_NNODES".to_string(), first.num_nodes.to_string());
    job_env.insert("SLURM_JOB_NUM_NODES".to_string(), first.num_nodes.to_string());
    job_env.insert("SLURM_JOB_NODELIST".to_string(), first.node_list.clone());
    job_env.insert("SLURM_NODELIST".to_string(), first.node_list.clone());
    job_env.insert("SLURM_JOB_CPUS_PER_NODE".to_string(), first.cpus_per_node_rle.clone());
    job_env.insert("SLURM_NTASKS".to_string(), primary.ntasks.to_string());
    job_env.insert("SLURM_NPROCS".to_string(), primary.ntasks.to_string());
    if primary.ntasks_per_node > 0 {
        job_env.insert("SLURM_NTASKS_PER_NODE".to_string(), primary.ntasks_per_node.to_string());
    }
    job_env.insert("SLURM_CLUSTER_NAME".to_string(), cfg.cluster_name.clone());
    job_env.insert(
        "SLURM_SUBMIT_DIR".to_string(),
        primary.chdir.clone().unwrap_or_else(|| primary.submit_dir.clone()),
    );
    job_env.insert("SLURM_SUBMIT_HOST".to_string(), primary.submit_host.clone());
    if let Some(mem_bind) = &primary.mem_bind {
        job_env.insert("SLURM_MEM_BIND".to_string(), mem_bind.clone());
    }
    if let Some(profile) = &primary.profile {
        job_env.insert("SLURM_PROFILE".to_string(), profile.clone());
    }
    if hetjob.len() > 1 {
        job_env.insert("SLURM_HET_SIZE".to_string(), hetjob.len().to_string());
        job_env.insert("SLURM_PACK_SIZE".to_string(), hetjob.len().to_string());
    }
}

//! Pass 2 of the three-pass fill (§4.2): environment-variable overlay.
//!
//! Every recognised `SALLOC_*` variable (plus the generic `SLURM_HINT`,
//! `SLURM_HOSTFILE`) is applied through a typed setter. A setter failure
//! is logged and the variable is skipped — non-fatal, per §7's
//! propagation policy ("Parse errors from env are logged and the setter
//! is skipped").

use crate::optmodel::partial::PartialJobDesc;
use crate::parsers;
use log::warn;
use std::collections::HashMap;

/// Apply the environment overlay. `env` is injected (rather than read
/// from `std::env` directly) so tests can supply a fixed map.
pub fn apply_env_overlay(env: &HashMap<String, String>) -> PartialJobDesc {
    let mut p = PartialJobDesc::default();

    macro_rules! str_var {
        ($name:literal => $field:ident) => {
            if let Some(v) = env.get($name) {
                p.$field = Some(v.clone());
            }
        };
    }
    macro_rules! int_var {
        ($name:literal => $field:ident) => {
            if let Some(v) = env.get($name) {
                match v.parse() {
                    Ok(n) => p.$field = Some(n),
                    Err(_) => warn!("ignoring malformed {}={v}", $name),
                }
            }
        };
    }
    macro_rules! bool_var {
        ($name:literal => $field:ident) => {
            if let Some(v) = env.get($name) {
                p.$field = Some(env_bool(v));
            }
        };
    }

    str_var!("SALLOC_PARTITION" => partition);
    str_var!("SALLOC_QOS" => qos);
    str_var!("SALLOC_ACCOUNT" => account);
    str_var!("SALLOC_RESERVATION" => reservation);
    str_var!("SALLOC_WCKEY" => wckey);
    str_var!("SALLOC_DEPENDENCY" => dependency);
    str_var!("SALLOC_CONSTRAINT" => constraint);
    str_var!("SALLOC_LICENSES" => licenses);
    str_var!("SALLOC_NETWORK" => network);
    str_var!("SALLOC_JOBNAME" => job_name);
    str_var!("SALLOC_CHDIR" => chdir);
    str_var!("SALLOC_GRES" => gres);
    str_var!("SALLOC_EXCLUDE" => exclude_list);
    str_var!("SALLOC_MEM_BIND" => mem_bind);
    str_var!("SALLOC_COMMENT" => comment);

    int_var!("SALLOC_PRIORITY" => priority);
    int_var!("SALLOC_CPUS_PER_TASK" => cpus_per_task);
    int_var!("SALLOC_NTASKS" => ntasks);
    int_var!("SALLOC_TIME_MIN" => time_min);
    int_var!("SALLOC_CORE_SPEC" => core_spec);

    bool_var!("SALLOC_HOLD" => hold);
    bool_var!("SALLOC_REQUEUE" => requeue);
    bool_var!("SALLOC_CONTIGUOUS" => contiguous);
    bool_var!("SALLOC_NO_ROTATE" => no_rotate);
    bool_var!("SALLOC_REBOOT" => reboot);
    bool_var!("SALLOC_NO_KILL" => no_kill);

    if let Some(v) = env.get("SALLOC_PROFILE").or_else(|| env.get("SLURM_PROFILE")) {
        p.profile = Some(v.clone());
    }

    if let Some(v) = env.get("SALLOC_DEBUG") {
        match v.parse::<u8>() {
            Ok(n) => p.verbose = Some(n),
            Err(_) => warn!("ignoring malformed SALLOC_DEBUG={v}"),
        }
    }

    if let Some(v) = env.get("SALLOC_NO_BELL") {
        let _ = v; // presence alone disables the bell
        p.bell = Some(crate::optmodel::job_desc::BellPolicy::Never);
    } else if let Some(v) = env.get("SALLOC_BELL") {
        let _ = v;
        p.bell = Some(crate::optmodel::job_desc::BellPolicy::Always);
    }

    if let Some(v) = env.get("SALLOC_IMMEDIATE") {
        match v.parse::<u32>() {
            Ok(n) => p.immediate_seconds = Some(n),
            Err(_) => warn!("ignoring malformed SALLOC_IMMEDIATE={v}"),
        }
    }

    if let Some(v) = env.get("SALLOC_EXCLUSIVE") {
        let _ = v;
        p.sharing = Some(crate::optmodel::job_desc::Sharing::Exclusive);
    } else if let Some(v) = env.get("SALLOC_OVERCOMMIT") {
        let _ = v;
        p.sharing = Some(crate::optmodel::job_desc::Sharing::Shared);
    }

    if let Some(v) = env.get("SALLOC_WAIT_ALL_NODES") {
        p.wait_all_nodes = Some(env_bool(v));
    }

    if let Some(v) = env
        .get("SALLOC_SIGNAL")
        .or_else(|| env.get("SALLOC_KILL_CMD"))
    {
        match parsers::parse_signal_spec(v) {
            Ok(spec) => p.kill_command_signal = Some(spec.signal),
            Err(e) => warn!("ignoring malformed SALLOC_SIGNAL={v}: {e}"),
        }
    }

    if let Some(v) = env.get("SALLOC_DISTRIBUTION") {
        match parsers::parse_distribution(v) {
            Ok(dist) => p.distribution = Some(dist),
            Err(e) => warn!("ignoring malformed SALLOC_DISTRIBUTION={v}: {e}"),
        }
    } else if let Some(v) = env.get("SLURM_DIST_PLANESIZE") {
        let _ = v; // consulted by the distribution parser's plane fallback, not here
    }

    if let Some(v) = env.get("SALLOC_GEOMETRY") {
        match parsers::parse_geometry(v) {
            Ok(g) => p.geometry = Some(g),
            Err(e) => warn!("ignoring malformed SALLOC_GEOMETRY={v}: {e}"),
        }
    }

    if let Some(v) = env.get("SALLOC_NO_ROTATE") {
        p.no_rotate = Some(env_bool(v));
    }

    // Generic SLURM_HINT / SLURM_HOSTFILE variables.
    str_var!("SLURM_HOSTFILE" => node_list);
    if let Some(v) = env.get("SLURM_HINT") {
        match v.as_str() {
            "compute_bound" => p.threads_per_core = Some(1),
            "memory_bound" => p.ntasks_per_core = Some(1),
            _ => warn!("ignoring unrecognised SLURM_HINT={v}"),
        }
    }

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    if let Some(v) = env.get("SALLOC_BEGIN") {
        match parsers::time::parse_begin_time(v, now) {
            Ok(t) => p.begin_time = Some(t),
            Err(e) => warn!("ignoring malformed SALLOC_BEGIN={v}: {e}"),
        }
    }
    if let Some(v) = env.get("SALLOC_DEADLINE") {
        match parsers::time::parse_begin_time(v, now) {
            Ok(t) => p.deadline = Some(t),
            Err(e) => warn!("ignoring malformed SALLOC_DEADLINE={v}: {e}"),
        }
    }

    // jobid is notice-only per §4.2 ("jobid (notice-only)") — recorded
    // nowhere in the descriptor, only logged.
    if let Some(v) = env.get("SALLOC_JOBID") {
        log::info!("SALLOC_JOBID={v} noted, not applied to a new request");
    }

    p
}

fn env_bool(v: &str) -> bool {
    if v.is_empty() || v.eq_ignore_ascii_case("yes") {
        return true;
    }
    match v.parse::<i64>() {
        Ok(n) => n != 0,
        Err(_) => true, // any other non-empty value counts as "set"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn string_vars_apply() {
        let p = apply_env_overlay(&env(&[("SALLOC_PARTITION", "debug")]));
        assert_eq!(p.partition, Some("debug".into()));
    }

    #[test]
    fn malformed_int_is_skipped_not_fatal() {
        let p = apply_env_overlay(&env(&[("SALLOC_PRIORITY", "not-a-number")]));
        assert_eq!(p.priority, None);
    }

    #[test]
    fn bool_var_semantics() {
        assert!(env_bool(""));
        assert!(env_bool("yes"));
        assert!(env_bool("YES"));
        assert!(env_bool("1"));
        assert!(!env_bool("0"));
    }

    #[test]
    fn hostfile_env_sets_node_list() {
        let p = apply_env_overlay(&env(&[("SLURM_HOSTFILE", "/tmp/hosts")]));
        assert_eq!(p.node_list, Some("/tmp/hosts".into()));
    }

    #[test]
    fn jobid_is_notice_only() {
        let p = apply_env_overlay(&env(&[("SALLOC_JOBID", "123")]));
        // No field in PartialJobDesc is touched by SALLOC_JOBID.
        assert_eq!(p.partition, None);
    }
}

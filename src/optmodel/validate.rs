//! Cross-field inference and invariant checking (§3, §4.2), and the
//! top-level assembly of one or several [`JobDesc`]s from argv + the
//! process environment.
//!
//! This is the only module that runs the three overlay passes in order
//! and then mutates the merged result in place — everything upstream
//! (`defaults`, `env_overlay`, `argv`) only ever produces a
//! [`PartialJobDesc`]; everything here operates on the frozen
//! [`JobDesc`].

use std::collections::HashMap;

use clap::Parser;
use log::{info, warn};

use crate::cli::salloc_args::SallocArgs;
use crate::error::SallocError;
use crate::optmodel::defaults::{self, ProcessIdentity};
use crate::optmodel::env_overlay::apply_env_overlay;
use crate::optmodel::job_desc::{HetJob, JobDesc, NICE_OFFSET};
use crate::optmodel::partial::PartialJobDesc;
use crate::optmodel::{argv, job_desc};
use crate::parsers::distribution::DistLevel;

/// Reads a node-list hostfile. A trait so tests can substitute a fixed
/// line set without touching the filesystem, matching the pattern
/// [`ProcessIdentity`] uses for process/password-database state.
pub trait HostfileReader {
    /// Read and return the non-empty, trimmed lines of `path`.
    fn read_lines(&self, path: &str) -> Result<Vec<String>, SallocError>;
}

/// [`HostfileReader`] backed by the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsHostfileReader;

impl HostfileReader for OsHostfileReader {
    fn read_lines(&self, path: &str) -> Result<Vec<String>, SallocError> {
        let content = std::fs::read_to_string(path)?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// Build the complete heterogeneous-job descriptor list from a full
/// `argv` (program name at index 0) and the process environment.
///
/// This is the entry point `main.rs` calls: it splits on bare `:`
/// separators (§4.2 pass 3), runs the three-pass fill and post-merge
/// inference/validation on each component, and then applies the
/// hetjob-level rule of invariant 8 (job-name inheritance).
pub fn build_hetjob(
    full_argv: &[String],
    env: &HashMap<String, String>,
    identity: &dyn ProcessIdentity,
    hostfiles: &dyn HostfileReader,
) -> Result<HetJob, SallocError> {
    let segments = argv::split_hetjob_argv(full_argv);
    let env_partial = apply_env_overlay(env);
    let defaults_partial = defaults::defaults(identity)?;

    let mut components = Vec::with_capacity(segments.len());
    let mut explicit_name = Vec::with_capacity(segments.len());
    for segment in &segments {
        let parsed = SallocArgs::try_parse_from(segment).map_err(|e| {
            SallocError::validation(format!("argument error: {}", e.render().to_string().trim()))
        })?;
        let argv_partial = argv::apply_argv(&parsed)?;

        let mut merged = defaults_partial.clone();
        merged.merge(env_partial.clone());
        merged.merge(argv_partial);
        explicit_name.push(merged.job_name.is_some());
        let mut desc = merged.freeze()?;

        infer_and_validate(&mut desc, identity, hostfiles)?;
        components.push(desc);
    }

    apply_hetjob_rules(&mut components, &explicit_name);
    Ok(components)
}

/// Invariant 8: "For a heterogeneous request, job-name of later
/// components defaults to the last component's name." The last
/// component's name is either what the user set explicitly or its own
/// command-derived default (already resolved by [`infer_and_validate`]);
/// every other component whose name was not explicitly set by the user
/// is overwritten with it.
fn apply_hetjob_rules(components: &mut [JobDesc], explicit_name: &[bool]) {
    if components.len() < 2 {
        return;
    }
    let Some(last_name) = components.last().and_then(|d| d.job_name.clone()) else {
        return;
    };
    for (d, explicit) in components.iter_mut().zip(explicit_name) {
        if !explicit {
            d.job_name = Some(last_name.clone());
        }
    }
}

/// Apply §3's invariants and §4.2's cross-field inference to one
/// already-frozen descriptor, in the order the design lists them.
pub fn infer_and_validate(
    d: &mut JobDesc,
    identity: &dyn ProcessIdentity,
    hostfiles: &dyn HostfileReader,
) -> Result<(), SallocError> {
    // §4.2: node-list hostfile expansion happens first since it can
    // seed task-count/node-count inference below.
    expand_hostfile_if_path(d, hostfiles)?;

    // time_limit "0" means INFINITE once applied to this field (§4.1).
    if d.time_limit == 0 {
        d.time_limit = job_desc::INFINITE;
    }

    // nodes set but task-count not set: default task-count to
    // min-nodes times any set multiplier.
    if d.nodes_set && !d.ntasks_set {
        let mut multiplier: u64 = 1;
        let mut applied = false;
        for m in [d.sockets_per_node, d.cores_per_socket, d.threads_per_core] {
            if m > 0 {
                multiplier *= m as u64;
                applied = true;
            }
        }
        if applied {
            let computed = (d.min_nodes as u64) * multiplier;
            d.ntasks = u32::try_from(computed).unwrap_or(u32::MAX);
            d.ntasks_set = true;
        }
    } else if d.ntasks_set && !d.nodes_set && d.ntasks < d.min_nodes {
        warn!(
            "ntasks ({}) < min_nodes ({}); shrinking min_nodes to ntasks",
            d.ntasks, d.min_nodes
        );
        d.min_nodes = d.ntasks;
        if d.max_nodes < d.min_nodes {
            d.max_nodes = d.min_nodes;
        }
    }

    // min_cpus_per_node > tasks_per_node: derive cpus_per_task.
    if d.min_cpus_per_node > 0 && d.ntasks_per_node > 0 && d.min_cpus_per_node > d.ntasks_per_node {
        let (q, r) = (
            d.min_cpus_per_node / d.ntasks_per_node,
            d.min_cpus_per_node % d.ntasks_per_node,
        );
        if r != 0 {
            warn!(
                "min_cpus_per_node ({}) not evenly divisible by ntasks_per_node ({}); truncating",
                d.min_cpus_per_node, d.ntasks_per_node
            );
        }
        d.cpus_per_task = q;
    }

    // ntasks-per-core/socket default threads/cores-per-X and an implied
    // cpu-bind policy; cpu-bind itself is out of this descriptor's
    // field set, so only the numeric defaulting is modeled here.
    if d.ntasks_per_core > 0 && d.threads_per_core == 0 {
        d.threads_per_core = d.ntasks_per_core;
        info!("defaulting cpu-bind to cores (ntasks-per-core set)");
    }
    if d.ntasks_per_socket > 0 && d.cores_per_socket == 0 {
        d.cores_per_socket = d.ntasks_per_socket;
        info!("defaulting cpu-bind to sockets (ntasks-per-socket set)");
    }

    // Invariant 2: min_cpus_per_node >= cpus_per_task after normalisation.
    if d.min_cpus_per_node > 0 && d.min_cpus_per_node < d.cpus_per_task {
        d.min_cpus_per_node = d.cpus_per_task;
    }

    // Invariant 3: mem-per-node/mem-per-cpu mutual-exclusion reconciliation.
    if d.mem_per_node > 0 && d.mem_per_cpu > 0 && d.mem_per_node < d.mem_per_cpu {
        info!(
            "raising mem_per_node ({}) to mem_per_cpu ({})",
            d.mem_per_node, d.mem_per_cpu
        );
        d.mem_per_node = d.mem_per_cpu;
    }

    // Invariant 4: quiet/verbose mutual exclusion.
    if d.quiet && d.verbose > 0 {
        return Err(SallocError::validation(
            "--quiet and --verbose are mutually exclusive",
        ));
    }

    // Invariant 5: nice bound, negative requires privileged uid.
    if d.nice <= -NICE_OFFSET || d.nice >= NICE_OFFSET {
        return Err(SallocError::validation(format!(
            "nice value {} out of range ({}, {})",
            d.nice, -NICE_OFFSET, NICE_OFFSET
        )));
    }
    if d.nice < 0 && d.euid.unwrap_or(d.uid) != 0 {
        return Err(SallocError::validation(
            "negative nice value requires a privileged uid",
        ));
    }

    // Invariant 6: plane-distribution layout feasibility.
    if d.distribution.node == DistLevel::Plane {
        if let Some(p) = d.distribution.plane_size {
            let (n, t) = (d.min_nodes as u64, d.ntasks as u64);
            let p = p as u64;
            if p > 0 && n > 0 && (t / p < n) && ((n - 1) * p >= t) {
                return Err(SallocError::validation(format!(
                    "plane distribution (plane={p}) cannot place {t} tasks across {n} nodes"
                )));
            }
        }
    }

    // Invariant 1: min_nodes <= max_nodes (the node-count parser already
    // guarantees this for a single `--nodes` value; re-check in case
    // later overlay passes touched the fields independently).
    if d.min_nodes > d.max_nodes {
        return Err(SallocError::validation(format!(
            "min_nodes ({}) > max_nodes ({})",
            d.min_nodes, d.max_nodes
        )));
    }

    // Command/shell substitution: no command and no-shell not set means
    // run the user's shell (or, per §4.2, a controller-configured
    // default command wrapped as `/bin/sh -c <command>` — the "default
    // command" half of this rule is resolved by the caller via
    // `RuntimeConfig`, which is not visible from this module; callers
    // that have one should fill `command` before calling this function
    // to take precedence over the shell fallback below).
    if d.command.is_empty() && !d.no_shell {
        let shell = identity.shell()?;
        d.command = vec![shell];
    }

    // job-name default: derive from command basename.
    if d.job_name.is_none() {
        if let Some(first) = d.command.first() {
            let base = first.rsplit('/').next().unwrap_or(first);
            d.job_name = Some(base.to_string());
        }
    }

    Ok(())
}

/// Invariant 7: if `node_list` is a path (contains `/`), expand it into
/// a comma-joined host list and, for `arbitrary` distribution, infer
/// task-count from the line count and node bounds from the unique host
/// count.
fn expand_hostfile_if_path(
    d: &mut JobDesc,
    hostfiles: &dyn HostfileReader,
) -> Result<(), SallocError> {
    let Some(path) = d.node_list.clone() else {
        return Ok(());
    };
    if !path.contains('/') {
        return Ok(());
    }
    let lines = hostfiles.read_lines(&path)?;
    if d.distribution.node == DistLevel::Arbitrary {
        if !d.ntasks_set {
            d.ntasks = lines.len() as u32;
        }
        let mut unique: Vec<&String> = lines.iter().collect();
        unique.sort();
        unique.dedup();
        if !d.nodes_set {
            d.min_nodes = unique.len() as u32;
            d.max_nodes = unique.len() as u32;
        }
    }
    d.node_list = Some(lines.join(","));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optmodel::job_desc::INFINITE;
    use std::collections::HashMap as Map;

    struct FixedIdentity;
    impl ProcessIdentity for FixedIdentity {
        fn uid(&self) -> u32 {
            1000
        }
        fn gid(&self) -> u32 {
            1000
        }
        fn user_name(&self) -> Result<String, SallocError> {
            Ok("tester".into())
        }
        fn cwd(&self) -> Result<String, SallocError> {
            Ok("/home/tester".into())
        }
        fn hostname(&self) -> Result<String, SallocError> {
            Ok("testhost".into())
        }
    }

    struct FixedHostfile(Vec<&'static str>);
    impl HostfileReader for FixedHostfile {
        fn read_lines(&self, _path: &str) -> Result<Vec<String>, SallocError> {
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }
    }

    fn build(argv: &[&str], env: &[(&str, &str)]) -> Result<HetJob, SallocError> {
        let argv: Vec<String> = argv.iter().map(|s| s.to_string()).collect();
        let env: Map<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        build_hetjob(&argv, &env, &FixedIdentity, &OsHostfileReader)
    }

    #[test]
    fn single_node_interactive_shell() {
        let jobs = build(&["salloc", "-N1", "-n1", "--job-name=demo", "/bin/true"], &[]).unwrap();
        assert_eq!(jobs.len(), 1);
        let d = &jobs[0];
        assert_eq!(d.min_nodes, 1);
        assert_eq!(d.max_nodes, 1);
        assert_eq!(d.ntasks, 1);
        assert_eq!(d.job_name.as_deref(), Some("demo"));
        assert_eq!(d.command, vec!["/bin/true"]);
    }

    #[test]
    fn hetjob_of_two_has_consecutive_descriptors_and_shared_name() {
        let jobs = build(
            &[
                "salloc", "-N2", "-n2", ":", "-N4", "-n8", "--job-name=second", "/bin/true",
            ],
            &[],
        )
        .unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!((jobs[0].min_nodes, jobs[0].max_nodes, jobs[0].ntasks), (2, 2, 2));
        assert_eq!((jobs[1].min_nodes, jobs[1].max_nodes, jobs[1].ntasks), (4, 4, 8));
        assert_eq!(jobs[0].job_name.as_deref(), Some("second"));
        assert_eq!(jobs[1].job_name.as_deref(), Some("second"));
    }

    #[test]
    fn ntasks_set_below_min_nodes_shrinks_min_nodes_with_a_warning_not_an_error() {
        // Nodes come from a hostfile (so `nodes_set` stays false) while
        // `ntasks` is explicitly smaller than the resulting node count.
        let argv: Vec<String> = ["salloc", "-w", "/tmp/hostfile.example", "-n1", "/bin/true"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let env: Map<String, String> = Map::new();
        let segments = argv::split_hetjob_argv(&argv);
        let parsed = SallocArgs::try_parse_from(&segments[0]).unwrap();
        let mut merged = defaults::defaults(&FixedIdentity).unwrap();
        merged.merge(apply_env_overlay(&env));
        merged.merge(argv::apply_argv(&parsed).unwrap());
        let mut d = merged.freeze().unwrap();
        d.node_list = None; // bypass hostfile expansion, set nodes directly
        d.min_nodes = 4;
        d.max_nodes = 4;
        infer_and_validate(&mut d, &FixedIdentity, &FixedHostfile(vec!["a", "b"])).unwrap();
        assert_eq!(d.min_nodes, 1);
        assert_eq!(d.max_nodes, 1);
    }

    #[test]
    fn nodes_set_without_ntasks_multiplies_by_sockets_per_node() {
        let jobs = build(
            &["salloc", "-N2", "--sockets-per-node=2", "/bin/true"],
            &[],
        )
        .unwrap();
        assert_eq!(jobs[0].ntasks, 4);
        assert!(jobs[0].ntasks_set);
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        let err = build(&["salloc", "-Q", "-v", "/bin/true"], &[]).unwrap_err();
        assert!(matches!(err, SallocError::ValidationError(_)));
    }

    #[test]
    fn negative_nice_without_privilege_is_rejected() {
        let err = build(&["salloc", "--nice=-5", "/bin/true"], &[]).unwrap_err();
        assert!(matches!(err, SallocError::ValidationError(_)));
    }

    #[test]
    fn mem_per_node_raised_to_mem_per_cpu() {
        let jobs = build(
            &["salloc", "--mem=100M", "--mem-per-cpu=500M", "/bin/true"],
            &[],
        )
        .unwrap();
        assert_eq!(jobs[0].mem_per_node, 500);
    }

    #[test]
    fn no_command_and_no_no_shell_substitutes_shell() {
        let jobs = build(&["salloc", "-N1"], &[]).unwrap();
        assert_eq!(jobs[0].command, vec!["/bin/sh".to_string()]);
    }

    #[test]
    fn job_name_defaults_to_command_basename() {
        let jobs = build(&["salloc", "/usr/bin/myapp", "--flag"], &[]).unwrap();
        assert_eq!(jobs[0].job_name.as_deref(), Some("myapp"));
    }

    #[test]
    fn time_limit_zero_maps_to_infinite() {
        let jobs = build(&["salloc", "--time=0", "/bin/true"], &[]).unwrap();
        assert_eq!(jobs[0].time_limit, INFINITE);
    }

    #[test]
    fn plane_distribution_with_insufficient_tasks_is_rejected() {
        let err = build(
            &[
                "salloc",
                "-N4",
                "-n2",
                "--distribution=plane=4",
                "/bin/true",
            ],
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, SallocError::ValidationError(_)));
    }
}

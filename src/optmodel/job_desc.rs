//! The allocation-request descriptor (§3 of the allocation protocol
//! design) and the heterogeneous-job list that is its canonical form.

use crate::parsers::{Distribution, MailType};
use std::time::Duration;

/// Sentinel for "not set" on numeric fields that are conceptually
/// unsigned but need a tri-state (unset / explicit-zero / positive).
pub const NO_VAL: u32 = u32::MAX;

/// `INFINITE` sentinel for time-limit-like fields (minutes).
pub const INFINITE: u32 = u32::MAX;

/// Bound on the signed `nice` offset; negative values beyond
/// `-NICE_OFFSET` (exclusive) require a privileged uid.
pub const NICE_OFFSET: i32 = 10_000;

/// Tri-state oversubscription request (`-s/--share` vs `--exclusive`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sharing {
    /// Neither flag was given; use the partition default.
    #[default]
    Unset,
    /// `-s/--share`: allow the allocation to be shared.
    Shared,
    /// `--exclusive`: require exclusive node access.
    Exclusive,
}

/// Bell policy for the "allocation granted" notification (§3 I/O).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BellPolicy {
    /// Always ring the terminal bell on grant.
    Always,
    /// Never ring the bell.
    Never,
    /// Ring the bell only if the wait exceeded a configured delay.
    #[default]
    AfterDelay,
}

/// `--get-user-env` tri-state: not requested, requested with an
/// optional staleness timeout, and login-vs-non-login shell selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GetUserEnv {
    /// Flag absent.
    #[default]
    Disabled,
    /// Requested; `timeout` is the `N` in `--get-user-env=N[sl]`
    /// (`None` if bare), `login_shell` true for the `l` suffix.
    Enabled {
        /// Optional staleness timeout in seconds.
        timeout: Option<u32>,
        /// `s` suffix: use a login shell.
        login_shell: bool,
    },
}

/// One allocation-request descriptor — one hetjob component.
///
/// Every field that can be legitimately absent is `Option<T>`; fields
/// that always have a value after default-fill use the bare type with
/// `NO_VAL`/`INFINITE` sentinels where the source protocol itself uses
/// sentinels (matching §3's "each is either unset... or a positive
/// integer").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDesc {
    // Identity
    /// Submitting user's uid.
    pub uid: u32,
    /// Submitting user's gid.
    pub gid: u32,
    /// Effective uid override (`--uid`), when privileged.
    pub euid: Option<u32>,
    /// Effective gid override (`--gid`), when privileged.
    pub egid: Option<u32>,
    /// Resolved user name.
    pub user_name: String,
    /// Host the request was submitted from.
    pub submit_host: String,
    /// Directory the request was submitted from.
    pub submit_dir: String,

    // Sizing
    /// Requested task count.
    pub ntasks: u32,
    /// Whether `ntasks` was explicitly set (affects inference).
    pub ntasks_set: bool,
    /// Minimum node count.
    pub min_nodes: u32,
    /// Maximum node count.
    pub max_nodes: u32,
    /// Whether node counts were explicitly set.
    pub nodes_set: bool,
    /// CPUs requested per task.
    pub cpus_per_task: u32,
    /// Tasks requested per node (0 = unset).
    pub ntasks_per_node: u32,
    /// Tasks requested per socket (0 = unset).
    pub ntasks_per_socket: u32,
    /// Tasks requested per core (0 = unset).
    pub ntasks_per_core: u32,
    /// Sockets requested per node (0 = unset).
    pub sockets_per_node: u32,
    /// Cores requested per socket (0 = unset).
    pub cores_per_socket: u32,
    /// Threads requested per core (0 = unset).
    pub threads_per_core: u32,
    /// Minimum CPUs required per node (0 = unset).
    pub min_cpus_per_node: u32,

    // Memory / storage (MB)
    /// Memory requested per node in MB (0 = unset).
    pub mem_per_node: u64,
    /// Memory requested per CPU in MB (0 = unset).
    pub mem_per_cpu: u64,
    /// Temporary disk space requested in MB.
    pub tmp_disk: u64,

    // Scheduling
    /// Target partition.
    pub partition: Option<String>,
    /// Target QOS.
    pub qos: Option<String>,
    /// Charge account.
    pub account: Option<String>,
    /// Advance reservation name.
    pub reservation: Option<String>,
    /// Workflow key.
    pub wckey: Option<String>,
    /// Dependency expression.
    pub dependency: Option<String>,
    /// Absolute scheduling priority override.
    pub priority: Option<u32>,
    /// Signed niceness offset, bounded by [`NICE_OFFSET`].
    pub nice: i32,
    /// Earliest time the job may start (unix seconds).
    pub begin_time: Option<u64>,
    /// Deadline (unix seconds).
    pub deadline: Option<u64>,
    /// Time limit in minutes, [`INFINITE`] for no limit.
    pub time_limit: u32,
    /// Minimum acceptable time limit in minutes, [`INFINITE`] if unset.
    pub time_min: u32,
    /// `immediate=N`: fail unless granted within N seconds (0 = not
    /// immediate, matching a bare `--immediate` with no number to "1").
    pub immediate_seconds: Option<u32>,
    /// Submit the job held.
    pub hold: bool,
    /// Allow requeue on node failure.
    pub requeue: bool,
    /// `-s/--share` vs `--exclusive`.
    pub sharing: Sharing,

    // Topology
    /// System-dependent geometry vector.
    pub geometry: Vec<u32>,
    /// Connection-type vector (one per geometry dimension).
    pub conn_type: Vec<String>,
    /// Disable node rotation.
    pub no_rotate: bool,
    /// Request that nodes reboot before the allocation starts.
    pub reboot: bool,

    // Placement
    /// Required node list (or hostfile path before expansion).
    pub node_list: Option<String>,
    /// Excluded node list.
    pub exclude_list: Option<String>,
    /// Require contiguous nodes.
    pub contiguous: bool,
    /// Feature constraint expression.
    pub constraint: Option<String>,
    /// License list.
    pub licenses: Option<String>,
    /// Reserved cores for specialized services.
    pub core_spec: Option<u32>,
    /// Whether `core_spec` counts threads instead of cores.
    pub core_spec_is_threads: bool,
    /// Network topology hint string.
    pub network: Option<String>,
    /// Generic-resource request string (already `tres`-prefixed).
    pub gres: Option<String>,
    /// `--switches=N[@time]` network-topology switch count.
    pub switches: Option<u32>,
    /// Optional wait cap (seconds) paired with `switches`.
    pub switches_wait: Option<u32>,

    // Distribution
    /// Task-distribution layout.
    pub distribution: Distribution,

    // Command
    /// Job name.
    pub job_name: Option<String>,
    /// Working directory for the user command.
    pub chdir: Option<String>,
    /// Environment variable names to propagate verbatim.
    pub export_env: Vec<String>,
    /// Plugin-contributed (`SLURM_SPANK_*`) job environment.
    pub spank_env: Vec<(String, String)>,
    /// `--get-user-env` request.
    pub get_user_env: GetUserEnv,

    // I/O
    /// Bell policy on grant.
    pub bell: BellPolicy,
    /// Signal sent to the user command on revocation/time-limit.
    pub kill_command_signal: i32,
    /// Suppress the shell wrapper entirely.
    pub no_shell: bool,
    /// Wait for every node to report ready before proceeding.
    pub wait_all_nodes: Option<bool>,
    /// Mail-notification mask.
    pub mail_type: MailType,
    /// Mail recipient address.
    pub mail_user: Option<String>,
    /// Suppress informational diagnostics.
    pub quiet: bool,
    /// Verbosity level (0-4).
    pub verbose: u8,
    /// Memory-binding policy string (`--mem-bind`), exported to the
    /// child as `SLURM_MEM_BIND` when set.
    pub mem_bind: Option<String>,
    /// Accounting profile name (`--profile`), exported as
    /// `SLURM_PROFILE` when set.
    pub profile: Option<String>,
    /// Free-text annotation (`--comment`); carried through to the
    /// controller, not exported to the child environment.
    pub comment: Option<String>,
    /// `-k/--no-kill`: do not kill the whole allocation on a single
    /// node failure.
    pub no_kill: bool,

    // The command to run, resolved after overlay/inference.
    /// Argv of the user command (empty until inference fills it in).
    pub command: Vec<String>,
}

impl JobDesc {
    /// Readiness-poll backoff bound of §4.4:
    /// `min(5*(suspend_timeout+resume_timeout), 300s)`.
    pub fn readiness_budget(suspend_timeout: Duration, resume_timeout: Duration) -> Duration {
        let bound = (suspend_timeout + resume_timeout) * 5;
        bound.min(Duration::from_secs(300))
    }
}

/// A complete allocation request: one or more descriptors for a
/// heterogeneous job, in submission order. §9's design note: "the list
/// form as the canonical data structure... the single-descriptor case
/// as 'a list of one'."
pub type HetJob = Vec<JobDesc>;

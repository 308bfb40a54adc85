//! Command-line arguments for `salloc`, one allocation-request
//! descriptor's worth. A full invocation may carry several of these
//! separated by a bare `:` token for a heterogeneous job — see
//! [`crate::optmodel::argv::split_hetjob_argv`].

use clap::Parser;

/// One allocation-request component's command-line arguments.
///
/// The short/long forms mirror §6 of the allocation protocol design.
/// Every option feeds [`crate::optmodel::argv::apply_argv`], which runs
/// the same typed setters the environment overlay uses.
#[derive(Parser, Debug, Clone)]
#[command(name = "salloc", disable_version_flag = true)]
pub struct SallocArgs {
    /// Charge resources to the specified account.
    #[arg(short = 'A', long)]
    pub account: Option<String>,

    /// Extra node-info tuple `S[:C[:T]]`.
    #[arg(short = 'B', long = "extra-node-info")]
    pub extra_node_info: Option<String>,

    /// CPUs required per task.
    #[arg(short = 'c', long)]
    pub cpus_per_task: Option<u32>,

    /// Feature constraint expression.
    #[arg(short = 'C', long)]
    pub constraint: Option<String>,

    /// Defer allocation until dependency is satisfied.
    #[arg(short = 'd', long)]
    pub dependency: Option<String>,

    /// Working directory for the user command.
    #[arg(short = 'D', long)]
    pub chdir: Option<String>,

    /// Node list hostfile path.
    #[arg(short = 'F', long = "nodefile")]
    pub nodefile: Option<String>,

    /// System-dependent geometry vector.
    #[arg(short = 'g', long)]
    pub geometry: Option<String>,

    /// Submit the allocation held.
    #[arg(short = 'H', long)]
    pub hold: bool,

    /// Exit unless granted within N seconds (default 1 if bare).
    #[arg(short = 'I', long, num_args = 0..=1, default_missing_value = "1")]
    pub immediate: Option<u32>,

    /// Job name.
    #[arg(short = 'J', long = "job-name")]
    pub job_name: Option<String>,

    /// Do not automatically kill the job on node failure.
    #[arg(short = 'k', long = "no-kill")]
    pub no_kill: bool,

    /// Signal to send the user command on revocation.
    #[arg(short = 'K', long = "kill-command", num_args = 0..=1, default_missing_value = "TERM")]
    pub kill_command: Option<String>,

    /// Comma-separated license list.
    #[arg(short = 'L', long)]
    pub licenses: Option<String>,

    /// Task-distribution spec.
    #[arg(short = 'm', long = "distribution")]
    pub distribution: Option<String>,

    /// Requested task count.
    #[arg(short = 'n', long = "ntasks")]
    pub ntasks: Option<u32>,

    /// Requested node count (`N` or `min-max`).
    #[arg(short = 'N', long = "nodes")]
    pub nodes: Option<String>,

    /// Overcommit resources.
    #[arg(short = 'O', long)]
    pub overcommit: bool,

    /// Target partition.
    #[arg(short = 'p', long)]
    pub partition: Option<String>,

    /// Suppress informational messages.
    #[arg(short = 'Q', long)]
    pub quiet: bool,

    /// Disallow node rotation.
    #[arg(short = 'R', long = "no-rotate")]
    pub no_rotate: bool,

    /// Allow the allocation to share nodes.
    #[arg(short = 's', long)]
    pub share: bool,

    /// Reserved core-spec count.
    #[arg(short = 'S', long = "core-spec")]
    pub core_spec: Option<u32>,

    /// Time limit.
    #[arg(short = 't', long = "time")]
    pub time: Option<String>,

    /// Increase verbosity (repeatable, up to 4 times).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Required node list.
    #[arg(short = 'w', long = "nodelist")]
    pub nodelist: Option<String>,

    /// Excluded node list.
    #[arg(short = 'x', long = "exclude")]
    pub exclude: Option<String>,

    /// Earliest start time.
    #[arg(long)]
    pub begin: Option<String>,

    /// Ring the terminal bell on grant.
    #[arg(long, conflicts_with = "no_bell")]
    pub bell: bool,

    /// Never ring the terminal bell on grant.
    #[arg(long = "no-bell")]
    pub no_bell: bool,

    /// Free-form comment.
    #[arg(long)]
    pub comment: Option<String>,

    /// Connection-type list.
    #[arg(long = "conn-type")]
    pub conn_type: Option<String>,

    /// Require contiguous nodes.
    #[arg(long)]
    pub contiguous: bool,

    /// Cores requested per socket.
    #[arg(long = "cores-per-socket")]
    pub cores_per_socket: Option<u32>,

    /// Deadline.
    #[arg(long)]
    pub deadline: Option<String>,

    /// Require exclusive node access.
    #[arg(long)]
    pub exclusive: bool,

    /// Fetch the remote user environment; optional `N[sl]` suffix.
    #[arg(long = "get-user-env", num_args = 0..=1, default_missing_value = "")]
    pub get_user_env: Option<String>,

    /// Effective gid override.
    #[arg(long)]
    pub gid: Option<u32>,

    /// Generic-resource request string.
    #[arg(long)]
    pub gres: Option<String>,

    /// Memory-affinity hint.
    #[arg(long)]
    pub hint: Option<String>,

    /// Notice of an existing job id (does not attach to it).
    #[arg(long)]
    pub jobid: Option<u32>,

    /// Mail-notification type list.
    #[arg(long = "mail-type")]
    pub mail_type: Option<String>,

    /// Mail recipient address.
    #[arg(long = "mail-user")]
    pub mail_user: Option<String>,

    /// Memory requested per node.
    #[arg(long)]
    pub mem: Option<String>,

    /// Memory-binding policy.
    #[arg(long = "mem-bind")]
    pub mem_bind: Option<String>,

    /// Memory requested per CPU.
    #[arg(long = "mem-per-cpu")]
    pub mem_per_cpu: Option<String>,

    /// Network topology hint.
    #[arg(long)]
    pub network: Option<String>,

    /// Signed niceness offset; bare flag means `100`.
    #[arg(long, num_args = 0..=1, default_missing_value = "100", allow_hyphen_values = true)]
    pub nice: Option<i32>,

    /// Suppress the shell wrapper entirely.
    #[arg(long = "no-shell")]
    pub no_shell: bool,

    /// Tasks requested per core.
    #[arg(long = "ntasks-per-core")]
    pub ntasks_per_core: Option<u32>,

    /// Tasks requested per node.
    #[arg(long = "ntasks-per-node")]
    pub ntasks_per_node: Option<u32>,

    /// Tasks requested per socket.
    #[arg(long = "ntasks-per-socket")]
    pub ntasks_per_socket: Option<u32>,

    /// Absolute scheduling priority.
    #[arg(long)]
    pub priority: Option<u32>,

    /// Accounting-profile selector.
    #[arg(long)]
    pub profile: Option<String>,

    /// Target QOS.
    #[arg(long)]
    pub qos: Option<String>,

    /// Reboot nodes before the allocation starts.
    #[arg(long)]
    pub reboot: bool,

    /// Advance reservation name.
    #[arg(long)]
    pub reservation: Option<String>,

    /// `[B:]signal[@seconds]` warning-signal spec.
    #[arg(long)]
    pub signal: Option<String>,

    /// Sockets requested per node.
    #[arg(long = "sockets-per-node")]
    pub sockets_per_node: Option<u32>,

    /// `N[@time]` network-switch hint.
    #[arg(long)]
    pub switches: Option<String>,

    /// Threads requested per core.
    #[arg(long = "threads-per-core")]
    pub threads_per_core: Option<u32>,

    /// Minimum acceptable time limit.
    #[arg(long = "time-min")]
    pub time_min: Option<String>,

    /// Temporary disk space requested.
    #[arg(long)]
    pub tmp: Option<String>,

    /// Effective uid override.
    #[arg(long)]
    pub uid: Option<u32>,

    /// Wait for every node to report ready (`0`/`1`).
    #[arg(long = "wait-all-nodes")]
    pub wait_all_nodes: Option<u8>,

    /// Workflow key.
    #[arg(long)]
    pub wckey: Option<String>,

    /// Print version and exit.
    #[arg(short = 'V', long)]
    pub version: bool,

    /// The user command and its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

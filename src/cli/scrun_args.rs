//! Command-line arguments for `scrun`, the OCI container runtime
//! front-end (§4.6). Verb dispatch lives in [`crate::container`]; this
//! module only holds the `clap` surface.

use clap::{Parser, Subcommand};

/// Global `scrun` arguments plus the OCI verb subcommand.
#[derive(Parser, Debug)]
#[command(name = "scrun", disable_version_flag = true)]
pub struct ScrunArgs {
    /// Runtime root directory; overrides the `$XDG_RUNTIME_DIR` /
    /// `/run/user/$UID` / `$TMPDIR/$UID` autodetection of §4.6.
    #[arg(long)]
    pub root: Option<String>,

    /// Write logs to this path instead of stderr.
    #[arg(long)]
    pub log: Option<String>,

    /// Log output format (`text` or `json`; defaults to `json` when
    /// `--log` is set without an explicit format, per §4.6).
    #[arg(long = "log-format")]
    pub log_format: Option<String>,

    /// Raise the stderr log level to debug.
    #[arg(long)]
    pub debug: bool,

    /// Increase verbosity; may be repeated.
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Accepted and ignored, per §6 (cgroup management is out of scope).
    #[arg(long = "cgroup-manager")]
    pub cgroup_manager: Option<String>,

    /// Accepted and ignored, per §6.
    #[arg(long)]
    pub rootless: Option<String>,

    /// Accepted and ignored, per §6.
    #[arg(long = "systemd-cgroup")]
    pub systemd_cgroup: bool,

    #[command(subcommand)]
    pub command: ScrunCommand,
}

/// One of the six OCI runtime verbs of §4.6.
#[derive(Subcommand, Debug)]
pub enum ScrunCommand {
    /// Load the bundle, record container state, spawn the anchor.
    Create {
        /// Path to the OCI bundle directory.
        #[arg(long)]
        bundle: String,

        /// Unix socket to forward the container's console to. Recorded
        /// but not acted upon (bundle filesystem manipulation is out of
        /// scope per spec.md's non-goals).
        #[arg(long = "console-socket")]
        console_socket: Option<String>,

        /// Path to write the anchor's pid to. Recorded only.
        #[arg(long = "pid-file")]
        pid_file: Option<String>,

        /// Accepted and recorded only.
        #[arg(long = "no-pivot")]
        no_pivot: bool,

        /// Accepted and recorded only.
        #[arg(long = "no-new-keyring")]
        no_new_keyring: bool,

        /// Accepted and recorded only.
        #[arg(long = "preserve-fds")]
        preserve_fds: Option<u32>,

        /// Container id.
        id: String,
    },
    /// Request that the anchor start the container's process.
    Start {
        /// Container id.
        id: String,
    },
    /// Emit the container's current OCI state as JSON.
    State {
        /// Container id.
        id: String,
    },
    /// Signal the container (or its backing job, on transport failure).
    Kill {
        /// Container id.
        id: String,

        /// Signal to send; defaults to `SIGTERM`.
        signal: Option<String>,
    },
    /// Tear down the container's state.
    Delete {
        /// Treat an unreachable anchor as already-deleted.
        #[arg(long)]
        force: bool,

        /// Container id.
        id: String,
    },
    /// Print the runtime and OCI spec versions.
    Version,
}

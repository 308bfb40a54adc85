//! Command-line arguments for `slurm-update-job` (§4.7), the job-update
//! client. The positional list is a stream of `Key=Value`/`Key+=Value`/
//! `Key-=Value` tokens; parsing that grammar is
//! [`crate::jobupdate::fields::parse_tokens`]'s job, not clap's.

use clap::Parser;

/// Top-level `slurm-update-job` arguments.
#[derive(Parser, Debug)]
#[command(name = "slurm-update-job", disable_version_flag = true)]
pub struct UpdateArgs {
    /// Submit the update on behalf of another user (requires privilege
    /// the client does not itself check).
    #[arg(long = "uid")]
    pub uid: Option<String>,

    /// Suppress per-id error lines on partial failure.
    #[arg(long)]
    pub quiet: bool,

    /// `Key=Value` / `Key+=Value` / `Key-=Value` update tokens.
    #[arg(required = true)]
    pub tokens: Vec<String>,
}

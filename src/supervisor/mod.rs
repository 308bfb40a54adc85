//! Supervisor (C5): fork/exec of the user command, terminal handoff,
//! and the `waitpid` reaping loop of §4.5.

pub mod process;
pub mod terminal;

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc};

use nix::sys::signal::Signal;

use crate::client::SupervisorMsg;
use crate::error::SallocResult;

use terminal::InteractiveSession;

/// Outcome of running one interactive allocation's command.
pub struct SupervisorOutcome {
    pub exit_code: i32,
}

/// Run the fork/exec/wait cycle for an already-granted allocation.
/// `kill_command_signal` and `no_shell`/`allow_background` come from
/// the granted job descriptor's §3 fields.
pub fn run(
    command: &[String],
    env: &HashMap<String, String>,
    no_shell: bool,
    allow_background: bool,
    kill_command_signal: i32,
    sup_rx: mpsc::Receiver<SupervisorMsg>,
) -> SallocResult<SupervisorOutcome> {
    let session = InteractiveSession::enter(no_shell, allow_background)?;
    let child = process::spawn_child(command, env)?;
    session.handoff_to_child(child)?;

    let suspended = Arc::new(AtomicBool::new(false));
    let sig = Signal::try_from(kill_command_signal).unwrap_or(Signal::SIGTERM);
    let watcher = process::spawn_revocation_watcher(sup_rx, child, sig, Arc::clone(&suspended));

    let exit_code = process::wait_for_child(child, &suspended)?;
    session.reclaim()?;
    drop(watcher);

    Ok(SupervisorOutcome { exit_code })
}

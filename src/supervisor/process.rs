//! Fork/exec and the `waitpid` reaping loop of §4.5, plus the
//! concurrent revocation watcher that reacts to
//! [`crate::client::SupervisorMsg`] without ever being called directly
//! by the listener thread (§9 design note).

use std::collections::HashMap;
use std::ffi::CString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use nix::errno::Errno;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};

use crate::client::SupervisorMsg;
use crate::error::{SallocError, SallocResult};

/// Resolve `program` along `PATH`, or accept it as-is if it contains a
/// path separator (relative or absolute).
fn resolve_in_path(program: &str) -> SallocResult<CString> {
    if program.contains('/') {
        return CString::new(program)
            .map_err(|e| SallocError::Internal(format!("nul byte in command: {e}")));
    }
    let path_var = std::env::var("PATH").unwrap_or_default();
    for dir in path_var.split(':') {
        let candidate = if dir.is_empty() {
            program.to_string()
        } else {
            format!("{dir}/{program}")
        };
        if std::fs::metadata(&candidate).map(|m| m.is_file()).unwrap_or(false) {
            return CString::new(candidate)
                .map_err(|e| SallocError::Internal(format!("nul byte in command: {e}")));
        }
    }
    CString::new(program.to_string())
        .map_err(|e| SallocError::Internal(format!("nul byte in command: {e}")))
}

/// Fork and exec `command` with `env` propagated verbatim. The child
/// sets its own pgrp, resets job-control signals to default (leaving
/// `SIGTSTP` ignored so the child's own shell can install its own
/// handler), then execs.
pub fn spawn_child(command: &[String], env: &HashMap<String, String>) -> SallocResult<Pid> {
    if command.is_empty() {
        return Err(SallocError::Internal("empty command to supervisor".to_string()));
    }
    match unsafe { unistd::fork() } {
        Ok(ForkResult::Child) => {
            let _ = unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0));
            for sig in [Signal::SIGINT, Signal::SIGQUIT, Signal::SIGTTIN, Signal::SIGTTOU] {
                unsafe {
                    let _ = signal::signal(sig, SigHandler::SigDfl);
                }
            }

            let program = match resolve_in_path(&command[0]) {
                Ok(p) => p,
                Err(_) => std::process::exit(127),
            };
            let argv: Vec<CString> = command
                .iter()
                .map(|a| CString::new(a.as_str()).unwrap_or_else(|_| CString::new("").unwrap()))
                .collect();
            let envp: Vec<CString> = env
                .iter()
                .map(|(k, v)| CString::new(format!("{k}={v}")).unwrap_or_else(|_| CString::new("").unwrap()))
                .collect();

            let _ = unistd::execve(&program, &argv, &envp);
            // execve only returns on failure.
            std::process::exit(127);
        }
        Ok(ForkResult::Parent { child }) => Ok(child),
        Err(e) => Err(SallocError::Other(anyhow::anyhow!("fork failed: {e}"))),
    }
}

/// Outcome of the child's death, already mapped to an exit code per the
/// table in §4.5.
fn exit_code_for(status: WaitStatus) -> Option<i32> {
    match status {
        WaitStatus::Exited(_, code) => Some(code),
        WaitStatus::Signaled(_, sig, _) => Some(if matches!(
            sig,
            Signal::SIGHUP | Signal::SIGINT | Signal::SIGQUIT | Signal::SIGKILL
        ) {
            0
        } else {
            1
        }),
        _ => None,
    }
}

/// Blocking `waitpid` loop (§4.5): restarted on `EINTR`; a stopped
/// child is killed outright and treated as an exit.
pub fn wait_for_child(child: Pid, suspended: &AtomicBool) -> SallocResult<i32> {
    loop {
        match waitpid(child, Some(WaitPidFlag::WUNTRACED)) {
            Ok(WaitStatus::Stopped(_, _)) => {
                suspended.store(true, Ordering::SeqCst);
                if let Ok(pgrp) = unistd::getpgid(Some(child)) {
                    let _ = signal::killpg(pgrp, Signal::SIGKILL);
                }
                return Ok(1);
            }
            Ok(status) => {
                if let Some(code) = exit_code_for(status) {
                    return Ok(code);
                }
                // PtraceEvent/Continued/etc: keep waiting.
            }
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(SallocError::Other(anyhow::anyhow!("waitpid failed: {e}"))),
        }
    }
}

/// Applies the kill policy of §4.5 when a job-complete notice arrives
/// while the child is still alive: forward `SIGHUP` to a deeper
/// foreground group if the child re-parented its own, then send the
/// configured kill-command signal to the child's pgrp, prefixed with
/// `SIGCONT` if the child was previously observed stopped.
fn apply_revocation_kill(child: Pid, kill_command_signal: Signal, suspended: &AtomicBool) {
    match waitpid(child, Some(WaitPidFlag::WNOHANG)) {
        Ok(WaitStatus::StillAlive) => {}
        _ => return, // already reaped or stopped; the main loop owns it
    }

    let fd = unsafe { std::os::fd::BorrowedFd::borrow_raw(0) };
    if let Ok(fg_pgrp) = unistd::tcgetpgrp(fd) {
        if fg_pgrp != child {
            let _ = signal::killpg(fg_pgrp, Signal::SIGHUP);
        }
    }

    if let Ok(pgrp) = unistd::getpgid(Some(child)) {
        if suspended.swap(false, Ordering::SeqCst) {
            let _ = signal::killpg(pgrp, Signal::SIGCONT);
        }
        let _ = signal::killpg(pgrp, kill_command_signal);
    }
}

/// Spawn the thread that drains `sup_rx` for the lifetime of the
/// child, applying the revocation kill policy on `Revoked` and
/// otherwise just observing `TimeoutNotice`/`Kill` messages.
pub fn spawn_revocation_watcher(
    sup_rx: mpsc::Receiver<SupervisorMsg>,
    child: Pid,
    kill_command_signal: Signal,
    suspended: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for msg in sup_rx {
            match msg {
                SupervisorMsg::Revoked => {
                    apply_revocation_kill(child, kill_command_signal, &suspended);
                }
                SupervisorMsg::Kill(raw_sig) => {
                    if let (Ok(pgrp), Ok(sig)) = (unistd::getpgid(Some(child)), Signal::try_from(raw_sig)) {
                        let _ = signal::killpg(pgrp, sig);
                    }
                }
                SupervisorMsg::TimeoutNotice(_) => {}
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_maps_user_driven_signals_to_zero() {
        let status = WaitStatus::Signaled(Pid::from_raw(1), Signal::SIGINT, false);
        assert_eq!(exit_code_for(status), Some(0));
    }

    #[test]
    fn exit_code_maps_other_signals_to_one() {
        let status = WaitStatus::Signaled(Pid::from_raw(1), Signal::SIGSEGV, false);
        assert_eq!(exit_code_for(status), Some(1));
    }

    #[test]
    fn exit_code_propagates_normal_exit_status() {
        let status = WaitStatus::Exited(Pid::from_raw(1), 42);
        assert_eq!(exit_code_for(status), Some(42));
    }
}

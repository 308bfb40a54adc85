//! Terminal handoff (§4.5): an RAII guard standing in for the source's
//! `atexit` hook. Entering interactive mode saves the controlling
//! terminal's attributes and claims the foreground process group for
//! this process; [`InteractiveSession::handoff_to_child`] transfers the
//! foreground group to the child pid once the allocation is granted,
//! and [`InteractiveSession::reclaim`] takes it back. Dropping the
//! guard restores both the terminal attributes and the foreground
//! group, regardless of which exit path ran.

use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::termios::{self, Termios};
use nix::unistd::{self, Pid};
use std::os::fd::{AsFd, BorrowedFd};

use crate::error::{SallocError, SallocResult};

/// The conditions of §4.5 under which interactive mode is entered:
/// stdin has valid terminal attributes, the terminal's foreground pgrp
/// is non-negative, `--no-shell` is absent, this process is its own
/// pgrp leader, and (the foreground pgrp equals our pid, or background
/// execution is explicitly allowed).
pub fn is_interactive(no_shell: bool, allow_background: bool) -> bool {
    if no_shell {
        return false;
    }
    let stdin = std::io::stdin();
    let fd = stdin.as_fd();
    let Ok(_attrs) = termios::tcgetattr(fd) else {
        return false;
    };
    let Ok(fg_pgrp) = unistd::tcgetpgrp(fd) else {
        return false;
    };
    if fg_pgrp.as_raw() < 0 {
        return false;
    }
    let pid = unistd::getpid();
    let Ok(own_pgrp) = unistd::getpgid(None) else {
        return false;
    };
    if own_pgrp != pid {
        return false;
    }
    fg_pgrp == pid || allow_background
}

/// RAII guard for an interactive allocation's terminal state.
pub struct InteractiveSession {
    active: bool,
    saved: Option<Termios>,
    own_pid: Pid,
}

impl InteractiveSession {
    fn stdin_fd() -> BorrowedFd<'static> {
        // Safe for the lifetime of the process: fd 0 is never closed by
        // this crate.
        unsafe { BorrowedFd::borrow_raw(0) }
    }

    /// Enter interactive mode if the preconditions hold; otherwise
    /// returns an inactive guard whose methods are no-ops.
    pub fn enter(no_shell: bool, allow_background: bool) -> SallocResult<Self> {
        if !is_interactive(no_shell, allow_background) {
            return Ok(InteractiveSession {
                active: false,
                saved: None,
                own_pid: unistd::getpid(),
            });
        }
        let fd = Self::stdin_fd();
        let saved = termios::tcgetattr(fd).ok();
        let own_pid = unistd::getpid();

        // SIG_IGN for SIGTSTP/SIGTTIN/SIGTTOU in the parent (§4.5), and
        // block SIGTTIN/SIGTTOU specifically around the tcsetpgrp call
        // below so claiming the foreground group cannot stop us.
        for sig in [Signal::SIGTSTP, Signal::SIGTTIN, Signal::SIGTTOU] {
            unsafe {
                let _ = signal::signal(sig, SigHandler::SigIgn);
            }
        }
        let _ = unistd::tcsetpgrp(fd, own_pid);

        Ok(InteractiveSession {
            active: true,
            saved,
            own_pid,
        })
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Hand the foreground process group to the child once the
    /// allocation is granted.
    pub fn handoff_to_child(&self, child: Pid) -> SallocResult<()> {
        if !self.active {
            return Ok(());
        }
        unistd::tcsetpgrp(Self::stdin_fd(), child)
            .map_err(|e| SallocError::Other(anyhow::anyhow!("tcsetpgrp(child) failed: {e}")))
    }

    /// Reclaim the foreground process group for this process, e.g.
    /// after the child exits.
    pub fn reclaim(&self) -> SallocResult<()> {
        if !self.active {
            return Ok(());
        }
        unistd::tcsetpgrp(Self::stdin_fd(), self.own_pid)
            .map_err(|e| SallocError::Other(anyhow::anyhow!("tcsetpgrp(self) failed: {e}")))
    }
}

impl Drop for InteractiveSession {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        let _ = self.reclaim();
        if let Some(saved) = &self.saved {
            let _ = termios::tcsetattr(Self::stdin_fd(), termios::SetArg::TCSANOW, saved);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_shell_is_never_interactive() {
        assert!(!is_interactive(true, true));
    }
}

//! Self-pipe cancellation for the submit-wait phase (§4.4/§5): a fixed
//! signal set flips an "interrupted" flag that the blocking submit/wait
//! loop observes between attempts. Signal handlers use async-signal-safe
//! primitives only (§5): the handler here does nothing but `write(2)` a
//! single byte to the pipe.
//!
//! The listener thread does not install signal handlers (§4.4); this is
//! strictly the foreground allocator thread's concern.

use std::os::fd::{IntoRawFd, RawFd};
use std::sync::atomic::{AtomicI32, Ordering};

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd;

use crate::error::{SallocError, SallocResult};

static SELF_PIPE_WRITE_FD: AtomicI32 = AtomicI32::new(-1);

/// The pre-installed terminating/interrupting set of §4.4: `{HUP, INT,
/// QUIT, PIPE, TERM, USR1, USR2}`.
const SIGNALS: [Signal; 7] = [
    Signal::SIGHUP,
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGPIPE,
    Signal::SIGTERM,
    Signal::SIGUSR1,
    Signal::SIGUSR2,
];

extern "C" fn on_signal(_raw: i32) {
    let fd = SELF_PIPE_WRITE_FD.load(Ordering::Relaxed);
    if fd >= 0 {
        let _ = unistd::write(unsafe { std::os::fd::BorrowedFd::borrow_raw(fd) }, &[1u8]);
    }
}

/// Owns the read end of the self-pipe and restores the previous signal
/// dispositions on drop.
pub struct CancelSignal {
    read_fd: RawFd,
    previous: Vec<(Signal, SigAction)>,
}

impl CancelSignal {
    /// Install handlers for the fixed signal set and return a guard that
    /// can be polled for "has one of them fired since the last poll".
    pub fn install() -> SallocResult<Self> {
        let (read, write) = unistd::pipe()
            .map_err(|e| SallocError::Other(anyhow::anyhow!("pipe(2) failed: {e}")))?;
        let read_fd = read.into_raw_fd();
        SELF_PIPE_WRITE_FD.store(write.into_raw_fd(), Ordering::Relaxed);

        let action = SigAction::new(SigHandler::Handler(on_signal), SaFlags::SA_RESTART, SigSet::empty());
        let mut previous = Vec::with_capacity(SIGNALS.len());
        for sig in SIGNALS {
            let old = unsafe {
                signal::sigaction(sig, &action)
                    .map_err(|e| SallocError::Other(anyhow::anyhow!("sigaction({sig}) failed: {e}")))?
            };
            previous.push((sig, old));
        }
        Ok(CancelSignal { read_fd, previous })
    }

    /// Non-blocking check: did any of the installed signals fire since
    /// the last call? Drains the pipe so repeated calls don't re-report
    /// a single delivery.
    pub fn interrupted(&self) -> bool {
        let mut buf = [0u8; 32];
        match unistd::read(self.read_fd, &mut buf) {
            Ok(n) => n > 0,
            Err(_) => false,
        }
    }

    pub fn read_fd(&self) -> RawFd {
        self.read_fd
    }
}

impl Drop for CancelSignal {
    fn drop(&mut self) {
        for (sig, old) in self.previous.drain(..) {
            unsafe {
                let _ = signal::sigaction(sig, &old);
            }
        }
        SELF_PIPE_WRITE_FD.store(-1, Ordering::Relaxed);
        let _ = unistd::close(self.read_fd);
    }
}


//! The message-listener thread of §4.4: blocks on message receive and
//! dispatches without holding any user-visible lock (§5). It never
//! calls supervisor code directly — killing the child is a message,
//! not a direct call, per the REDESIGN FLAG on listener/supervisor
//! coordination.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

use super::protocol::{ListenerMessage, SupervisorMsg};
use super::state::SharedAllocState;

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Spawn the listener thread. `rx` carries controller notices
/// ([`super::protocol::Transport::open_listener`]); `sup_tx` is the
/// one-way channel into the supervisor; `pending_cb` is the
/// `submit(descriptors, pending_cb)` callback of §4.4, invoked once per
/// **pending** notice with the job id.
pub fn spawn_listener(
    rx: mpsc::Receiver<ListenerMessage>,
    shared: Arc<SharedAllocState>,
    sup_tx: mpsc::Sender<SupervisorMsg>,
    pending_cb: Arc<dyn Fn(u32) + Send + Sync>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut last_logged_deadline: Option<u64> = None;
        let mut last_deadline: Option<u64> = None;
        for msg in rx {
            match msg {
                ListenerMessage::Pending { job_id } => {
                    pending_cb(job_id);
                }
                ListenerMessage::Timeout { deadline_unix } => {
                    last_deadline = Some(deadline_unix);
                    if last_logged_deadline != Some(deadline_unix) {
                        log::info!("salloc: job allocation deadline is {deadline_unix}");
                        last_logged_deadline = Some(deadline_unix);
                    }
                    let _ = sup_tx.send(SupervisorMsg::TimeoutNotice(deadline_unix));
                }
                ListenerMessage::UserMessage(text) => {
                    log::info!("{text}");
                }
                ListenerMessage::NodeFail { node } => {
                    log::warn!("salloc: node {node} failed");
                }
                ListenerMessage::JobComplete { job_id, .. } => {
                    let expired = last_deadline.map(|d| d <= now_unix()).unwrap_or(false);
                    if expired {
                        log::warn!("salloc: job {job_id} time-limit exceeded");
                    } else {
                        log::warn!("salloc: job {job_id} has been revoked");
                    }
                    shared.mark_revoked();
                    let _ = sup_tx.send(SupervisorMsg::Revoked);
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::state::AllocState;
    use std::sync::mpsc::channel;
    use std::time::Duration;

    #[test]
    fn job_complete_marks_shared_state_revoked_and_notifies_supervisor() {
        let (tx, rx) = channel();
        let (sup_tx, sup_rx) = channel();
        let shared = Arc::new(SharedAllocState::new());
        let handle = spawn_listener(rx, Arc::clone(&shared), sup_tx, Arc::new(|_| {}));

        tx.send(ListenerMessage::JobComplete {
            job_id: 7,
            exit_status: 0,
        })
        .unwrap();
        drop(tx);
        handle.join().unwrap();

        assert_eq!(shared.get(), AllocState::Revoked);
        assert_eq!(sup_rx.recv_timeout(Duration::from_secs(1)).unwrap(), SupervisorMsg::Revoked);
    }

    #[test]
    fn timeout_is_only_forwarded_once_when_unchanged() {
        let (tx, rx) = channel();
        let (sup_tx, sup_rx) = channel();
        let shared = Arc::new(SharedAllocState::new());
        let handle = spawn_listener(rx, shared, sup_tx, Arc::new(|_| {}));

        tx.send(ListenerMessage::Timeout { deadline_unix: 1000 }).unwrap();
        tx.send(ListenerMessage::Timeout { deadline_unix: 1000 }).unwrap();
        drop(tx);
        handle.join().unwrap();

        let first = sup_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        let second = sup_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(first, SupervisorMsg::TimeoutNotice(1000));
        assert_eq!(second, SupervisorMsg::TimeoutNotice(1000));
        assert!(sup_rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn pending_invokes_the_caller_supplied_callback() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let (tx, rx) = channel();
        let (sup_tx, _sup_rx) = channel();
        let shared = Arc::new(SharedAllocState::new());
        let seen = Arc::new(AtomicU32::new(0));
        let seen2 = Arc::clone(&seen);
        let handle = spawn_listener(
            rx,
            shared,
            sup_tx,
            Arc::new(move |job_id| seen2.store(job_id, Ordering::SeqCst)),
        );

        tx.send(ListenerMessage::Pending { job_id: 99 }).unwrap();
        drop(tx);
        handle.join().unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 99);
    }
}

//! [`AllocationClient`]: the single actor owning the allocation state
//! machine, tying together the transport, the retry policy, the
//! listener thread, and signal-driven submit-wait cancellation.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{SallocError, SallocResult};
use crate::optmodel::job_desc::{HetJob, NO_VAL};

use super::cancel::CancelSignal;
use super::listener::spawn_listener;
use super::protocol::{
    AllocationResponse, JobDescWire, ListenerMessage, SubmitRequest, SupervisorMsg, Transport,
};
use super::retry::{retry_submit, RetryConfig};
use super::state::{AllocState, SharedAllocState};

/// Owns the allocation state machine for one (possibly hetjob)
/// request. Created once per `salloc` invocation.
pub struct AllocationClient {
    transport: Arc<dyn Transport>,
    shared: Arc<SharedAllocState>,
    retry_config: RetryConfig,
    job_id: std::sync::Mutex<Option<u32>>,
}

impl AllocationClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        AllocationClient {
            transport,
            shared: Arc::new(SharedAllocState::new()),
            retry_config: RetryConfig::default(),
            job_id: std::sync::Mutex::new(None),
        }
    }

    /// Start the listener thread and return the channel the supervisor
    /// should drain for `Kill`/`Revoked`/`TimeoutNotice` messages, plus
    /// the port that was registered with the controller.
    ///
    /// Must be called before [`Self::submit`] (§4.4: "Listener thread —
    /// created before submit").
    pub fn start_listener(
        &self,
        pending_cb: Arc<dyn Fn(u32) + Send + Sync>,
    ) -> SallocResult<(u16, mpsc::Receiver<SupervisorMsg>)> {
        let (port, listener_rx) = self.transport.open_listener()?;
        let (sup_tx, sup_rx) = mpsc::channel();
        spawn_listener(listener_rx, Arc::clone(&self.shared), sup_tx, pending_cb);
        Ok((port, sup_rx))
    }

    /// Blocking submit (§4.4): retries busy errors linearly, cancels on
    /// the fixed signal set, and transitions `NOT_GRANTED -> GRANTED`
    /// under the state lock so the supervisor never forks before this
    /// returns successfully.
    ///
    /// `listen_port` is the port [`Self::start_listener`] registered.
    pub fn submit(&self, components: &HetJob, listen_port: u16) -> SallocResult<Vec<AllocationResponse>> {
        let req = SubmitRequest {
            components: components.iter().map(JobDescWire::from).collect(),
            listen_port,
        };

        let cancel = CancelSignal::install()?;
        let result = retry_submit(self.retry_config, |_attempt| {
            if cancel.interrupted() {
                return Err(SallocError::UserAbort);
            }
            self.transport.submit(&req)
        });
        drop(cancel);

        match result {
            Ok(mut responses) => {
                if let Some(first) = responses.first().cloned() {
                    for r in responses.iter_mut().skip(1) {
                        r.other_port = first.other_port;
                    }
                    *self.job_id.lock().unwrap() = Some(first.job_id);
                }
                let state = self.shared.mark_granted();
                if state == AllocState::Revoked {
                    return Err(SallocError::Revoked(
                        "job completed before the allocation was observed as granted".to_string(),
                    ));
                }
                Ok(responses)
            }
            Err(SallocError::UserAbort) => {
                if let Some(id) = *self.job_id.lock().unwrap() {
                    let _ = self.transport.complete(id, NO_VAL);
                }
                Err(SallocError::UserAbort)
            }
            Err(e) => Err(e),
        }
    }

    /// Poll node readiness with the backoff of §4.4: a 500 µs first
    /// miss, then a fixed 3 s interval, bounded by `budget`.
    pub fn wait_ready(&self, job_id: u32, wait_all_nodes: bool, budget: Duration) -> SallocResult<bool> {
        let deadline = Instant::now() + budget;
        let mut first = true;
        loop {
            if self.shared.get() == AllocState::Revoked {
                return Ok(false);
            }
            match self.transport.poll_ready(job_id) {
                Ok(status) => {
                    if status.killed || status.revoked {
                        return Ok(false);
                    }
                    if status.is_ready(wait_all_nodes) {
                        return Ok(true);
                    }
                }
                Err(_) => return Ok(false),
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            thread::sleep(if first { Duration::from_micros(500) } else { Duration::from_secs(3) });
            first = false;
        }
    }

    /// Idempotent job-completion notice (§4.4). The supervisor must
    /// only call this when the listener has not already transitioned
    /// to `REVOKED` on its behalf (§9: "`complete(job_id)` is
    /// serialised with the listener").
    pub fn complete(&self, job_id: u32, status: u32) -> SallocResult<()> {
        if self.shared.get() == AllocState::Revoked {
            return Ok(());
        }
        match self.transport.complete(job_id, status) {
            Ok(()) => {
                self.shared.mark_revoked();
                Ok(())
            }
            Err(SallocError::TransportError(msg)) if msg.contains("ALREADY_DONE") => {
                self.shared.mark_revoked();
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Current allocation state, for the supervisor's pre-fork check
    /// (§9: "If a job-complete arrives before fork, the fork is
    /// skipped and the process exits 1").
    pub fn state(&self) -> AllocState {
        self.shared.get()
    }

    pub fn shared_state(&self) -> Arc<SharedAllocState> {
        Arc::clone(&self.shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::protocol::ReadinessStatus;
    use std::sync::Mutex as StdMutex;

    struct ScriptedTransport {
        submit_responses: StdMutex<Vec<SallocResult<Vec<AllocationResponse>>>>,
        ready_responses: StdMutex<Vec<SallocResult<ReadinessStatus>>>,
        complete_calls: StdMutex<Vec<(u32, u32)>>,
    }

    impl ScriptedTransport {
        fn new(submit_responses: Vec<SallocResult<Vec<AllocationResponse>>>) -> Self {
            ScriptedTransport {
                submit_responses: StdMutex::new(submit_responses),
                ready_responses: StdMutex::new(Vec::new()),
                complete_calls: StdMutex::new(Vec::new()),
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn submit(&self, _req: &SubmitRequest) -> SallocResult<Vec<AllocationResponse>> {
            let mut guard = self.submit_responses.lock().unwrap();
            if guard.is_empty() {
                panic!("submit called more times than scripted");
            }
            guard.remove(0)
        }

        fn poll_ready(&self, _job_id: u32) -> SallocResult<ReadinessStatus> {
            let mut guard = self.ready_responses.lock().unwrap();
            if guard.is_empty() {
                return Ok(ReadinessStatus {
                    node_state_ready: true,
                    prolog_done: true,
                    all_nodes_ready: true,
                    killed: false,
                    revoked: false,
                });
            }
            guard.remove(0)
        }

        fn complete(&self, job_id: u32, status: u32) -> SallocResult<()> {
            self.complete_calls.lock().unwrap().push((job_id, status));
            Ok(())
        }

        fn open_listener(&self) -> SallocResult<(u16, mpsc::Receiver<ListenerMessage>)> {
            let (_tx, rx) = mpsc::channel();
            Ok((12345, rx))
        }
    }

    fn sample_response(job_id: u32) -> AllocationResponse {
        AllocationResponse {
            job_id,
            node_list: "node1".to_string(),
            num_nodes: 1,
            cpus_per_node_rle: "1".to_string(),
            alias_list: None,
            other_port: 6000,
        }
    }

    #[test]
    fn successful_submit_transitions_to_granted() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(vec![sample_response(1)])]));
        let client = AllocationClient::new(transport);
        let hetjob: HetJob = Vec::new();
        let result = client.submit(&hetjob, 12345).unwrap();
        assert_eq!(result[0].job_id, 1);
        assert_eq!(client.state(), AllocState::Granted);
    }

    #[test]
    fn hetjob_port_propagation_copies_first_into_rest() {
        let mut second = sample_response(2);
        second.other_port = 1;
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(vec![sample_response(1), second])]));
        let client = AllocationClient::new(transport);
        let hetjob: HetJob = Vec::new();
        let result = client.submit(&hetjob, 12345).unwrap();
        assert_eq!(result[1].other_port, result[0].other_port);
    }

    #[test]
    fn wait_ready_returns_false_once_revoked() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(vec![sample_response(1)])]));
        let client = AllocationClient::new(transport);
        client.shared_state().mark_revoked();
        let ready = client.wait_ready(1, false, Duration::from_secs(1)).unwrap();
        assert!(!ready);
    }

    #[test]
    fn complete_is_a_noop_once_already_revoked() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let client = AllocationClient::new(transport);
        client.shared_state().mark_revoked();
        client.complete(1, 0).unwrap();
    }
}

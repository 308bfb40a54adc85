//! Container front-end (C6, §4.6): OCI verb dispatch against a
//! long-lived per-container anchor process reached over a deterministic
//! unix socket.
//!
//! Each `scrun` invocation is a fresh process, so the state a previous
//! `create` recorded (bundle metadata, socket path, job id once known)
//! is persisted as a small JSON record in the per-container spool
//! directory and reloaded on every later verb — mirroring the anchor
//! itself being the real source of truth for liveness, while this
//! front-end only caches what it learned about the bundle.

pub mod bundle;
pub mod runtime_root;
pub mod socket;
pub mod state;
pub mod transport;

use std::collections::HashMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{SallocError, SallocResult};

pub use state::{ContainerState, InternalStatus, OciStateJson};
pub use transport::{AnchorStateReply, AnchorTransport, StartOutcome};

/// Default signal `kill` sends when the caller gives none (§4.6).
pub const DEFAULT_KILL_SIGNAL: i32 = 15; // SIGTERM

/// Seam over "signal the backing job", the fallback path `kill`/`delete`
/// take when the anchor socket is unreachable. The controller RPC this
/// would actually perform is out of scope (spec.md §1); this seam keeps
/// the fallback branch testable without one.
pub trait JobSignaler: Send + Sync {
    fn signal_job(&self, job_id: u32, signal: i32) -> SallocResult<()>;
}

/// A [`JobSignaler`] that always reports the job as already complete;
/// the practical stand-in for "the allocation protocol's controller
/// already reaped the job" since no real controller is reachable from
/// this codebase's scope.
pub struct AssumeJobDoneSignaler;

impl JobSignaler for AssumeJobDoneSignaler {
    fn signal_job(&self, job_id: u32, signal: i32) -> SallocResult<()> {
        log::info!("JobId={job_id} assumed already complete for signal {signal}");
        Ok(())
    }
}

/// What `create` persists to `<spool_dir>/state.json` so later verbs
/// can reload it without re-reading the original bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContainerRecord {
    id: String,
    bundle: PathBuf,
    root: PathBuf,
    oci_version: String,
    terminal: bool,
    annotations: HashMap<String, String>,
    status: RecordStatus,
    pid: Option<i32>,
    job_id: Option<u32>,
    step_id: Option<u32>,
    force: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
enum RecordStatus {
    Starting,
    Created,
    Running,
    Paused,
    Stopping,
    Stopped,
    Failed,
}

impl From<InternalStatus> for RecordStatus {
    fn from(s: InternalStatus) -> Self {
        match s {
            InternalStatus::Starting => RecordStatus::Starting,
            InternalStatus::Created => RecordStatus::Created,
            InternalStatus::Running => RecordStatus::Running,
            InternalStatus::Paused => RecordStatus::Paused,
            InternalStatus::Stopping => RecordStatus::Stopping,
            InternalStatus::Stopped => RecordStatus::Stopped,
            InternalStatus::Failed => RecordStatus::Failed,
        }
    }
}

impl From<RecordStatus> for InternalStatus {
    fn from(s: RecordStatus) -> Self {
        match s {
            RecordStatus::Starting => InternalStatus::Starting,
            RecordStatus::Created => InternalStatus::Created,
            RecordStatus::Running => InternalStatus::Running,
            RecordStatus::Paused => InternalStatus::Paused,
            RecordStatus::Stopping => InternalStatus::Stopping,
            RecordStatus::Stopped => InternalStatus::Stopped,
            RecordStatus::Failed => InternalStatus::Failed,
        }
    }
}

impl ContainerRecord {
    fn to_state(&self) -> ContainerState {
        ContainerState {
            id: self.id.clone(),
            bundle: self.bundle.clone(),
            root: self.root.clone(),
            oci_version: self.oci_version.clone(),
            annotations: self.annotations.clone(),
            terminal: self.terminal,
            status: self.status.into(),
            pid: self.pid,
            job_id: self.job_id,
            step_id: self.step_id,
        }
    }
}

fn spool_dir(runtime_root: &Path, id: &str) -> PathBuf {
    runtime_root.join(id)
}

fn record_path(runtime_root: &Path, id: &str) -> PathBuf {
    spool_dir(runtime_root, id).join("state.json")
}

fn load_record(runtime_root: &Path, id: &str) -> SallocResult<ContainerRecord> {
    let path = record_path(runtime_root, id);
    let text = std::fs::read_to_string(&path)
        .map_err(|e| SallocError::validation(format!("no known container {id}: {e}")))?;
    Ok(serde_json::from_str(&text)?)
}

fn save_record(runtime_root: &Path, record: &ContainerRecord) -> SallocResult<()> {
    let dir = spool_dir(runtime_root, &record.id);
    let path = record_path(runtime_root, &record.id);
    let mut file = std::fs::File::create(&path)?;
    file.write_all(serde_json::to_string_pretty(record)?.as_bytes())?;
    let _ = dir;
    Ok(())
}

/// Create mode-0700 per §4.6's "per-container spool dir" requirement.
fn create_spool_dir(runtime_root: &Path, id: &str) -> SallocResult<PathBuf> {
    use std::os::unix::fs::DirBuilderExt;
    let dir = spool_dir(runtime_root, id);
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true).mode(0o700);
    match builder.create(&dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
        Err(e) => return Err(e.into()),
    }
    Ok(dir)
}

/// `create <bundle> <id>`: load the bundle, persist a new container
/// record, and spawn the anchor — spawning is out of this codebase's
/// scope (spec.md §1), so only the record is written.
pub fn create(runtime_root: &Path, id: &str, bundle_path: &Path) -> SallocResult<ContainerState> {
    create_spool_dir(runtime_root, id)?;
    let cfg = bundle::load_bundle(bundle_path)?;

    for entry in &cfg.env {
        if let Some((k, v)) = entry.split_once('=') {
            std::env::set_var(k, v);
        }
    }

    let record = ContainerRecord {
        id: id.to_string(),
        bundle: bundle_path.to_path_buf(),
        root: cfg.root_path,
        oci_version: cfg.oci_version,
        terminal: cfg.terminal,
        annotations: cfg.annotations,
        status: RecordStatus::Starting,
        pid: None,
        job_id: None,
        step_id: None,
        force: false,
    };
    save_record(runtime_root, &record)?;
    Ok(record.to_state())
}

/// `start <id>`: request the anchor start the container's process.
pub fn start(
    runtime_root: &Path,
    id: &str,
    user: &str,
    transport: &dyn AnchorTransport,
) -> SallocResult<()> {
    let mut record = load_record(runtime_root, id)?;
    let socket = socket::socket_path(runtime_root, user, id);

    match transport.start(&socket) {
        Ok(StartOutcome::Started { job_id, step_id }) => {
            log::debug!("container {id} start requested JobId={job_id} StepId={step_id}");
            record.job_id = Some(job_id);
            record.step_id = Some(step_id);
            record.status = RecordStatus::Created;
            save_record(runtime_root, &record)?;
            Ok(())
        }
        Ok(StartOutcome::CanNotStartImmediately) => Ok(()),
        Err(e) => Err(e),
    }
}

/// `state <id>`: query the anchor for live status/pid and print OCI JSON.
pub fn state_json(
    runtime_root: &Path,
    id: &str,
    user: &str,
    transport: &dyn AnchorTransport,
) -> SallocResult<OciStateJson> {
    let mut record = load_record(runtime_root, id)?;
    let socket = socket::socket_path(runtime_root, user, id);

    if let Ok(reply) = transport.state(&socket) {
        record.status = reply.status.into();
        record.pid = reply.pid.or(record.pid);
        record.job_id = reply.job_id.or(record.job_id);
        record.step_id = reply.step_id.or(record.step_id);
        save_record(runtime_root, &record)?;
    }

    Ok(record.to_state().to_oci_json())
}

/// `kill <id> [signal]`: RPC first, fall back to signalling the backing
/// job by id on transport error. Already-terminal containers are a
/// silent no-op.
pub fn kill(
    runtime_root: &Path,
    id: &str,
    user: &str,
    signal: i32,
    transport: &dyn AnchorTransport,
    signaler: &dyn JobSignaler,
) -> SallocResult<()> {
    let record = load_record(runtime_root, id)?;
    let status: InternalStatus = record.status.into();
    if status.is_terminal() {
        log::debug!("container {id} already stopped (status={status:?})");
        return Ok(());
    }

    let socket = socket::socket_path(runtime_root, user, id);
    match transport.kill(&socket, signal) {
        Ok(()) => Ok(()),
        Err(e) => {
            log::debug!("anchor unreachable for {id}, falling back to job signal: {e}");
            match record.job_id {
                Some(job_id) => signaler.signal_job(job_id, signal),
                None => {
                    log::info!("container {id} assumed already complete");
                    Ok(())
                }
            }
        }
    }
}

/// `delete <id> [--force]`: RPC first; on transport error, `--force`
/// assumes the container already gone, otherwise attempt a plain signal.
pub fn delete(
    runtime_root: &Path,
    id: &str,
    user: &str,
    force: bool,
    transport: &dyn AnchorTransport,
    signaler: &dyn JobSignaler,
) -> SallocResult<()> {
    let record = load_record(runtime_root, id)?;
    let status: InternalStatus = record.status.into();
    if status.is_terminal() {
        log::debug!("container {id} already stopped, nothing to delete");
        return Ok(());
    }

    let socket = socket::socket_path(runtime_root, user, id);
    match transport.delete(&socket) {
        Ok(()) => Ok(()),
        Err(e) => {
            log::debug!("anchor unreachable for {id} delete: {e}");
            match record.job_id {
                Some(job_id) => signaler.signal_job(job_id, DEFAULT_KILL_SIGNAL),
                None if force => {
                    log::info!("container {id} assumed already deleted");
                    Ok(())
                }
                None => Err(SallocError::validation(format!("unable to delete container {id}: no known job"))),
            }
        }
    }
}

/// `version`: no anchor contact.
pub fn version_line(oci_version: &str) -> String {
    format!("scrun version {}\nspec: {oci_version}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedTransport {
        start_result: Mutex<Option<SallocResult<StartOutcome>>>,
        kill_result: Mutex<Option<SallocResult<()>>>,
        delete_result: Mutex<Option<SallocResult<()>>>,
    }

    impl AnchorTransport for ScriptedTransport {
        fn start(&self, _socket: &Path) -> SallocResult<StartOutcome> {
            self.start_result.lock().unwrap().take().unwrap()
        }
        fn state(&self, _socket: &Path) -> SallocResult<AnchorStateReply> {
            Err(SallocError::TransportError("no state scripted".into()))
        }
        fn kill(&self, _socket: &Path, _signal: i32) -> SallocResult<()> {
            self.kill_result.lock().unwrap().take().unwrap()
        }
        fn delete(&self, _socket: &Path) -> SallocResult<()> {
            self.delete_result.lock().unwrap().take().unwrap()
        }
    }

    fn write_bundle(dir: &Path) -> PathBuf {
        let bundle = dir.join("bundle");
        std::fs::create_dir_all(&bundle).unwrap();
        std::fs::write(
            bundle.join("config.json"),
            r#"{"ociVersion":"1.0.0","root":{"path":"rootfs"}}"#,
        )
        .unwrap();
        bundle
    }

    #[test]
    fn create_persists_a_record_reloadable_by_later_verbs() {
        let root = tempfile::tempdir().unwrap();
        let bundle = write_bundle(root.path());
        create(root.path(), "c1", &bundle).unwrap();
        let record = load_record(root.path(), "c1").unwrap();
        assert_eq!(record.oci_version, "1.0.0");
        assert_eq!(record.status, RecordStatus::Starting);
    }

    #[test]
    fn start_records_job_and_step_id_on_success() {
        let root = tempfile::tempdir().unwrap();
        let bundle = write_bundle(root.path());
        create(root.path(), "c1", &bundle).unwrap();
        let transport = ScriptedTransport {
            start_result: Mutex::new(Some(Ok(StartOutcome::Started { job_id: 42, step_id: 0 }))),
            kill_result: Mutex::new(None),
            delete_result: Mutex::new(None),
        };
        start(root.path(), "c1", "alice", &transport).unwrap();
        let record = load_record(root.path(), "c1").unwrap();
        assert_eq!(record.job_id, Some(42));
        assert_eq!(record.status, RecordStatus::Created);
    }

    #[test]
    fn start_can_not_start_immediately_leaves_record_unchanged() {
        let root = tempfile::tempdir().unwrap();
        let bundle = write_bundle(root.path());
        create(root.path(), "c1", &bundle).unwrap();
        let transport = ScriptedTransport {
            start_result: Mutex::new(Some(Ok(StartOutcome::CanNotStartImmediately))),
            kill_result: Mutex::new(None),
            delete_result: Mutex::new(None),
        };
        start(root.path(), "c1", "alice", &transport).unwrap();
        let record = load_record(root.path(), "c1").unwrap();
        assert_eq!(record.status, RecordStatus::Starting);
    }

    #[test]
    fn kill_on_terminal_container_is_a_silent_no_op() {
        let root = tempfile::tempdir().unwrap();
        let bundle = write_bundle(root.path());
        let mut record = load_record_after_create(root.path(), &bundle, "c1");
        record.status = RecordStatus::Stopped;
        save_record(root.path(), &record).unwrap();
        let transport = ScriptedTransport {
            start_result: Mutex::new(None),
            kill_result: Mutex::new(Some(Err(SallocError::TransportError("unreachable".into())))),
            delete_result: Mutex::new(None),
        };
        kill(root.path(), "c1", "alice", 15, &transport, &AssumeJobDoneSignaler).unwrap();
    }

    #[test]
    fn kill_falls_back_to_job_signal_on_transport_error() {
        let root = tempfile::tempdir().unwrap();
        let bundle = write_bundle(root.path());
        let mut record = load_record_after_create(root.path(), &bundle, "c1");
        record.job_id = Some(7);
        save_record(root.path(), &record).unwrap();
        let transport = ScriptedTransport {
            start_result: Mutex::new(None),
            kill_result: Mutex::new(Some(Err(SallocError::TransportError("unreachable".into())))),
            delete_result: Mutex::new(None),
        };
        kill(root.path(), "c1", "alice", 15, &transport, &AssumeJobDoneSignaler).unwrap();
    }

    #[test]
    fn delete_without_force_and_no_known_job_errors() {
        let root = tempfile::tempdir().unwrap();
        let bundle = write_bundle(root.path());
        create(root.path(), "c1", &bundle).unwrap();
        let transport = ScriptedTransport {
            start_result: Mutex::new(None),
            kill_result: Mutex::new(None),
            delete_result: Mutex::new(Some(Err(SallocError::TransportError("unreachable".into())))),
        };
        let result = delete(root.path(), "c1", "alice", false, &transport, &AssumeJobDoneSignaler);
        assert!(result.is_err());
    }

    #[test]
    fn delete_with_force_and_no_known_job_succeeds() {
        let root = tempfile::tempdir().unwrap();
        let bundle = write_bundle(root.path());
        create(root.path(), "c1", &bundle).unwrap();
        let transport = ScriptedTransport {
            start_result: Mutex::new(None),
            kill_result: Mutex::new(None),
            delete_result: Mutex::new(Some(Err(SallocError::TransportError("unreachable".into())))),
        };
        delete(root.path(), "c1", "alice", true, &transport, &AssumeJobDoneSignaler).unwrap();
    }

    fn load_record_after_create(root: &Path, bundle: &Path, id: &str) -> ContainerRecord {
        create(root, id, bundle).unwrap();
        load_record(root, id).unwrap()
    }
}

//! Anchor RPC seam (§4.6). The anchor process itself, and the wire
//! protocol `start`/`kill`/`delete` speak to it, are out of scope
//! (spec.md §1); this mirrors [`crate::client::protocol::Transport`]'s
//! role for the controller RPC.

use std::path::Path;

use crate::container::state::InternalStatus;
use crate::error::SallocResult;

/// Outcome of a `start` RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { job_id: u32, step_id: u32 },
    CanNotStartImmediately,
}

/// Anchor's answer to a `state` query: the internal status `command_state`
/// (§4.6) projects onto the OCI set, plus whatever identifiers the anchor
/// knows about so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorStateReply {
    pub status: InternalStatus,
    pub pid: Option<i32>,
    pub job_id: Option<u32>,
    pub step_id: Option<u32>,
}

/// Seam abstracting the per-container anchor RPC over its unix socket.
pub trait AnchorTransport: Send + Sync {
    fn start(&self, socket: &Path) -> SallocResult<StartOutcome>;
    fn state(&self, socket: &Path) -> SallocResult<AnchorStateReply>;
    fn kill(&self, socket: &Path, signal: i32) -> SallocResult<()>;
    fn delete(&self, socket: &Path) -> SallocResult<()>;
}

/// Unix-socket-backed [`AnchorTransport`]. Framing mirrors
/// [`crate::client::protocol::RealTransport`]: length-prefixed JSON.
pub struct RealAnchorTransport;

impl AnchorTransport for RealAnchorTransport {
    fn start(&self, socket: &Path) -> SallocResult<StartOutcome> {
        use std::io::{Read, Write};
        use std::os::unix::net::UnixStream;
        let mut stream = UnixStream::connect(socket)?;
        stream.write_all(b"{\"verb\":\"start\"}")?;
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf)?;
        let value: serde_json::Value = serde_json::from_slice(&buf)?;
        if value.get("can_not_start_immediately").is_some() {
            return Ok(StartOutcome::CanNotStartImmediately);
        }
        let job_id = value.get("job_id").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        let step_id = value.get("step_id").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        Ok(StartOutcome::Started { job_id, step_id })
    }

    fn state(&self, socket: &Path) -> SallocResult<AnchorStateReply> {
        use std::io::{Read, Write};
        use std::os::unix::net::UnixStream;
        let mut stream = UnixStream::connect(socket)?;
        stream.write_all(b"{\"verb\":\"state\"}")?;
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf)?;
        let value: serde_json::Value = serde_json::from_slice(&buf)?;
        let status = match value.get("status").and_then(|v| v.as_str()).unwrap_or("starting") {
            "created" => InternalStatus::Created,
            "running" => InternalStatus::Running,
            "paused" => InternalStatus::Paused,
            "stopping" => InternalStatus::Stopping,
            "stopped" => InternalStatus::Stopped,
            "failed" => InternalStatus::Failed,
            _ => InternalStatus::Starting,
        };
        Ok(AnchorStateReply {
            status,
            pid: value.get("pid").and_then(|v| v.as_i64()).map(|v| v as i32),
            job_id: value.get("job_id").and_then(|v| v.as_u64()).map(|v| v as u32),
            step_id: value.get("step_id").and_then(|v| v.as_u64()).map(|v| v as u32),
        })
    }

    fn kill(&self, socket: &Path, signal: i32) -> SallocResult<()> {
        use std::io::Write;
        use std::os::unix::net::UnixStream;
        let mut stream = UnixStream::connect(socket)?;
        stream.write_all(format!("{{\"verb\":\"kill\",\"signal\":{signal}}}").as_bytes())?;
        Ok(())
    }

    fn delete(&self, socket: &Path) -> SallocResult<()> {
        use std::io::Write;
        use std::os::unix::net::UnixStream;
        let mut stream = UnixStream::connect(socket)?;
        stream.write_all(b"{\"verb\":\"delete\"}")?;
        Ok(())
    }
}

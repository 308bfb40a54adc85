//! Container state (§4.6): the internal status enum, its projection
//! onto the OCI runtime-spec status set, and the JSON shape `state`
//! emits.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;

/// Internal container status, ordered so "stopping or later" can be
/// tested with a single comparison (§4.6: "`stopping`/`unknown`/any ≥
/// stopped → `stopped`").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InternalStatus {
    Starting,
    Created,
    Running,
    Paused,
    Stopping,
    Stopped,
    Failed,
}

impl InternalStatus {
    /// Project onto the OCI runtime-spec status set, already
    /// lower-case.
    pub fn to_oci_status(self) -> &'static str {
        match self {
            InternalStatus::Starting => "creating",
            InternalStatus::Created => "created",
            InternalStatus::Running => "running",
            InternalStatus::Paused => "paused",
            InternalStatus::Stopping | InternalStatus::Stopped | InternalStatus::Failed => "stopped",
        }
    }

    pub fn is_terminal(self) -> bool {
        self.to_oci_status() == "stopped"
    }
}

/// JSON shape `scrun state` emits.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OciStateJson {
    #[serde(rename = "ociVersion")]
    pub oci_version: String,
    pub id: String,
    pub status: String,
    pub pid: i32,
    pub bundle: String,
    pub annotations: HashMap<String, String>,
}

/// One container's runtime state, as tracked across `create`/`start`/
/// `state`/`kill`/`delete` calls.
#[derive(Debug, Clone)]
pub struct ContainerState {
    pub id: String,
    pub bundle: PathBuf,
    pub root: PathBuf,
    pub oci_version: String,
    pub annotations: HashMap<String, String>,
    pub terminal: bool,
    pub status: InternalStatus,
    pub pid: Option<i32>,
    pub job_id: Option<u32>,
    pub step_id: Option<u32>,
}

impl ContainerState {
    pub fn to_oci_json(&self) -> OciStateJson {
        OciStateJson {
            oci_version: self.oci_version.clone(),
            id: self.id.clone(),
            status: self.status.to_oci_status().to_string(),
            pid: self.pid.unwrap_or(0),
            bundle: self.bundle.to_string_lossy().into_owned(),
            annotations: self.annotations.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_projects_to_creating() {
        assert_eq!(InternalStatus::Starting.to_oci_status(), "creating");
    }

    #[test]
    fn stopping_and_later_project_to_stopped() {
        assert_eq!(InternalStatus::Stopping.to_oci_status(), "stopped");
        assert_eq!(InternalStatus::Stopped.to_oci_status(), "stopped");
        assert_eq!(InternalStatus::Failed.to_oci_status(), "stopped");
    }

    #[test]
    fn running_passes_through() {
        assert_eq!(InternalStatus::Running.to_oci_status(), "running");
    }

    #[test]
    fn oci_json_defaults_missing_pid_to_zero() {
        let state = ContainerState {
            id: "c1".to_string(),
            bundle: PathBuf::from("/tmp/bundle"),
            root: PathBuf::from("/tmp/bundle/rootfs"),
            oci_version: "1.0.0".to_string(),
            annotations: HashMap::new(),
            terminal: false,
            status: InternalStatus::Created,
            pid: None,
            job_id: None,
            step_id: None,
        };
        assert_eq!(state.to_oci_json().pid, 0);
    }
}

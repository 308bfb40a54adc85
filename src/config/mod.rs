//! Ambient runtime configuration: cluster name, controller address,
//! default partition, the `NICE_OFFSET` bound, and the suspend/resume
//! timeout pair [`crate::optmodel::job_desc::JobDesc::readiness_budget`]
//! uses for its backoff bound.
//!
//! Layered the way the teacher's `ConfigManager`/`ConfigSource` stack
//! merges `FileSource`/`EnvSource`/`CliSource`: here a [`DefaultsSource`],
//! [`EnvSource`], and [`CliSource`] merge into a [`PartialRuntimeConfig`]
//! with `Option<T>` fields, then [`PartialRuntimeConfig::to_complete`]
//! fills in anything still unset.

pub mod manager;
pub mod partial;
pub mod source;

use std::path::PathBuf;
use std::time::Duration;

pub use manager::{ConfigError, ConfigManager};
pub use partial::PartialRuntimeConfig;
pub use source::{CliSource, ConfigSource, DefaultsSource, EnvSource};

/// Complete, immutable runtime configuration for a front-end process.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Cluster name reported in `SLURM_CLUSTER_NAME`.
    pub cluster_name: String,
    /// Controller host:port for the allocation/container RPC clients.
    pub controller_addr: String,
    /// Partition substituted when none is requested.
    pub default_partition: Option<String>,
    /// Path standing in for `SLURM_CONF`.
    pub conf_path: PathBuf,
    /// Bound on the signed `nice` offset (§3).
    pub nice_offset: i32,
    /// Suspend timeout, used by the readiness-wait backoff bound.
    pub suspend_timeout: Duration,
    /// Resume timeout, used by the readiness-wait backoff bound.
    pub resume_timeout: Duration,
    /// Exit code for validation/submit failures (`SLURM_EXIT_ERROR`).
    pub exit_error: i32,
    /// Exit code for an unmet `--immediate` request (`SLURM_EXIT_IMMEDIATE`).
    pub exit_immediate: i32,
    /// Default command substituted when none is given (§4.2); empty
    /// means "fall back to the user's login shell".
    pub default_command: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            cluster_name: "cluster".to_string(),
            controller_addr: "127.0.0.1:6817".to_string(),
            default_partition: None,
            conf_path: PathBuf::from("/etc/slurm/slurm.conf"),
            nice_offset: crate::optmodel::job_desc::NICE_OFFSET,
            suspend_timeout: Duration::from_secs(30),
            resume_timeout: Duration::from_secs(60),
            exit_error: 1,
            exit_immediate: 1,
            default_command: None,
        }
    }
}

/// Load the layered runtime configuration: defaults, then environment,
/// then CLI overrides, highest priority last.
pub fn load(cli: PartialRuntimeConfig) -> Result<RuntimeConfig, ConfigError> {
    let manager = ConfigManager::new()
        .add_source(Box::new(DefaultsSource))
        .add_source(Box::new(EnvSource))
        .add_source(Box::new(CliSource::new(cli)));
    manager.load()?;
    manager.config().to_complete()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_with_no_overrides_yields_defaults() {
        let cfg = load(PartialRuntimeConfig::default()).unwrap();
        assert_eq!(cfg.cluster_name, RuntimeConfig::default().cluster_name);
    }

    #[test]
    fn cli_source_has_highest_priority() {
        let cli = PartialRuntimeConfig {
            cluster_name: Some("from-cli".to_string()),
            ..Default::default()
        };
        let cfg = load(cli).unwrap();
        assert_eq!(cfg.cluster_name, "from-cli");
    }
}

//! Configuration sources, mirroring the teacher's `FileSource`/
//! `EnvSource`/`ArgsSource` triad: each produces a
//! [`PartialRuntimeConfig`] and declares a merge priority.

use super::manager::ConfigError;
use super::partial::PartialRuntimeConfig;
use std::time::Duration;

/// One contributor to the merged runtime configuration.
pub trait ConfigSource: Send + Sync {
    /// Produce this source's partial view.
    fn load(&self) -> Result<PartialRuntimeConfig, ConfigError>;
    /// Merge priority; sources are applied in ascending order so a
    /// higher value overrides a lower one.
    fn priority(&self) -> u8;
}

/// Built-in defaults; always priority 0 (lowest).
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
    fn load(&self) -> Result<PartialRuntimeConfig, ConfigError> {
        Ok(PartialRuntimeConfig::default())
    }

    fn priority(&self) -> u8 {
        0
    }
}

/// `SLURM_CONF`/cluster-name/controller-address environment variables.
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn load(&self) -> Result<PartialRuntimeConfig, ConfigError> {
        let mut cfg = PartialRuntimeConfig::default();
        if let Ok(v) = std::env::var("SLURM_CLUSTER_NAME") {
            cfg.cluster_name = Some(v);
        }
        if let Ok(v) = std::env::var("SLURM_CONF") {
            cfg.conf_path = Some(v.into());
        }
        if let Ok(v) = std::env::var("SLURM_CONTROLLER_ADDR") {
            cfg.controller_addr = Some(v);
        }
        if let Ok(v) = std::env::var("SALLOC_PARTITION") {
            cfg.default_partition = Some(v);
        }
        if let Ok(v) = std::env::var("SLURM_EXIT_ERROR") {
            if let Ok(n) = v.parse() {
                cfg.exit_error = Some(n);
            }
        }
        if let Ok(v) = std::env::var("SLURM_EXIT_IMMEDIATE") {
            if let Ok(n) = v.parse() {
                cfg.exit_immediate = Some(n);
            }
        }
        if let Ok(v) = std::env::var("SLURM_SUSPEND_TIMEOUT") {
            if let Ok(n) = v.parse::<u64>() {
                cfg.suspend_timeout = Some(Duration::from_secs(n));
            }
        }
        if let Ok(v) = std::env::var("SLURM_RESUME_TIMEOUT") {
            if let Ok(n) = v.parse::<u64>() {
                cfg.resume_timeout = Some(Duration::from_secs(n));
            }
        }
        Ok(cfg)
    }

    fn priority(&self) -> u8 {
        5
    }
}

/// Highest-priority source: values already resolved from `argv` by the
/// caller (`--cluster`-style global flags, if any are added later).
pub struct CliSource {
    value: PartialRuntimeConfig,
}

impl CliSource {
    /// Wrap an already-parsed partial configuration.
    pub fn new(value: PartialRuntimeConfig) -> Self {
        Self { value }
    }
}

impl ConfigSource for CliSource {
    fn load(&self) -> Result<PartialRuntimeConfig, ConfigError> {
        Ok(self.value.clone())
    }

    fn priority(&self) -> u8 {
        10
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_source_has_lowest_priority() {
        assert!(DefaultsSource.priority() < EnvSource.priority());
        assert!(EnvSource.priority() < CliSource::new(PartialRuntimeConfig::default()).priority());
    }
}

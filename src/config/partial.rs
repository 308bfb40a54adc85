//! The `Option<T>` mirror of [`super::RuntimeConfig`], merged the way
//! [`crate::optmodel::partial::PartialJobDesc`] merges job-descriptor
//! overlays — later, higher-priority sources overwrite earlier ones
//! field by field.

use std::path::PathBuf;
use std::time::Duration;

use super::{ConfigError, RuntimeConfig};

/// Partial runtime configuration; every field absent means "this source
/// did not set it".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialRuntimeConfig {
    pub cluster_name: Option<String>,
    pub controller_addr: Option<String>,
    pub default_partition: Option<String>,
    pub conf_path: Option<PathBuf>,
    pub nice_offset: Option<i32>,
    pub suspend_timeout: Option<Duration>,
    pub resume_timeout: Option<Duration>,
    pub exit_error: Option<i32>,
    pub exit_immediate: Option<i32>,
    pub default_command: Option<String>,
}

impl PartialRuntimeConfig {
    /// Merge `over` onto `self`, field by field, preferring `over`
    /// whenever it is `Some`.
    pub fn merge(&mut self, over: PartialRuntimeConfig) {
        macro_rules! take {
            ($($f:ident),+ $(,)?) => {
                $(if over.$f.is_some() { self.$f = over.$f; })+
            };
        }
        take!(
            cluster_name,
            controller_addr,
            default_partition,
            conf_path,
            nice_offset,
            suspend_timeout,
            resume_timeout,
            exit_error,
            exit_immediate,
            default_command,
        );
    }

    /// Freeze into a [`RuntimeConfig`], falling back to
    /// [`RuntimeConfig::default`] for any field still unset.
    pub fn to_complete(&self) -> Result<RuntimeConfig, ConfigError> {
        let d = RuntimeConfig::default();
        Ok(RuntimeConfig {
            cluster_name: self.cluster_name.clone().unwrap_or(d.cluster_name),
            controller_addr: self.controller_addr.clone().unwrap_or(d.controller_addr),
            default_partition: self.default_partition.clone().or(d.default_partition),
            conf_path: self.conf_path.clone().unwrap_or(d.conf_path),
            nice_offset: self.nice_offset.unwrap_or(d.nice_offset),
            suspend_timeout: self.suspend_timeout.unwrap_or(d.suspend_timeout),
            resume_timeout: self.resume_timeout.unwrap_or(d.resume_timeout),
            exit_error: self.exit_error.unwrap_or(d.exit_error),
            exit_immediate: self.exit_immediate.unwrap_or(d.exit_immediate),
            default_command: self.default_command.clone().or(d.default_command),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_unset_fields_from_base() {
        let mut base = PartialRuntimeConfig {
            cluster_name: Some("base".into()),
            controller_addr: Some("base:1".into()),
            ..Default::default()
        };
        let over = PartialRuntimeConfig {
            cluster_name: Some("over".into()),
            ..Default::default()
        };
        base.merge(over);
        assert_eq!(base.cluster_name, Some("over".into()));
        assert_eq!(base.controller_addr, Some("base:1".into()));
    }
}

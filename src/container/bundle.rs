//! Bundle loading (§4.6's `create`): parses `<bundle>/config.json` the
//! way `original_source/src/scrun/commands.c`'s `_load_config` does —
//! pull `/root/path`, `/ociVersion`, `/process/terminal`, `/annotations`,
//! then separately filter `/process/env` to the recognised prefixes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{SallocError, SallocResult};

/// Environment-variable prefixes `_load_config_environ` propagates into
/// the spawned anchor's environment.
const ENV_PREFIXES: [&str; 2] = ["SCRUN_", "SLURM_"];

/// Fields pulled out of a bundle's `config.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleConfig {
    pub oci_version: String,
    pub root_path: PathBuf,
    pub terminal: bool,
    pub annotations: HashMap<String, String>,
    pub env: Vec<String>,
}

/// Load and parse `<bundle>/config.json`.
pub fn load_bundle(bundle: &Path) -> SallocResult<BundleConfig> {
    let config_path = bundle.join("config.json");
    let text = std::fs::read_to_string(&config_path)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;

    let oci_version = value
        .get("ociVersion")
        .and_then(|v| v.as_str())
        .ok_or_else(|| SallocError::validation(format!("invalid /ociVersion in {}", config_path.display())))?
        .to_string();

    let raw_root = value
        .pointer("/root/path")
        .and_then(|v| v.as_str())
        .ok_or_else(|| SallocError::validation(format!("invalid /root/path in {}", config_path.display())))?;
    let root_path = if raw_root.starts_with('/') {
        PathBuf::from(raw_root)
    } else {
        bundle.join(raw_root)
    };

    let terminal = value
        .pointer("/process/terminal")
        .map(|v| {
            v.as_bool()
                .ok_or_else(|| SallocError::validation("invalid /process/terminal: not a bool".to_string()))
        })
        .transpose()?
        .unwrap_or(false);

    let mut annotations = HashMap::new();
    if let Some(obj) = value.get("annotations").and_then(|v| v.as_object()) {
        for (k, v) in obj {
            let s = v
                .as_str()
                .ok_or_else(|| SallocError::validation(format!("invalid /annotations/{k}: not a string")))?;
            annotations.insert(k.clone(), s.to_string());
        }
    }

    let env = value
        .pointer("/process/env")
        .map(|v| {
            v.as_array()
                .ok_or_else(|| SallocError::validation("invalid /process/env: not a list".to_string()))
        })
        .transpose()?
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .filter(|s| ENV_PREFIXES.iter().any(|p| s.starts_with(p)))
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default();

    Ok(BundleConfig {
        oci_version,
        root_path,
        terminal,
        annotations,
        env,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_bundle(dir: &Path, config: &str) {
        let mut f = std::fs::File::create(dir.join("config.json")).unwrap();
        f.write_all(config.as_bytes()).unwrap();
    }

    #[test]
    fn absolute_root_path_is_kept_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(dir.path(), r#"{"ociVersion":"1.0.0","root":{"path":"/var/lib/rootfs"}}"#);
        let cfg = load_bundle(dir.path()).unwrap();
        assert_eq!(cfg.root_path, PathBuf::from("/var/lib/rootfs"));
    }

    #[test]
    fn relative_root_path_resolves_against_bundle() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(dir.path(), r#"{"ociVersion":"1.0.0","root":{"path":"rootfs"}}"#);
        let cfg = load_bundle(dir.path()).unwrap();
        assert_eq!(cfg.root_path, dir.path().join("rootfs"));
    }

    #[test]
    fn env_is_filtered_to_recognised_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(
            dir.path(),
            r#"{"ociVersion":"1.0.0","root":{"path":"rootfs"},
               "process":{"env":["SCRUN_ID=c1","SLURM_JOB_ID=5","PATH=/bin"]}}"#,
        );
        let cfg = load_bundle(dir.path()).unwrap();
        assert_eq!(cfg.env, vec!["SCRUN_ID=c1".to_string(), "SLURM_JOB_ID=5".to_string()]);
    }

    #[test]
    fn annotations_are_flattened_to_strings() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(
            dir.path(),
            r#"{"ociVersion":"1.0.0","root":{"path":"rootfs"},"annotations":{"k":"v"}}"#,
        );
        let cfg = load_bundle(dir.path()).unwrap();
        assert_eq!(cfg.annotations.get("k"), Some(&"v".to_string()));
    }

    #[test]
    fn missing_root_path_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(dir.path(), r#"{"ociVersion":"1.0.0"}"#);
        assert!(load_bundle(dir.path()).is_err());
    }
}

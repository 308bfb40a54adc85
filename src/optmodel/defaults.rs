//! Pass 1 of the three-pass fill (§4.2): numeric sentinels, false
//! booleans, null strings, and the handful of non-trivial defaults that
//! come from the process environment (uid/gid, user name, cwd).

use crate::error::SallocError;
use crate::optmodel::job_desc::{BellPolicy, INFINITE};
use crate::optmodel::partial::PartialJobDesc;

/// Looks up the process uid/gid/user-name/cwd/hostname the way the
/// source falls back to the password database; a trait so tests can
/// substitute a fixed identity without touching real OS state.
pub trait ProcessIdentity {
    /// Real uid of the running process.
    fn uid(&self) -> u32;
    /// Real gid of the running process.
    fn gid(&self) -> u32;
    /// User name resolved from the password database for `uid()`.
    /// Errors if the uid has no password-database entry, per §4.2's
    /// "fail if absent" rule.
    fn user_name(&self) -> Result<String, SallocError>;
    /// Current working directory.
    fn cwd(&self) -> Result<String, SallocError>;
    /// Local hostname.
    fn hostname(&self) -> Result<String, SallocError>;
    /// The user's login shell from the password database, used to
    /// substitute a command when none is given and `--no-shell` is
    /// absent (§4.2). Defaults to `/bin/sh` for implementors that do
    /// not override it (tests, and any platform lacking a password
    /// database entry worth trusting).
    fn shell(&self) -> Result<String, SallocError> {
        Ok("/bin/sh".to_string())
    }
}

/// [`ProcessIdentity`] backed by real OS queries (`nix::unistd`).
#[derive(Debug, Default, Clone, Copy)]
pub struct OsIdentity;

impl ProcessIdentity for OsIdentity {
    fn uid(&self) -> u32 {
        nix::unistd::getuid().as_raw()
    }

    fn gid(&self) -> u32 {
        nix::unistd::getgid().as_raw()
    }

    fn user_name(&self) -> Result<String, SallocError> {
        let uid = nix::unistd::getuid();
        match nix::unistd::User::from_uid(uid) {
            Ok(Some(user)) => Ok(user.name),
            Ok(None) => Err(SallocError::validation(format!(
                "no password-database entry for uid {uid}"
            ))),
            Err(e) => Err(SallocError::Other(anyhow::anyhow!(
                "password database lookup failed: {e}"
            ))),
        }
    }

    fn cwd(&self) -> Result<String, SallocError> {
        Ok(std::env::current_dir()?.to_string_lossy().into_owned())
    }

    fn hostname(&self) -> Result<String, SallocError> {
        let mut buf = [0u8; 256];
        let cstr = nix::unistd::gethostname(&mut buf)
            .map_err(|e| SallocError::Other(anyhow::anyhow!("gethostname failed: {e}")))?;
        Ok(cstr.to_string_lossy().into_owned())
    }

    fn shell(&self) -> Result<String, SallocError> {
        let uid = nix::unistd::getuid();
        match nix::unistd::User::from_uid(uid) {
            Ok(Some(user)) => Ok(user.shell.to_string_lossy().into_owned()),
            Ok(None) => Ok("/bin/sh".to_string()),
            Err(e) => Err(SallocError::Other(anyhow::anyhow!(
                "password database lookup failed: {e}"
            ))),
        }
    }
}

/// Produce the pass-1 defaults descriptor.
pub fn defaults(identity: &dyn ProcessIdentity) -> Result<PartialJobDesc, SallocError> {
    let uid = identity.uid();
    let gid = identity.gid();
    let user_name = identity.user_name()?;
    let submit_dir = identity.cwd()?;
    let submit_host = identity.hostname()?;

    Ok(PartialJobDesc {
        uid: Some(uid),
        gid: Some(gid),
        user_name: Some(user_name),
        submit_dir: Some(submit_dir),
        submit_host: Some(submit_host),

        ntasks: Some(1),
        ntasks_set: Some(false),
        min_nodes: Some(1),
        max_nodes: Some(1),
        nodes_set: Some(false),
        cpus_per_task: Some(1),

        time_limit: Some(INFINITE),
        time_min: Some(INFINITE),

        kill_command_signal: Some(crate::parsers::sig_name_to_num("TERM").unwrap()),
        bell: Some(BellPolicy::AfterDelay),

        hold: Some(false),
        requeue: Some(false),
        quiet: Some(false),
        verbose: Some(0),
        no_shell: Some(false),
        contiguous: Some(false),
        no_rotate: Some(false),
        reboot: Some(false),

        command: Some(Vec::new()),
        export_env: Some(Vec::new()),
        spank_env: Some(Vec::new()),
        geometry: Some(Vec::new()),
        conn_type: Some(Vec::new()),

        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedIdentity;
    impl ProcessIdentity for FixedIdentity {
        fn uid(&self) -> u32 {
            4242
        }
        fn gid(&self) -> u32 {
            100
        }
        fn user_name(&self) -> Result<String, SallocError> {
            Ok("testuser".into())
        }
        fn cwd(&self) -> Result<String, SallocError> {
            Ok("/home/testuser".into())
        }
        fn hostname(&self) -> Result<String, SallocError> {
            Ok("testhost".into())
        }
    }

    #[test]
    fn default_sizing_is_one_task_one_node_one_cpu() {
        let d = defaults(&FixedIdentity).unwrap();
        assert_eq!(d.ntasks, Some(1));
        assert_eq!(d.min_nodes, Some(1));
        assert_eq!(d.max_nodes, Some(1));
        assert_eq!(d.cpus_per_task, Some(1));
    }

    #[test]
    fn default_time_limit_is_infinite() {
        let d = defaults(&FixedIdentity).unwrap();
        assert_eq!(d.time_limit, Some(INFINITE));
    }

    #[test]
    fn identity_is_pulled_from_the_process() {
        let d = defaults(&FixedIdentity).unwrap();
        assert_eq!(d.uid, Some(4242));
        assert_eq!(d.user_name, Some("testuser".into()));
    }
}

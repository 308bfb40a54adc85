//! Runtime root directory selection (§4.6), grounded in
//! `original_source/src/scrun/scrun.c`'s `_set_root`/`_try_tmp_path`:
//! try `$XDG_RUNTIME_DIR`, then `/run/user/$UID`, then `$TMPDIR/$UID`,
//! first writable+readable path wins. Explicit `--root` short-circuits
//! all of this.

use std::path::{Path, PathBuf};

use crate::error::{SallocError, SallocResult};

/// A seam over the two OS facts this selection needs: whether a path is
/// both readable and writable, and the real uid, so tests do not have
/// to depend on actual filesystem permissions.
pub trait RootProbe {
    fn uid(&self) -> u32;
    fn is_writable_readable(&self, path: &Path) -> bool;
}

/// [`RootProbe`] backed by real `access(2)`/`getuid(2)` calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRootProbe;

impl RootProbe for OsRootProbe {
    fn uid(&self) -> u32 {
        nix::unistd::getuid().as_raw()
    }

    fn is_writable_readable(&self, path: &Path) -> bool {
        nix::unistd::access(path, nix::unistd::AccessFlags::R_OK | nix::unistd::AccessFlags::W_OK).is_ok()
    }
}

/// Select the runtime root directory.
///
/// `explicit` is `--root`, when given. `xdg_runtime_dir`/`tmpdir` are
/// injected (rather than read straight from `std::env`) so tests can
/// fix them independently of the host's actual environment.
pub fn select_runtime_root(
    explicit: Option<&str>,
    xdg_runtime_dir: Option<&str>,
    tmpdir: Option<&str>,
    probe: &dyn RootProbe,
) -> SallocResult<PathBuf> {
    if let Some(path) = explicit {
        return Ok(PathBuf::from(path));
    }

    let uid = probe.uid();
    if uid == 0 {
        return Err(SallocError::validation(
            "scrun is running as uid 0 and is likely inside a user namespace; --root must be given explicitly",
        ));
    }

    if let Some(path) = xdg_runtime_dir {
        let p = PathBuf::from(path);
        if probe.is_writable_readable(&p) {
            return Ok(p);
        }
    }

    let run_user = PathBuf::from(format!("/run/user/{uid}"));
    if probe.is_writable_readable(&run_user) {
        return Ok(run_user);
    }

    if let Some(tmp) = tmpdir {
        let p = PathBuf::from(format!("{tmp}/{uid}"));
        if probe.is_writable_readable(&p) {
            return Ok(p);
        }
    }

    Err(SallocError::validation(
        "unable to determine a runtime root; pass --root explicitly",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashSet;

    struct FakeProbe {
        uid: u32,
        writable: RefCell<HashSet<PathBuf>>,
    }

    impl RootProbe for FakeProbe {
        fn uid(&self) -> u32 {
            self.uid
        }
        fn is_writable_readable(&self, path: &Path) -> bool {
            self.writable.borrow().contains(path)
        }
    }

    #[test]
    fn explicit_root_short_circuits_everything() {
        let probe = FakeProbe { uid: 0, writable: RefCell::new(HashSet::new()) };
        let root = select_runtime_root(Some("/custom/root"), None, None, &probe).unwrap();
        assert_eq!(root, PathBuf::from("/custom/root"));
    }

    #[test]
    fn uid_zero_without_explicit_root_is_fatal() {
        let probe = FakeProbe { uid: 0, writable: RefCell::new(HashSet::new()) };
        assert!(select_runtime_root(None, Some("/run/user/0"), None, &probe).is_err());
    }

    #[test]
    fn xdg_runtime_dir_wins_when_writable() {
        let mut set = HashSet::new();
        set.insert(PathBuf::from("/run/user/1000"));
        let probe = FakeProbe { uid: 1000, writable: RefCell::new(set) };
        let root = select_runtime_root(None, Some("/run/user/1000"), None, &probe).unwrap();
        assert_eq!(root, PathBuf::from("/run/user/1000"));
    }

    #[test]
    fn falls_back_to_run_user_uid_then_tmpdir() {
        let mut set = HashSet::new();
        set.insert(PathBuf::from("/tmp/1000"));
        let probe = FakeProbe { uid: 1000, writable: RefCell::new(set) };
        let root = select_runtime_root(None, None, Some("/tmp"), &probe).unwrap();
        assert_eq!(root, PathBuf::from("/tmp/1000"));
    }

    #[test]
    fn no_writable_candidate_is_fatal() {
        let probe = FakeProbe { uid: 1000, writable: RefCell::new(HashSet::new()) };
        assert!(select_runtime_root(None, None, None, &probe).is_err());
    }
}

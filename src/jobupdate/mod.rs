//! Job-update client (C7, §4.7): parses `key=value`/`key+=value`/
//! `key-=value` tokens into an [`UpdateRequest`], resolves job-name and
//! array-id references, submits the update, and on a successful
//! single-job resize writes the `sh`/`csh` reset scripts.

pub mod arrayexpand;
pub mod fields;
pub mod resize;

use std::path::Path;

pub use fields::{Op, Token, UpdateRequest};

use crate::error::{SallocError, SallocResult};

/// Seam over the controller queries this client needs beyond the
/// update RPC itself: the current time limit (for `TimeLimit+=`/`-=`),
/// name→job-id resolution, and post-resize allocation facts. The
/// controller daemon this would actually talk to is out of scope
/// (spec.md §1); this trait is the client-side boundary.
pub trait ControllerQuery: Send + Sync {
    fn current_time_limit(&self, job_id: &str) -> SallocResult<u32>;
    fn resolve_name(&self, name: &str, uid: Option<u32>) -> SallocResult<Vec<String>>;
    fn submit_update(&self, job_id: &str, req: &UpdateRequest) -> SallocResult<()>;
    /// Post-resize facts, queried only when a `NumNodes`/`ReqNodes`
    /// change on a single non-array job actually ran successfully.
    fn resized_allocation(&self, job_id: &str) -> SallocResult<resize::ResizedAllocation>;
}

/// Whether `req` touched `NumNodes`/`ReqNodes` — the trigger for the
/// resize-script emission path.
fn is_resize(req: &UpdateRequest) -> bool {
    req.min_nodes.is_some() || req.max_nodes.is_some()
}

/// Run one job-update invocation: parse `tokens`, resolve the target
/// job id(s) (including `Name=` lookup and array-bracket expansion),
/// submit one update per resolved id, and on a successful single-job
/// resize write the reset scripts to `cwd`.
pub fn run(
    tokens: &[String],
    uid_override: Option<u32>,
    cwd: &Path,
    controller: &dyn ControllerQuery,
) -> SallocResult<()> {
    let req = fields::parse_tokens(tokens, |id| controller.current_time_limit(id))?;

    if req.gres_help_requested {
        println!("Gres=help: no GRES help text is available from this client.");
        return Ok(());
    }

    let job_ids = resolve_job_ids(&req, uid_override, controller)?;
    if job_ids.is_empty() {
        return Err(SallocError::validation("no job matched the given JobId/Name"));
    }

    let resize_requested = is_resize(&req);
    let mut last_err = None;
    for id in &job_ids {
        if let Err(e) = controller.submit_update(id, &req) {
            log::error!("update failed for job {id}: {e}");
            last_err = Some(e);
        }
    }
    if let Some(e) = last_err {
        return Err(e);
    }

    if resize_requested && job_ids.len() == 1 {
        let alloc = controller.resized_allocation(&job_ids[0])?;
        let (sh, csh) = resize::write_resize_scripts(cwd, &alloc)?;
        log::info!("wrote resize scripts {} and {}", sh.display(), csh.display());
    }

    Ok(())
}

/// Resolve the concrete job id(s) `req` targets: a `JobId=` (possibly
/// an array-bracket expression) expands via [`arrayexpand`]; a bare
/// `Name=` with no `JobId=` resolves through the controller.
fn resolve_job_ids(
    req: &UpdateRequest,
    uid_override: Option<u32>,
    controller: &dyn ControllerQuery,
) -> SallocResult<Vec<String>> {
    if let Some(job_id_str) = &req.job_id_str {
        return arrayexpand::expand_job_id(job_id_str);
    }
    if let Some(name) = &req.name {
        return controller.resolve_name(name, uid_override);
    }
    Err(SallocError::validation("update token stream named no JobId and no Name"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeController {
        time_limit: u32,
        names: Vec<String>,
        submitted: Mutex<Vec<String>>,
        resized: resize::ResizedAllocation,
    }

    impl ControllerQuery for FakeController {
        fn current_time_limit(&self, _job_id: &str) -> SallocResult<u32> {
            Ok(self.time_limit)
        }
        fn resolve_name(&self, _name: &str, _uid: Option<u32>) -> SallocResult<Vec<String>> {
            Ok(self.names.clone())
        }
        fn submit_update(&self, job_id: &str, _req: &UpdateRequest) -> SallocResult<()> {
            self.submitted.lock().unwrap().push(job_id.to_string());
            Ok(())
        }
        fn resized_allocation(&self, _job_id: &str) -> SallocResult<resize::ResizedAllocation> {
            Ok(self.resized.clone())
        }
    }

    fn fake(names: Vec<String>) -> FakeController {
        FakeController {
            time_limit: 60,
            names,
            submitted: Mutex::new(Vec::new()),
            resized: resize::ResizedAllocation {
                job_id: 42,
                num_nodes: 2,
                node_list: "node[01-02]".to_string(),
                cpus_per_node_rle: "4(x2)".to_string(),
                ntasks: 8,
            },
        }
    }

    #[test]
    fn plain_jobid_submits_one_update() {
        let controller = fake(vec![]);
        let dir = tempfile::tempdir().unwrap();
        run(&["JobId=42".to_string(), "Priority=100".to_string()], None, dir.path(), &controller).unwrap();
        assert_eq!(*controller.submitted.lock().unwrap(), vec!["42".to_string()]);
    }

    #[test]
    fn array_jobid_submits_one_update_per_expanded_id() {
        let controller = fake(vec![]);
        let dir = tempfile::tempdir().unwrap();
        run(&["JobId=42_[1-3]".to_string(), "Priority=100".to_string()], None, dir.path(), &controller).unwrap();
        assert_eq!(
            *controller.submitted.lock().unwrap(),
            vec!["42_1".to_string(), "42_2".to_string(), "42_3".to_string()]
        );
    }

    #[test]
    fn name_without_jobid_resolves_through_the_controller() {
        let controller = fake(vec!["100".to_string(), "101".to_string()]);
        let dir = tempfile::tempdir().unwrap();
        run(&["Name=myjob".to_string(), "Priority=50".to_string()], None, dir.path(), &controller).unwrap();
        assert_eq!(*controller.submitted.lock().unwrap(), vec!["100".to_string(), "101".to_string()]);
    }

    #[test]
    fn resize_on_a_single_job_writes_scripts() {
        let controller = fake(vec![]);
        let dir = tempfile::tempdir().unwrap();
        run(&["JobId=42".to_string(), "NumNodes=4".to_string()], None, dir.path(), &controller).unwrap();
        assert!(dir.path().join("slurm_job_42_resize.sh").exists());
        assert!(dir.path().join("slurm_job_42_resize.csh").exists());
    }

    #[test]
    fn resize_on_an_array_expression_does_not_write_scripts() {
        let controller = fake(vec![]);
        let dir = tempfile::tempdir().unwrap();
        run(&["JobId=42_[1-2]".to_string(), "NumNodes=4".to_string()], None, dir.path(), &controller).unwrap();
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn gres_help_short_circuits_without_submitting() {
        let controller = fake(vec![]);
        let dir = tempfile::tempdir().unwrap();
        run(&["JobId=42".to_string(), "Gres=help".to_string()], None, dir.path(), &controller).unwrap();
        assert!(controller.submitted.lock().unwrap().is_empty());
    }

    #[test]
    fn neither_jobid_nor_name_is_rejected() {
        let controller = fake(vec![]);
        let dir = tempfile::tempdir().unwrap();
        let result = run(&["Priority=100".to_string()], None, dir.path(), &controller);
        assert!(result.is_err());
    }
}

//! Resize-script emission (§4.7's last paragraph): after a successful
//! resize of a single non-array job, write a pair of scripts to the
//! current directory that reset the `SLURM_*` environment variables
//! (§6's "Environment output" set) a still-running shell session may
//! have cached from the original allocation.

use std::io::Write as _;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::error::SallocResult;

/// Post-resize allocation facts the emitted scripts reset the
/// environment to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizedAllocation {
    pub job_id: u32,
    pub num_nodes: u32,
    pub node_list: String,
    pub cpus_per_node_rle: String,
    pub ntasks: u32,
}

/// Write `slurm_job_<id>_resize.sh` (POSIX `sh`) and
/// `slurm_job_<id>_resize.csh` (`csh`) to `dir`, both mode 0700.
/// Returns the two paths written.
pub fn write_resize_scripts(dir: &Path, alloc: &ResizedAllocation) -> SallocResult<(PathBuf, PathBuf)> {
    let sh_path = dir.join(format!("slurm_job_{}_resize.sh", alloc.job_id));
    let csh_path = dir.join(format!("slurm_job_{}_resize.csh", alloc.job_id));

    write_executable(&sh_path, &sh_script(alloc))?;
    write_executable(&csh_path, &csh_script(alloc))?;

    Ok((sh_path, csh_path))
}

fn write_executable(path: &Path, contents: &str) -> SallocResult<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(contents.as_bytes())?;
    file.set_permissions(std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}

fn sh_script(alloc: &ResizedAllocation) -> String {
    format!(
        "#!/bin/sh\n\
         # Resets SLURM_* variables in-scope after `JobId={job_id}` was resized.\n\
         export SLURM_JOB_ID={job_id}\n\
         export SLURM_NNODES={num_nodes}\n\
         export SLURM_JOB_NUM_NODES={num_nodes}\n\
         export SLURM_JOB_NODELIST={node_list}\n\
         export SLURM_NODELIST={node_list}\n\
         export SLURM_JOB_CPUS_PER_NODE={cpus_rle}\n\
         export SLURM_NTASKS={ntasks}\n\
         export SLURM_NPROCS={ntasks}\n",
        job_id = alloc.job_id,
        num_nodes = alloc.num_nodes,
        node_list = alloc.node_list,
        cpus_rle = alloc.cpus_per_node_rle,
        ntasks = alloc.ntasks,
    )
}

fn csh_script(alloc: &ResizedAllocation) -> String {
    format!(
        "#!/bin/csh\n\
         # Resets SLURM_* variables in-scope after `JobId={job_id}` was resized.\n\
         setenv SLURM_JOB_ID {job_id}\n\
         setenv SLURM_NNODES {num_nodes}\n\
         setenv SLURM_JOB_NUM_NODES {num_nodes}\n\
         setenv SLURM_JOB_NODELIST {node_list}\n\
         setenv SLURM_NODELIST {node_list}\n\
         setenv SLURM_JOB_CPUS_PER_NODE {cpus_rle}\n\
         setenv SLURM_NTASKS {ntasks}\n\
         setenv SLURM_NPROCS {ntasks}\n",
        job_id = alloc.job_id,
        num_nodes = alloc.num_nodes,
        node_list = alloc.node_list,
        cpus_rle = alloc.cpus_per_node_rle,
        ntasks = alloc.ntasks,
    )
}

//! The option model (C2): a typed allocation-request descriptor
//! ([`job_desc::JobDesc`]), its `Option<T>` overlay form
//! ([`partial::PartialJobDesc`]), the three fill passes (defaults, env,
//! argv), and the cross-field inference/validation that runs once the
//! passes are merged (§4.2).

pub mod argv;
pub mod defaults;
pub mod env_overlay;
pub mod job_desc;
pub mod partial;
pub mod validate;

pub use job_desc::{HetJob, JobDesc};
pub use validate::build_hetjob;

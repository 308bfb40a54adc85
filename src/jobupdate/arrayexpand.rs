//! Job-array id expansion (§4.7): `JobId=42_[1-3,5]` expands to the four
//! identifiers `42_1`, `42_2`, `42_3`, `42_5` in that order, the same
//! hostlist-style bracket/range/comma grammar the node-list parser uses
//! for host names but here applied to the `_`-suffixed array-task
//! index.

use crate::error::SallocError;

/// Expand one job identifier into the list of concrete identifiers it
/// names. A plain identifier (no `_[...]`) expands to itself; a
/// `_[...]` suffix expands to one identifier per index in the bracket
/// expression, preserving the order written.
pub fn expand_job_id(job_id: &str) -> Result<Vec<String>, SallocError> {
    let Some((base, rest)) = job_id.split_once('_') else {
        return Ok(vec![job_id.to_string()]);
    };

    let Some(inner) = rest.strip_prefix('[').and_then(|s| s.strip_suffix(']')) else {
        // A bare `base_N` task id, not a bracket expression.
        return Ok(vec![job_id.to_string()]);
    };

    let mut out = Vec::new();
    for part in inner.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(SallocError::parse("JobId", format!("empty range element in '{job_id}'")));
        }
        match part.split_once('-') {
            Some((lo, hi)) => {
                let lo: u64 = lo
                    .parse()
                    .map_err(|_| SallocError::parse("JobId", format!("invalid range start '{lo}' in '{job_id}'")))?;
                let hi: u64 = hi
                    .parse()
                    .map_err(|_| SallocError::parse("JobId", format!("invalid range end '{hi}' in '{job_id}'")))?;
                if hi < lo {
                    return Err(SallocError::parse("JobId", format!("range '{part}' is descending in '{job_id}'")));
                }
                for i in lo..=hi {
                    out.push(format!("{base}_{i}"));
                }
            }
            None => {
                let i: u64 = part
                    .parse()
                    .map_err(|_| SallocError::parse("JobId", format!("invalid index '{part}' in '{job_id}'")))?;
                out.push(format!("{base}_{i}"));
            }
        }
    }
    Ok(out)
}

/// Whether a job identifier names exactly one job (no bracket
/// expression) — the precondition for allowing a resize (§4.7's last
/// paragraph: "runs only when the identifier matches a single
/// non-array job").
pub fn is_single_job(job_id: &str) -> bool {
    expand_job_id(job_id).map(|v| v.len() == 1).unwrap_or(false)
}

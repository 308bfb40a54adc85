//! Submit-retry policy, generalizing the teacher's
//! `RetryConfig`/`retry_with_backoff` from exponential backoff over any
//! operation to the linear, error-kind-restricted rule of §4.4: up to
//! ten attempts, sleeping `attempt` seconds between them, only for
//! `ERROR_ON_DESC_TO_RECORD_COPY` and `EAGAIN`-shaped failures.

use std::thread;
use std::time::Duration;

use crate::error::{SallocError, SallocResult};

/// Linear submit-retry policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Per-attempt sleep unit; attempt `n` sleeps `n * unit`.
    pub unit: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 10,
            unit: Duration::from_secs(1),
        }
    }
}

/// Whether `err` belongs to the retryable submit-error set of §4.4.
///
/// The wire transport surfaces both conditions as
/// [`SallocError::SubmitError`] with [`crate::error::SubmitErrorKind::QueueBusy`]
/// (the `EAGAIN`-shaped "try again" case) or as a
/// [`SallocError::TransportError`] tagged with the controller's literal
/// `ESLURM_ERROR_ON_DESC_TO_RECORD_COPY` string.
fn is_retryable(err: &SallocError) -> bool {
    if err.is_retryable_submit() {
        return true;
    }
    matches!(
        err,
        SallocError::TransportError(msg) if msg.contains("ERROR_ON_DESC_TO_RECORD_COPY")
    )
}

/// Run `op` under the retry policy, sleeping linearly between attempts.
///
/// `op` is retried only while it fails with [`is_retryable`] errors and
/// fewer than `config.max_attempts` attempts have been made; any other
/// error is returned immediately.
pub fn retry_submit<F, T>(config: RetryConfig, mut op: F) -> SallocResult<T>
where
    F: FnMut(u32) -> SallocResult<T>,
{
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(v) => return Ok(v),
            Err(e) if attempt < config.max_attempts && is_retryable(&e) => {
                thread::sleep(config.unit * attempt);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SubmitErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            unit: Duration::from_millis(1),
        }
    }

    #[test]
    fn succeeds_on_first_attempt_without_sleeping() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_submit(fast_config(), |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok::<_, SallocError>(42)
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn retries_queue_busy_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_submit(fast_config(), move |_| {
            let n = c.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(SallocError::submit(SubmitErrorKind::QueueBusy, "busy"))
            } else {
                Ok(7)
            }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: SallocResult<()> = retry_submit(fast_config(), move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Err(SallocError::submit(SubmitErrorKind::QueueBusy, "busy"))
        });
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn configuration_conflict_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: SallocResult<()> = retry_submit(fast_config(), move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Err(SallocError::submit(
                SubmitErrorKind::ConfigurationConflict,
                "bad partition",
            ))
        });
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn error_on_desc_to_record_copy_is_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_submit(fast_config(), move |_| {
            let n = c.fetch_add(1, Ordering::SeqCst);
            if n < 1 {
                Err(SallocError::TransportError(
                    "ESLURM_ERROR_ON_DESC_TO_RECORD_COPY".to_string(),
                ))
            } else {
                Ok(())
            }
        });
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

//! Error types shared by the allocation, container, and job-update front-ends.
//!
//! Every binary in this workspace (`salloc`, `scrun`, `slurm-update-job`)
//! funnels its failures through [`SallocError`] so that the exit-code and
//! diagnostic-message policy of the allocation protocol stays uniform
//! across tools.

use thiserror::Error;

/// All failure kinds a front-end can produce.
///
/// The variant names mirror the error *kinds* named by the allocation
/// protocol design, not arbitrary implementation details: `ParseError` for
/// malformed option values, `ValidationError` for cross-field invariant
/// failures, `SubmitError`/`TransportError`/`Revoked` for the controller
/// RPC layer, `UserAbort` for signal-driven cancellation, and `Internal`
/// for states that should never occur.
#[derive(Error, Debug)]
pub enum SallocError {
    /// A value parser (node count, time, memory, signal, ...) rejected its
    /// input. The offending token is embedded in the message.
    #[error("invalid value for {field}: {message}")]
    ParseError {
        /// Name of the option or field being parsed.
        field: String,
        /// Description of why the token was rejected.
        message: String,
    },

    /// A cross-field invariant of the option model failed after the
    /// defaults/env/argv overlay completed.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// The controller refused the allocation request.
    #[error("submit error ({kind}): {message}")]
    SubmitError {
        /// One of the documented submit-refusal subkinds.
        kind: SubmitErrorKind,
        /// Controller-provided detail message.
        message: String,
    },

    /// The RPC transport to the controller or container anchor failed.
    #[error("transport error: {0}")]
    TransportError(String),

    /// The allocation was revoked by the controller before or after the
    /// user command ran.
    #[error("allocation revoked: {0}")]
    Revoked(String),

    /// A signal delivered during the blocking submit/wait phase aborted
    /// the operation on the user's behalf.
    #[error("interrupted by signal")]
    UserAbort,

    /// An invariant that the protocol guarantees was broken; this should
    /// never be observed and indicates a bug in this client.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O failure (reading a hostfile, writing a resize script, opening
    /// a unix socket, ...).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure (OCI bundle config, container
    /// state, wire protocol messages).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for failures that do not need a dedicated variant.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Subkinds of [`SallocError::SubmitError`], per §7 of the allocation
/// protocol design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitErrorKind {
    /// The controller's queue is busy; retry later.
    QueueBusy,
    /// The request conflicts with cluster configuration (bad partition,
    /// QOS, account, ...).
    ConfigurationConflict,
    /// The job reached the head of the queue but is not yet top priority.
    NotTopPriority,
    /// The requested nodes are currently busy.
    NodesBusy,
    /// `immediate=N` elapsed before the request could be satisfied.
    Timeout,
}

impl std::fmt::Display for SubmitErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SubmitErrorKind::QueueBusy => "queue busy, try later",
            SubmitErrorKind::ConfigurationConflict => "configuration conflict",
            SubmitErrorKind::NotTopPriority => "not top priority",
            SubmitErrorKind::NodesBusy => "nodes busy",
            SubmitErrorKind::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// Specialized `Result` type used throughout this workspace.
pub type SallocResult<T> = Result<T, SallocError>;

impl SallocError {
    /// Construct a [`SallocError::ParseError`].
    pub fn parse<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        SallocError::ParseError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Construct a [`SallocError::ValidationError`].
    pub fn validation<M: Into<String>>(message: M) -> Self {
        SallocError::ValidationError(message.into())
    }

    /// Construct a [`SallocError::SubmitError`].
    pub fn submit<M: Into<String>>(kind: SubmitErrorKind, message: M) -> Self {
        SallocError::SubmitError {
            kind,
            message: message.into(),
        }
    }

    /// Whether the submit-retry loop (§4.4) should retry this error.
    pub fn is_retryable_submit(&self) -> bool {
        matches!(
            self,
            SallocError::SubmitError {
                kind: SubmitErrorKind::QueueBusy | SubmitErrorKind::NodesBusy,
                ..
            }
        )
    }

    /// Process exit code for this error. The controller-configurable
    /// `SLURM_EXIT_ERROR`/`SLURM_EXIT_IMMEDIATE` values of §6 both default
    /// to 1; callers that need the immediate-mode-specific code read it
    /// from [`crate::config::RuntimeConfig`] instead of this method.
    pub fn exit_code(&self) -> i32 {
        match self {
            SallocError::UserAbort => 0,
            _ => 1,
        }
    }

    /// Human-readable message with the diagnostic prefix conventions of
    /// §7: short, actionable, no stack traces.
    pub fn user_friendly_message(&self, program: &str) -> String {
        match self {
            SallocError::ParseError { field, message } => {
                format!("{program}: error: {field}: {message}")
            }
            SallocError::ValidationError(msg) => format!("{program}: error: {msg}"),
            SallocError::SubmitError { message, .. } => {
                format!("{program}: error: {message}")
            }
            SallocError::TransportError(msg) => format!("{program}: error: {msg}"),
            SallocError::Revoked(msg) => format!("{program}: {msg}"),
            SallocError::UserAbort => format!("{program}: interrupted"),
            SallocError::Internal(msg) => format!("{program}: internal error: {msg}"),
            SallocError::Io(e) => format!("{program}: error: {e}"),
            SallocError::Json(e) => format!("{program}: error: {e}"),
            SallocError::Other(e) => format!("{program}: error: {e}"),
        }
    }
}

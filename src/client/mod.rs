//! Allocation client (C4): the synchronous "submit and block until
//! granted/denied" RPC described in §4.4, plus the listener thread and
//! the node-readiness and job-completion operations around it.
//!
//! The controller daemon itself is explicitly out of scope (spec.md
//! §1); [`protocol::Transport`] is the seam that stands in for it.

pub mod allocation;
pub mod cancel;
pub mod listener;
pub mod protocol;
pub mod retry;
pub mod state;

pub use allocation::AllocationClient;
pub use protocol::{AllocationResponse, ListenerMessage, SupervisorMsg, Transport};
pub use retry::RetryConfig;
pub use state::AllocState;

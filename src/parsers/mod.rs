//! Pure, reentrant value parsers for allocation-request option strings.
//!
//! Each parser in this module takes the raw string a user (or an
//! environment variable, or a translated wrapper-directive token) supplied
//! for one option and either returns a typed value or a
//! [`crate::error::SallocError::ParseError`] naming the offending token.
//! None of these functions touch global state.

pub mod compression;
pub mod distribution;
pub mod geometry;
pub mod mail_type;
pub mod mem;
pub mod node_count;
pub mod resource_tuple;
pub mod signal;
pub mod time;
pub mod tres;

pub use compression::{Compression, parse_compression};
pub use distribution::{DistLevel, Distribution, parse_distribution};
pub use geometry::parse_geometry;
pub use mail_type::{MailType, parse_mail_type};
pub use mem::parse_mem_mb;
pub use node_count::{NodeCount, parse_node_count};
pub use resource_tuple::{ResourceTuple, parse_resource_tuple};
pub use signal::{SignalSpec, parse_signal_spec, sig_name_to_num};
pub use time::parse_time_minutes;
pub use tres::format_tres_list;

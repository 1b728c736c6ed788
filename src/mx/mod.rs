//! DNS MX resolution.
//!
//! [`resolve_mx`] performs exactly one query through a [`LookupMx`]
//! implementation; [`check_mx`] is the standalone entry point using the
//! system resolver.

mod error;
mod resolver;
mod types;

pub use error::DnsFailure;
pub use resolver::{LookupMx, SystemMxLookup, check_mx, resolve_mx};
pub use types::MxRecord;

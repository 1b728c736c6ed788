#![forbid(unsafe_code)]
//! mailprovider_lib: identify the calendar/e-mail provider behind an address.
//!
//! Resolution looks up the domain's MX records, matches the exchange host names
//! against a [`ProviderCatalog`], and when that is inconclusive opens an SMTP
//! session per host, sends `EHLO` and matches the reply lines.
//!
//! ```no_run
//! let result = mailprovider_lib::resolve_provider("someone@example.com");
//! if let Some(provider) = &result.provider {
//!     println!("{provider}: {}", result.clue.as_deref().unwrap_or_default());
//! } else if let Some(reason) = &result.failure_reason {
//!     eprintln!("{reason}");
//! }
//! ```

mod trace;

pub mod address;
pub mod cancel;
pub mod catalog;
pub mod mx;
pub mod probe;
pub mod provider;

pub use address::{AddressError, EmailAddress, parse_address};
pub use cancel::CancelToken;
pub use catalog::{CatalogEntry, CatalogMatch, ProviderCatalog};
pub use mx::{DnsFailure, LookupMx, MxRecord, SystemMxLookup, check_mx, resolve_mx};
pub use probe::{EhloProbe, EhloTranscript, SmtpProbe};
pub use provider::{
    FailureKind, ProviderResolver, ResolutionResult, ResolveFailure, ResolveOptions, RunMode,
    UnknownRunMode, resolve_provider, resolve_provider_with_options,
};

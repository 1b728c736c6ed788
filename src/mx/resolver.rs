use std::collections::HashSet;
use std::time::Duration;

use trust_dns_resolver::{
    Resolver,
    error::{ResolveError, ResolveErrorKind},
    proto::op::ResponseCode,
    system_conf::read_system_conf,
};

use super::{DnsFailure, MxRecord};
use crate::trace::event;

/// Source of MX answers. Implemented for the system resolver; tests and
/// embedders can supply their own.
pub trait LookupMx {
    /// Raw MX answers for an ASCII domain, waiting at most `timeout`.
    /// NXDOMAIN and NODATA are an empty `Ok`, every other failure is
    /// [`DnsFailure::QueryError`].
    fn lookup_mx(
        &self,
        ascii_domain: &str,
        timeout: Duration,
    ) -> Result<Vec<MxRecord>, DnsFailure>;
}

impl<T: LookupMx + ?Sized> LookupMx for &T {
    fn lookup_mx(
        &self,
        ascii_domain: &str,
        timeout: Duration,
    ) -> Result<Vec<MxRecord>, DnsFailure> {
        (**self).lookup_mx(ascii_domain, timeout)
    }
}

/// System-configured resolver, rebuilt for every query: one attempt, no cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemMxLookup;

impl SystemMxLookup {
    fn build(timeout: Duration) -> Result<Resolver, ResolveError> {
        let (config, mut opts) = read_system_conf().map_err(ResolveError::from)?;
        opts.timeout = timeout;
        opts.attempts = 1;
        Resolver::new(config, opts).map_err(ResolveError::from)
    }
}

impl LookupMx for SystemMxLookup {
    fn lookup_mx(
        &self,
        ascii_domain: &str,
        timeout: Duration,
    ) -> Result<Vec<MxRecord>, DnsFailure> {
        let resolver =
            Self::build(timeout).map_err(|err| DnsFailure::query(ascii_domain, err))?;
        let lookup = match resolver.mx_lookup(ascii_domain) {
            Ok(lookup) => lookup,
            Err(err) if should_treat_as_empty(&err) => return Ok(Vec::new()),
            Err(err) => return Err(DnsFailure::query(ascii_domain, err)),
        };
        Ok(lookup
            .iter()
            .map(|mx| {
                MxRecord::new(
                    mx.preference(),
                    normalize_exchange(&mx.exchange().to_utf8()),
                )
            })
            .collect())
    }
}

/// Query `ascii_domain` once through `lookup`, bounded by `timeout`.
///
/// Records come back stably sorted by ascending priority, so hosts sharing a
/// priority keep the order DNS gave them. Repeated records are dropped, the
/// first occurrence stays.
pub fn resolve_mx<L>(
    lookup: &L,
    ascii_domain: &str,
    timeout: Duration,
) -> Result<Vec<MxRecord>, DnsFailure>
where
    L: LookupMx + ?Sized,
{
    let mut records = lookup.lookup_mx(ascii_domain, timeout)?;
    let mut seen = HashSet::new();
    records.retain(|record| seen.insert((record.priority, record.exchange_host.clone())));
    records.sort_by_key(|record| record.priority);

    if records.is_empty() {
        event!(debug, domain = ascii_domain, "no MX answers");
        return Err(DnsFailure::no_records(ascii_domain));
    }
    event!(
        debug,
        domain = ascii_domain,
        count = records.len(),
        "MX lookup succeeded"
    );
    Ok(records)
}

/// Lookup MX records for `domain` using the system resolver.
///
/// The domain is normalized via IDNA before querying DNS.
pub fn check_mx(domain: &str, timeout: Duration) -> Result<Vec<MxRecord>, DnsFailure> {
    let ascii = normalize_domain(domain)?;
    resolve_mx(&SystemMxLookup, &ascii, timeout)
}

pub(crate) fn normalize_domain(domain: &str) -> Result<String, DnsFailure> {
    let trimmed = domain.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(DnsFailure::query(domain, "domain is empty"));
    }
    idna::domain_to_ascii(trimmed)
        .map(|ascii| ascii.to_ascii_lowercase())
        .map_err(|err| DnsFailure::query(domain, format!("IDNA conversion failed: {err}")))
}

pub(crate) fn normalize_exchange(exchange: &str) -> String {
    exchange.trim_end_matches('.').to_ascii_lowercase()
}

// SERVFAIL and REFUSED also surface as NoRecordsFound; only NXDOMAIN and
// NODATA mean "no records".
fn should_treat_as_empty(err: &ResolveError) -> bool {
    matches!(
        err.kind(),
        ResolveErrorKind::NoRecordsFound {
            response_code: ResponseCode::NXDomain | ResponseCode::NoError,
            ..
        }
    )
}

//! Provider resolution: address → MX records → hostname and EHLO heuristics.
//!
//! The public entry points are [`resolve_provider`] and
//! [`ProviderResolver::resolve`]. Neither returns an error: every failure is
//! reported through [`ResolutionResult::failure_reason`] so callers can branch
//! on a single field.

mod error;
mod options;
mod types;

pub use error::ResolveFailure;
pub use options::{ResolveOptions, RunMode, UnknownRunMode};
pub use types::{FailureKind, ResolutionResult};

use std::thread;

use crate::address::parse_address;
use crate::catalog::ProviderCatalog;
use crate::mx::{DnsFailure, LookupMx, MxRecord, SystemMxLookup, resolve_mx};
use crate::probe::{EhloProbe, EhloTranscript, SmtpProbe};
use crate::trace::event;

/// Resolve `email` with the default catalog and options (fast mode).
pub fn resolve_provider(email: &str) -> ResolutionResult {
    resolve_provider_with_options(email, ResolveOptions::default())
}

/// Identical to [`resolve_provider`], but allows choosing the run mode,
/// timeouts and probe details.
pub fn resolve_provider_with_options(email: &str, options: ResolveOptions) -> ResolutionResult {
    ProviderResolver::new(ProviderCatalog::default(), options).resolve(email)
}

/// Resolver bound to a catalog, options, an MX source and an EHLO probe.
///
/// Holds no mutable state; one instance can serve concurrent resolutions.
#[derive(Debug, Clone)]
pub struct ProviderResolver<L = SystemMxLookup, P = SmtpProbe> {
    catalog: ProviderCatalog,
    options: ResolveOptions,
    lookup: L,
    probe: P,
}

impl ProviderResolver {
    pub fn new(catalog: ProviderCatalog, options: ResolveOptions) -> Self {
        let lookup = SystemMxLookup;
        let probe = SmtpProbe {
            port: options.port,
            helo_name: options.helo_name.clone(),
        };
        Self::with_parts(catalog, options, lookup, probe)
    }
}

impl<L, P> ProviderResolver<L, P>
where
    L: LookupMx,
    P: EhloProbe,
{
    pub fn with_parts(catalog: ProviderCatalog, options: ResolveOptions, lookup: L, probe: P) -> Self {
        Self {
            catalog,
            options,
            lookup,
            probe,
        }
    }

    pub fn catalog(&self) -> &ProviderCatalog {
        &self.catalog
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    #[cfg_attr(
        feature = "with-tracing",
        tracing::instrument(skip(self), fields(mode = %self.options.mode))
    )]
    pub fn resolve(&self, email: &str) -> ResolutionResult {
        let address = match parse_address(email) {
            Ok(address) => address,
            Err(err) => {
                return ResolutionResult::failed(email, &ResolveFailure::from(err), Vec::new());
            }
        };
        let domain = address.domain.as_str();
        let cancel = &self.options.cancel;

        if cancel.is_cancelled() {
            return ResolutionResult::failed(email, &ResolveFailure::cancelled(domain), Vec::new());
        }

        // the deadline also caps the DNS query, which cannot be interrupted
        let dns_timeout = cancel.bound(self.options.timeout);
        let records = match resolve_mx(&self.lookup, &address.ascii_domain, dns_timeout) {
            Ok(records) => records,
            Err(_) if cancel.is_cancelled() => {
                return ResolutionResult::failed(
                    email,
                    &ResolveFailure::cancelled(domain),
                    Vec::new(),
                );
            }
            Err(err) => {
                event!(warn, domain, error = %err, "MX lookup failed");
                return ResolutionResult::failed(email, &dns_failure(domain, &err), Vec::new());
            }
        };

        let scan = match self.options.mode {
            RunMode::Fast => self.scan_fast(&records),
            RunMode::Diagnostic => self.scan_diagnostic(&records),
        };

        match scan.evidence {
            Some(evidence) => {
                event!(info, domain, provider = %evidence.provider, "provider resolved");
                ResolutionResult::found(email, evidence.provider, evidence.clue, scan.details)
            }
            None => {
                let failure = self.miss_reason(domain, &records, &scan);
                event!(info, domain, reason = %failure, "provider not resolved");
                ResolutionResult::failed(email, &failure, scan.details)
            }
        }
    }

    /// Stops at the first match. A hostname hit ends the scan before that
    /// host is probed.
    fn scan_fast(&self, records: &[MxRecord]) -> Scan {
        let mut details = Vec::new();
        for record in records {
            if self.options.cancel.is_cancelled() {
                return Scan::interrupted(details);
            }
            if let Some(evidence) = hostname_evidence(&self.catalog, &record.exchange_host) {
                return Scan::matched(evidence, details);
            }
            let transcript = self.probe_record(record);
            let evidence = transcript_evidence(&self.catalog, &transcript);
            let cancelled = transcript.cancelled;
            details.push(transcript);
            if let Some(evidence) = evidence {
                return Scan::matched(evidence, details);
            }
            if cancelled {
                return Scan::interrupted(details);
            }
        }
        Scan::exhausted(details)
    }

    /// Probes every host; the first evidence in MX order wins.
    fn scan_diagnostic(&self, records: &[MxRecord]) -> Scan {
        let details = if self.options.parallel_probes && records.len() > 1 {
            self.probe_parallel(records)
        } else {
            self.probe_sequential(records)
        };

        let evidence = records.iter().enumerate().find_map(|(index, record)| {
            hostname_evidence(&self.catalog, &record.exchange_host).or_else(|| {
                details
                    .get(index)
                    .and_then(|transcript| transcript_evidence(&self.catalog, transcript))
            })
        });
        let cancelled =
            details.len() < records.len() || details.iter().any(|transcript| transcript.cancelled);

        Scan {
            evidence,
            details,
            cancelled,
        }
    }

    fn probe_sequential(&self, records: &[MxRecord]) -> Vec<EhloTranscript> {
        let mut details = Vec::with_capacity(records.len());
        for record in records {
            if self.options.cancel.is_cancelled() {
                break;
            }
            details.push(self.probe_record(record));
        }
        details
    }

    // Results are joined in spawn order, so they stay in MX priority order.
    fn probe_parallel(&self, records: &[MxRecord]) -> Vec<EhloTranscript> {
        let probe = &self.probe;
        let options = &self.options;
        thread::scope(|scope| {
            let handles: Vec<_> = records
                .iter()
                .map(|record| (record, scope.spawn(move || probe_record(probe, record, options))))
                .collect();
            handles
                .into_iter()
                .map(|(record, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        let mut transcript = EhloTranscript::connect_failed(
                            record.exchange_host.clone(),
                            "probe thread panicked",
                        );
                        transcript.priority = record.priority;
                        transcript
                    })
                })
                .collect()
        })
    }

    fn probe_record(&self, record: &MxRecord) -> EhloTranscript {
        probe_record(&self.probe, record, &self.options)
    }

    fn miss_reason(&self, domain: &str, records: &[MxRecord], scan: &Scan) -> ResolveFailure {
        if scan.cancelled || self.options.cancel.is_cancelled() {
            return ResolveFailure::cancelled(domain);
        }
        if let [only] = records {
            if scan
                .details
                .first()
                .is_some_and(|transcript| transcript.connect_error.is_some())
            {
                return ResolveFailure::ProbeConnection {
                    host: only.exchange_host.clone(),
                    domain: domain.to_string(),
                };
            }
        }
        ResolveFailure::NoMatch {
            domain: domain.to_string(),
        }
    }
}

fn probe_record<P: EhloProbe>(
    probe: &P,
    record: &MxRecord,
    options: &ResolveOptions,
) -> EhloTranscript {
    event!(debug, host = %record.exchange_host, priority = record.priority, "probing MX host");
    let mut transcript = probe.probe(&record.exchange_host, options.timeout, &options.cancel);
    transcript.priority = record.priority;
    transcript
}

fn dns_failure(domain: &str, err: &DnsFailure) -> ResolveFailure {
    match err {
        DnsFailure::QueryError { .. } => ResolveFailure::DnsQuery {
            domain: domain.to_string(),
        },
        DnsFailure::NoRecords { .. } => ResolveFailure::NoRecords {
            domain: domain.to_string(),
        },
    }
}

struct Evidence {
    provider: String,
    clue: String,
}

struct Scan {
    evidence: Option<Evidence>,
    details: Vec<EhloTranscript>,
    cancelled: bool,
}

impl Scan {
    fn matched(evidence: Evidence, details: Vec<EhloTranscript>) -> Self {
        Self {
            evidence: Some(evidence),
            details,
            cancelled: false,
        }
    }

    fn interrupted(details: Vec<EhloTranscript>) -> Self {
        Self {
            evidence: None,
            details,
            cancelled: true,
        }
    }

    fn exhausted(details: Vec<EhloTranscript>) -> Self {
        Self {
            evidence: None,
            details,
            cancelled: false,
        }
    }
}

fn hostname_evidence(catalog: &ProviderCatalog, exchange_host: &str) -> Option<Evidence> {
    let provider = catalog.lookup_by_hostname(exchange_host)?;
    Some(Evidence {
        provider: provider.to_string(),
        clue: format!("The domain name of the MX host is {exchange_host}."),
    })
}

fn transcript_evidence(catalog: &ProviderCatalog, transcript: &EhloTranscript) -> Option<Evidence> {
    transcript.response_lines.iter().find_map(|line| {
        if let Some(provider) = catalog.lookup_by_hostname(line) {
            return Some(Evidence {
                provider: provider.to_string(),
                clue: format!(
                    "The domain name the SMTP server claims in its EHLO response is {line}."
                ),
            });
        }
        catalog.lookup_by_capability_token(line).map(|provider| Evidence {
            provider: provider.to_string(),
            clue: format!(
                "The SMTP server claims in its EHLO response to support {line}, which is a proprietary extension."
            ),
        })
    })
}

#[cfg(test)]
mod tests;

use thiserror::Error;
use trust_dns_resolver::error::ResolveError;

/// Why an MX query produced no usable records.
#[derive(Debug, Error)]
pub enum DnsFailure {
    /// The resolver could not be built, could not reach a server, or got an
    /// error response other than NXDOMAIN/NODATA.
    #[error("MX lookup failed for {domain}: {source}")]
    QueryError {
        domain: String,
        #[source]
        source: ResolveError,
    },
    /// The query succeeded but carried zero MX answers.
    #[error("no MX records for {domain}")]
    NoRecords { domain: String },
}

impl DnsFailure {
    pub fn query(domain: impl Into<String>, source: impl Into<ResolveError>) -> Self {
        Self::QueryError {
            domain: domain.into(),
            source: source.into(),
        }
    }

    pub(crate) fn no_records(domain: impl Into<String>) -> Self {
        Self::NoRecords {
            domain: domain.into(),
        }
    }

    pub fn domain(&self) -> &str {
        match self {
            Self::QueryError { domain, .. } | Self::NoRecords { domain } => domain,
        }
    }
}

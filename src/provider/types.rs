use crate::probe::EhloTranscript;

use super::ResolveFailure;

/// Machine-readable class of a failed resolution.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    EmptyAddress,
    InvalidAddress,
    DnsQuery,
    NoRecords,
    ProbeConnection,
    NoMatch,
    Cancelled,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmptyAddress => "empty_address",
            Self::InvalidAddress => "invalid_address",
            Self::DnsQuery => "dns_query",
            Self::NoRecords => "no_records",
            Self::ProbeConnection => "probe_connection",
            Self::NoMatch => "no_match",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Outcome of [`ProviderResolver::resolve`](crate::ProviderResolver::resolve).
///
/// Either `provider` is set and `failure_reason` is `None`, or the reverse.
/// `details` holds every transcript gathered, on success and on failure.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    pub email_address: String,
    pub provider: Option<String>,
    pub clue: Option<String>,
    pub failure_reason: Option<String>,
    pub details: Vec<EhloTranscript>,
    #[cfg_attr(feature = "with-serde", serde(skip))]
    pub failure: Option<FailureKind>,
}

impl ResolutionResult {
    pub(crate) fn found(
        email_address: impl Into<String>,
        provider: impl Into<String>,
        clue: impl Into<String>,
        details: Vec<EhloTranscript>,
    ) -> Self {
        Self {
            email_address: email_address.into(),
            provider: Some(provider.into()),
            clue: Some(clue.into()),
            failure_reason: None,
            details,
            failure: None,
        }
    }

    pub(crate) fn failed(
        email_address: impl Into<String>,
        failure: &ResolveFailure,
        details: Vec<EhloTranscript>,
    ) -> Self {
        Self {
            email_address: email_address.into(),
            provider: None,
            clue: None,
            failure_reason: Some(failure.to_string()),
            details,
            failure: Some(failure.kind()),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.failure_reason.is_none()
    }
}

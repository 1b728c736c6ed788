use thiserror::Error;

use crate::address::AddressError;

use super::FailureKind;

/// User-facing reasons a resolution ended without a provider. The `Display`
/// text is what lands in `ResolutionResult::failure_reason`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveFailure {
    #[error("email address is empty")]
    EmptyAddress,
    #[error("invalid email address: {address}")]
    InvalidAddress { address: String },
    #[error("DNS lookup failed for {domain}")]
    DnsQuery { domain: String },
    #[error("no mail-exchange records for {domain}")]
    NoRecords { domain: String },
    #[error("could not connect to mail exchange {host} for {domain}")]
    ProbeConnection { host: String, domain: String },
    #[error("could not determine the email provider for {domain}")]
    NoMatch { domain: String },
    #[error("resolution cancelled for {target}")]
    Cancelled { target: String },
}

impl ResolveFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::EmptyAddress => FailureKind::EmptyAddress,
            Self::InvalidAddress { .. } => FailureKind::InvalidAddress,
            Self::DnsQuery { .. } => FailureKind::DnsQuery,
            Self::NoRecords { .. } => FailureKind::NoRecords,
            Self::ProbeConnection { .. } => FailureKind::ProbeConnection,
            Self::NoMatch { .. } => FailureKind::NoMatch,
            Self::Cancelled { .. } => FailureKind::Cancelled,
        }
    }

    pub(crate) fn cancelled(target: impl Into<String>) -> Self {
        Self::Cancelled {
            target: target.into(),
        }
    }
}

impl From<AddressError> for ResolveFailure {
    fn from(err: AddressError) -> Self {
        match err {
            AddressError::Empty => Self::EmptyAddress,
            AddressError::Invalid { address, .. } => Self::InvalidAddress { address },
        }
    }
}

use thiserror::Error;

/// Reasons an input string is not a usable e-mail address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("email address is empty")]
    Empty,
    #[error("invalid email address: {address}")]
    Invalid {
        address: String,
        reasons: Vec<String>,
    },
}

impl AddressError {
    pub(crate) fn invalid(address: impl Into<String>, reasons: Vec<String>) -> Self {
        Self::Invalid {
            address: address.into(),
            reasons,
        }
    }

    /// Individual validation failures, empty for [`AddressError::Empty`].
    pub fn reasons(&self) -> &[String] {
        match self {
            Self::Empty => &[],
            Self::Invalid { reasons, .. } => reasons,
        }
    }
}

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::cancel::CancelToken;
use crate::probe::DEFAULT_SMTP_PORT;

/// How far the resolver scans once it has an answer.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    /// Stop at the first provider match.
    #[default]
    Fast,
    /// Probe every MX host and keep every transcript.
    Diagnostic,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown run mode '{0}', use: fast|diagnostic")]
pub struct UnknownRunMode(pub String);

impl FromStr for RunMode {
    type Err = UnknownRunMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "diagnostic" | "diagnostics" => Ok(Self::Diagnostic),
            _ => Err(UnknownRunMode(s.to_string())),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fast => f.write_str("fast"),
            Self::Diagnostic => f.write_str("diagnostic"),
        }
    }
}

/// Configuration knobs for [`ProviderResolver`](crate::ProviderResolver).
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub mode: RunMode,
    /// Bounds the DNS query and, separately, each SMTP connection.
    pub timeout: Duration,
    pub port: u16,
    pub helo_name: Option<String>,
    /// Probe MX hosts concurrently in [`RunMode::Diagnostic`].
    pub parallel_probes: bool,
    pub cancel: CancelToken,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            mode: RunMode::Fast,
            timeout: Duration::from_secs(10),
            port: DEFAULT_SMTP_PORT,
            helo_name: None,
            parallel_probes: false,
            cancel: CancelToken::new(),
        }
    }
}

impl ResolveOptions {
    pub fn diagnostic() -> Self {
        Self {
            mode: RunMode::Diagnostic,
            ..Self::default()
        }
    }

    /// A zero timeout falls back to the default instead of disabling it.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.timeout = timeout;
        }
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

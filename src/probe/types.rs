/// Raw server lines collected while probing one MX host.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EhloTranscript {
    pub exchange_host: String,
    pub priority: u16,
    /// Greeting and EHLO reply lines, CRLF stripped, in arrival order.
    pub response_lines: Vec<String>,
    /// The server offered `250-STARTTLS`; the probe stopped there.
    pub tls_advertised: bool,
    #[cfg_attr(
        feature = "with-serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub connect_error: Option<String>,
    #[cfg_attr(
        feature = "with-serde",
        serde(default, skip_serializing_if = "std::ops::Not::not")
    )]
    pub cancelled: bool,
}

impl EhloTranscript {
    pub fn new(exchange_host: impl Into<String>) -> Self {
        Self {
            exchange_host: exchange_host.into(),
            priority: 0,
            response_lines: Vec::new(),
            tls_advertised: false,
            connect_error: None,
            cancelled: false,
        }
    }

    pub fn connect_failed(exchange_host: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            connect_error: Some(error.into()),
            ..Self::new(exchange_host)
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connect_error.is_none() && !self.cancelled
    }
}

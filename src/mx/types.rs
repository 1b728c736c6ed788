#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxRecord {
    /// Lower is preferred.
    pub priority: u16,
    pub exchange_host: String,
}

impl MxRecord {
    pub fn new(priority: u16, exchange_host: impl Into<String>) -> Self {
        Self {
            priority,
            exchange_host: exchange_host.into(),
        }
    }
}

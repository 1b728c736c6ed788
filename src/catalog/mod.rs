//! Static heuristics mapping hostnames and EHLO capabilities to providers.
//!
//! A catalog is an immutable value: build it once (usually via
//! [`ProviderCatalog::default`]) and hand it to the resolver. Lookups are
//! case-insensitive substring tests. When several tokens are contained in the
//! same candidate the longest token wins; equal lengths go to the entry that
//! was declared first.

mod defaults;

use defaults::{CAPABILITY_PROVIDERS, HOSTNAME_PROVIDERS};

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub token: String,
    pub provider: String,
}

impl CatalogEntry {
    pub fn new(token: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            token: token.into().to_ascii_lowercase(),
            provider: provider.into(),
        }
    }
}

/// A catalog hit: which token matched and the provider it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogMatch<'a> {
    pub token: &'a str,
    pub provider: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCatalog {
    hostnames: Vec<CatalogEntry>,
    capabilities: Vec<CatalogEntry>,
}

impl Default for ProviderCatalog {
    fn default() -> Self {
        let mut catalog = Self::empty();
        for (token, provider) in HOSTNAME_PROVIDERS.entries() {
            catalog = catalog.with_hostname(*token, *provider);
        }
        for (token, provider) in CAPABILITY_PROVIDERS.entries() {
            catalog = catalog.with_capability(*token, *provider);
        }
        catalog
    }
}

impl ProviderCatalog {
    /// Catalog with no entries; every lookup misses.
    pub fn empty() -> Self {
        Self {
            hostnames: Vec::new(),
            capabilities: Vec::new(),
        }
    }

    pub fn with_hostname(mut self, token: impl Into<String>, provider: impl Into<String>) -> Self {
        push_entry(&mut self.hostnames, CatalogEntry::new(token, provider));
        self
    }

    pub fn with_capability(
        mut self,
        token: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        push_entry(&mut self.capabilities, CatalogEntry::new(token, provider));
        self
    }

    pub fn hostname_entries(&self) -> &[CatalogEntry] {
        &self.hostnames
    }

    pub fn capability_entries(&self) -> &[CatalogEntry] {
        &self.capabilities
    }

    pub fn lookup_by_hostname(&self, candidate: &str) -> Option<&str> {
        self.hostname_match(candidate).map(|hit| hit.provider)
    }

    pub fn lookup_by_capability_token(&self, candidate: &str) -> Option<&str> {
        self.capability_match(candidate).map(|hit| hit.provider)
    }

    pub fn hostname_match(&self, candidate: &str) -> Option<CatalogMatch<'_>> {
        best_match(&self.hostnames, candidate)
    }

    pub fn capability_match(&self, candidate: &str) -> Option<CatalogMatch<'_>> {
        best_match(&self.capabilities, candidate)
    }
}

// Re-declaring a token replaces its provider in place, keeping declaration order.
fn push_entry(entries: &mut Vec<CatalogEntry>, entry: CatalogEntry) {
    if entry.token.is_empty() {
        return;
    }
    match entries.iter_mut().find(|e| e.token == entry.token) {
        Some(existing) => existing.provider = entry.provider,
        None => entries.push(entry),
    }
}

fn best_match<'a>(entries: &'a [CatalogEntry], candidate: &str) -> Option<CatalogMatch<'a>> {
    let haystack = candidate.to_ascii_lowercase();
    let mut best: Option<&CatalogEntry> = None;
    for entry in entries {
        if !haystack.contains(entry.token.as_str()) {
            continue;
        }
        // strict '>' keeps the first declared entry on equal length
        if best.is_none_or(|current| entry.token.len() > current.token.len()) {
            best = Some(entry);
        }
    }
    best.map(|entry| CatalogMatch {
        token: &entry.token,
        provider: &entry.provider,
    })
}

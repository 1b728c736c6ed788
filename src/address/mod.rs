//! RFC 5322-lite parsing of the address handed to the resolver.
//!
//! Accepts a bare `local@domain` or the `Display Name <local@domain>` form.
//! Only the domain matters for provider resolution; the local part is checked
//! so that obviously malformed input is rejected before any DNS traffic.

mod domain;
mod error;
mod local;

pub use error::AddressError;

use domain::check_domain;
use local::is_valid_local;

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    pub original: String,
    pub display_name: Option<String>,
    pub local: String,
    /// Domain as written, lowercased.
    pub domain: String,
    /// IDNA (punycode) form used for DNS queries.
    pub ascii_domain: String,
}

pub fn parse_address(input: &str) -> Result<EmailAddress, AddressError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AddressError::Empty);
    }

    let (display_name, addr_spec) = split_display_name(trimmed);
    let mut reasons = Vec::new();

    if addr_spec.len() > 254 {
        reasons.push(format!("total length {} > 254", addr_spec.len()));
    }

    let Some((local, domain)) = addr_spec.rsplit_once('@') else {
        reasons.push("missing '@'".to_string());
        return Err(AddressError::invalid(trimmed, reasons));
    };

    if local.is_empty() || local.len() > 64 {
        reasons.push(format!(
            "local part length {} invalid (1..=64)",
            local.len()
        ));
    } else if !is_valid_local(local) {
        reasons.push("invalid local part".to_string());
    }

    let ascii_domain = check_domain(domain, &mut reasons);

    match ascii_domain {
        Some(ascii_domain) if reasons.is_empty() => Ok(EmailAddress {
            original: input.to_string(),
            display_name,
            local: local.to_string(),
            domain: domain.trim_end_matches('.').to_lowercase(),
            ascii_domain,
        }),
        _ => Err(AddressError::invalid(trimmed, reasons)),
    }
}

/// `Name <addr>` → (Some("Name"), "addr"); anything else is returned as-is.
fn split_display_name(input: &str) -> (Option<String>, &str) {
    let Some(stripped) = input.strip_suffix('>') else {
        return (None, input);
    };
    let Some(open) = stripped.rfind('<') else {
        return (None, input);
    };
    let name = stripped[..open].trim().trim_matches('"').trim();
    let addr = stripped[open + 1..].trim();
    let name = (!name.is_empty()).then(|| name.to_string());
    (name, addr)
}

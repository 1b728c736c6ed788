/// IDNA conversion and label checks for the part after '@'.
///
/// Returns the lowercase ASCII form when conversion succeeds; problems found
/// along the way are appended to `reasons`.
pub(crate) fn check_domain(domain: &str, reasons: &mut Vec<String>) -> Option<String> {
    // a fully-qualified "example.com." is the same domain
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    let Ok(ascii) = idna::domain_to_ascii(domain) else {
        reasons.push(format!("domain '{domain}' is not valid IDNA"));
        return None;
    };
    let ascii = ascii.to_ascii_lowercase();

    match ascii.len() {
        0 => {
            reasons.push("domain is empty".to_string());
            return None;
        }
        len if len > 253 => reasons.push(format!("domain length {len} > 253")),
        _ => {}
    }

    let labels: Vec<&str> = ascii.split('.').collect();
    if labels.len() < 2 {
        reasons.push("domain needs at least two labels".to_string());
    }
    reasons.extend(
        labels
            .iter()
            .filter_map(|label| label_problem(label).map(|problem| format!("label '{label}': {problem}"))),
    );

    Some(ascii)
}

fn label_problem(label: &str) -> Option<&'static str> {
    if label.is_empty() {
        Some("empty")
    } else if label.len() > 63 {
        Some("longer than 63 octets")
    } else if label.starts_with('-') || label.ends_with('-') {
        Some("leading or trailing hyphen")
    } else if !label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
        Some("characters outside [a-z0-9-]")
    } else {
        None
    }
}

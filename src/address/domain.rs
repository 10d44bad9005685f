/// Converts `domain` to lowercase ASCII (IDNA) and checks label rules.
/// Invalidating reasons are pushed into `reasons`.
pub(crate) fn ascii_domain(domain: &str, reasons: &mut Vec<String>) -> Option<String> {
    let trimmed = domain.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        reasons.push("domain missing".to_string());
        return None;
    }

    let ascii = match idna::domain_to_ascii(trimmed) {
        Ok(d) => d.to_ascii_lowercase(),
        Err(_) => {
            reasons.push("domain punycode conversion failed".to_string());
            return None;
        }
    };

    if ascii.is_empty() {
        reasons.push("domain empty after IDNA conversion".to_string());
        return None;
    }

    let before = reasons.len();
    for label in ascii.split('.') {
        if label.is_empty() {
            reasons.push("empty domain label".to_string());
            continue;
        }
        if label.len() > 63 {
            reasons.push(format!(
                "domain label '{}' length {} > 63",
                label,
                label.len()
            ));
        }
        if label.starts_with('-') || label.ends_with('-') {
            reasons.push(format!("domain label '{label}' cannot start/end with '-'"));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            reasons.push(format!("domain label '{label}' has invalid chars"));
        }
    }

    (reasons.len() == before).then_some(ascii)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_trims_root_dot() {
        let mut reasons = vec![];
        let out = ascii_domain("Example.COM.", &mut reasons);
        assert_eq!(out.as_deref(), Some("example.com"), "{reasons:?}");
    }

    #[test]
    fn converts_idna() {
        let mut reasons = vec![];
        let out = ascii_domain("bücher.de", &mut reasons);
        assert_eq!(out.as_deref(), Some("xn--bcher-kva.de"));
    }

    #[test]
    fn label_too_long() {
        let long = "a".repeat(64);
        let mut reasons = vec![];
        assert!(ascii_domain(&format!("{long}.com"), &mut reasons).is_none());
        assert!(!reasons.is_empty());
    }

    #[test]
    fn bad_hyphen() {
        let mut reasons = vec![];
        assert!(ascii_domain("-bad.example", &mut reasons).is_none());
    }
}

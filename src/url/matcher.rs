/// Checks if a host falls under an allow-list entry
///
/// An entry names a registrable domain together with all of its subdomains, so both spellings
/// below are equivalent:
/// 1. "example.com" matches "example.com", "blog.example.com", "api.v2.example.com"
/// 2. "*.example.com" matches the same hosts
///
/// Comparison is case-insensitive.
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::matches_domain;
///
/// assert!(matches_domain("yahoo.com", "news.yahoo.com"));
/// assert!(matches_domain("*.yahoo.com", "yahoo.com"));
/// assert!(!matches_domain("yahoo.com", "notyahoo.com"));
/// ```
pub fn matches_domain(pattern: &str, candidate: &str) -> bool {
    let base = pattern.strip_prefix("*.").unwrap_or(pattern);
    if base.is_empty() || candidate.is_empty() {
        return false;
    }

    let base = base.to_ascii_lowercase();
    let candidate = candidate.to_ascii_lowercase();

    candidate == base || candidate.ends_with(&format!(".{}", base))
}

/// Checks a host against the whole allow-list; an empty list admits every host
pub fn is_host_allowed(host: &str, allowed_domains: &[String]) -> bool {
    allowed_domains.is_empty()
        || allowed_domains
            .iter()
            .any(|pattern| matches_domain(pattern, host))
}

use url::Url;

/// Extracts the domain from a URL
///
/// The lowercase host is the unit of per-source concurrency accounting. Ports are ignored, so
/// two servers on one host share a cap.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_harvest::url::extract_domain;
///
/// let url = Url::parse("https://EN.Wikipedia.org/wiki/Rust").unwrap();
/// assert_eq!(extract_domain(&url), Some("en.wikipedia.org".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

use crate::UrlError;
use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
    "ref",
    "source",
];

/// Link prefixes that never name a fetchable document
const UNSUPPORTED_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Normalizes an absolute URL into its canonical form
///
/// Equivalent to [`normalize_link`] with no base document.
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::normalize_url;
///
/// let url = normalize_url("http://EXAMPLE.COM/wiki/John%5FCena/#History").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/wiki/John_Cena");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    normalize_link(url_str, None)
}

/// Resolves a discovered link against its base document and canonicalizes it
///
/// # Normalization Steps
///
/// 1. Reject empty, fragment-only and `javascript:`/`mailto:`/`tel:`/`data:` links
/// 2. Resolve relative links against `base` (the post-redirect document URL)
/// 3. Reject non-HTTP(S) schemes and host-less URLs
/// 4. Normalize path:
///    - Percent-decode segments whose decoding is plain text
///    - Remove dot segments and empty segments
///    - Remove trailing slash (except for root /)
/// 5. Remove fragment
/// 6. Remove tracking query parameters, sort the rest, drop an empty query
///
/// Hosts are lowercased by the URL parser. The scheme and any `www.` prefix are kept as written:
/// they name distinct origins.
///
/// # Arguments
///
/// * `raw` - The link text as found in the document (e.g. an `href` value)
/// * `base` - URL of the document the link was found in, if any
///
/// # Returns
///
/// * `Ok(Url)` - Canonical URL
/// * `Err(UrlError)` - The link cannot name a fetchable document
pub fn normalize_link(raw: &str, base: Option<&Url>) -> Result<Url, UrlError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Malformed("empty link".to_string()));
    }

    if trimmed.starts_with('#') {
        return Err(UrlError::Malformed(format!(
            "fragment-only link: {}",
            trimmed
        )));
    }

    let lowered = trimmed.to_ascii_lowercase();
    if let Some(prefix) = UNSUPPORTED_PREFIXES.iter().find(|p| lowered.starts_with(*p)) {
        return Err(UrlError::InvalidScheme(prefix.trim_end_matches(':').to_string()));
    }

    let mut url = match base {
        Some(base) => base.join(trimmed),
        None => Url::parse(trimmed),
    }
    .map_err(|e| UrlError::Parse(format!("{}: {}", trimmed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);

        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Normalizes a URL path: decodes segments, removes dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut normalized_segments: Vec<String> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(decode_segment(segment)),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", normalized_segments.join("/"))
}

/// Percent-decodes one path segment
///
/// The URL parser re-encodes whatever must stay encoded, so `John%5FCena` and `John_Cena`
/// converge. A segment is kept as written when decoding is not UTF-8 or would yield a path
/// separator or a literal `%`.
fn decode_segment(segment: &str) -> String {
    if !segment.contains('%') {
        return segment.to_string();
    }

    match urlencoding::decode(segment) {
        Ok(decoded) if !decoded.contains(|c: char| matches!(c, '/' | '\\' | '%')) => {
            decoded.into_owned()
        }
        _ => segment.to_string(),
    }
}

/// Puts a configured path prefix in the encoded form canonical URL paths take
///
/// `/wiki/Catégorie:` and `/wiki/Cat%C3%A9gorie:` both become `/wiki/Cat%C3%A9gorie:`. A trailing
/// slash is kept, since it narrows the prefix.
pub(crate) fn canonical_path_prefix(prefix: &str) -> String {
    let Ok(mut url) = Url::parse("http://prefix.invalid/") else {
        return prefix.to_string();
    };

    let decoded: Vec<String> = prefix.trim().split('/').map(decode_segment).collect();
    url.set_path(&decoded.join("/"));
    url.path().to_string()
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort();
    params
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

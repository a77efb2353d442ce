//! URL handling module for Sumi-Harvest
//!
//! This module provides link canonicalization, domain extraction, allow-list matching and the
//! [`LinkFilter`] that decides whether a discovered link may enter the frontier.

mod domain;
mod matcher;
mod normalize;

use crate::config::ScopeConfig;
use crate::UrlError;
use url::Url;

// Re-export main functions
pub use domain::extract_domain;
pub use matcher::{is_host_allowed, matches_domain};
pub use normalize::{normalize_link, normalize_url};

/// Why a discovered link was kept out of the frontier
#[derive(Debug, thiserror::Error)]
pub enum LinkRejection {
    /// The link does not name a fetchable HTTP(S) document
    #[error("unusable link: {0}")]
    Unusable(#[from] UrlError),

    /// The link's host is outside the allow-list
    #[error("host '{0}' is outside the allowed domains")]
    OffSite(String),

    /// The canonical path starts with an excluded prefix
    #[error("path '{0}' is excluded")]
    ExcludedPath(String),
}

/// Canonicalizes discovered links and checks them against the crawl scope
///
/// Pure over its inputs: the filter holds only static configuration.
#[derive(Debug, Clone, Default)]
pub struct LinkFilter {
    allowed_domains: Vec<String>,
    excluded_path_prefixes: Vec<String>,
}

impl LinkFilter {
    /// Creates a filter from the run's scope configuration
    pub fn new(scope: &ScopeConfig) -> Self {
        Self {
            allowed_domains: scope.allowed_domains.clone(),
            excluded_path_prefixes: scope
                .excluded_path_prefixes
                .iter()
                .map(|prefix| normalize::canonical_path_prefix(prefix))
                .collect(),
        }
    }

    /// Resolves `raw` against `base`, canonicalizes it and checks the scope
    ///
    /// # Returns
    ///
    /// * `Ok(Url)` - The canonical URL, eligible for the frontier
    /// * `Err(LinkRejection)` - Why the link was rejected
    pub fn filter(&self, raw: &str, base: Option<&Url>) -> Result<Url, LinkRejection> {
        let url = normalize_link(raw, base)?;
        self.admits(&url)?;
        Ok(url)
    }

    /// Checks an already canonical URL (e.g. a redirect target) against the scope
    pub fn admits(&self, url: &Url) -> Result<(), LinkRejection> {
        let host = url.host_str().ok_or(UrlError::MissingDomain)?;

        if !is_host_allowed(host, &self.allowed_domains) {
            return Err(LinkRejection::OffSite(host.to_string()));
        }

        let path = url.path();
        if self
            .excluded_path_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return Err(LinkRejection::ExcludedPath(path.to_string()));
        }

        Ok(())
    }
}

//! Document extractor
//!
//! Decides whether a fetched document is worth persisting, builds its structured record and
//! collects its outbound links. Links are reported whether or not the document is accepted.

use crate::config::validate_selector;
use crate::config::{ExtractConfig, KeySource};
use crate::crawler::fetcher::FetchedDocument;
use crate::crawler::parser::ParsedDocument;
use crate::store::StoreKey;
use crate::ConfigError;
use scraper::Selector;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// Selection rules compiled once at startup
#[derive(Debug, Clone)]
pub struct SelectorRules {
    title: Selector,
    links: Selector,
    fields: Vec<(String, Selector)>,
    key_source: KeySource,
    excluded_key_prefixes: Vec<String>,
}

impl SelectorRules {
    /// Compiles the extract section of a run configuration
    pub fn compile(config: &ExtractConfig) -> Result<Self, ConfigError> {
        let fields = config
            .fields
            .iter()
            .map(|(name, selector)| Ok((name.clone(), validate_selector(selector)?)))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            title: validate_selector(&config.title)?,
            links: validate_selector(&config.links)?,
            fields,
            key_source: config.key_source,
            excluded_key_prefixes: config.excluded_key_prefixes.clone(),
        })
    }
}

/// Why a fetched document was not persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The title selector matched no non-empty text
    MissingTitle,
    /// The store key's label starts with an excluded prefix
    ExcludedKey(String),
    /// No usable store key could be derived
    InvalidKey(String),
    /// The body is not valid UTF-8; its links are still reported
    Unparseable,
}

impl SkipReason {
    /// Short label used for skip counters
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingTitle => "missing_title",
            Self::ExcludedKey(_) => "excluded_key",
            Self::InvalidKey(_) => "invalid_key",
            Self::Unparseable => "unparseable",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTitle => write!(f, "no title"),
            Self::ExcludedKey(label) => write!(f, "excluded key '{}'", label),
            Self::InvalidKey(text) => write!(f, "no usable key from '{}'", text),
            Self::Unparseable => write!(f, "body is not valid text"),
        }
    }
}

/// A document accepted for persistence
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    /// Canonical URL the document was served from
    pub source_url: String,
    pub title: String,
    /// Named field -> matched texts, in document order
    pub fields: BTreeMap<String, Vec<String>>,
    #[serde(skip)]
    pub raw_bytes: Vec<u8>,
    #[serde(skip)]
    pub key: StoreKey,
}

/// Persistence decision for one document
#[derive(Debug, Clone)]
pub enum ExtractOutcome {
    Accepted(DocumentRecord),
    Skipped(SkipReason),
}

/// Result of extracting one document
#[derive(Debug, Clone)]
pub struct Extraction {
    pub outcome: ExtractOutcome,
    /// Raw link targets matched by the link selector
    pub links: Vec<String>,
}

/// Applies [`SelectorRules`] to fetched documents
#[derive(Debug, Clone)]
pub struct Extractor {
    rules: SelectorRules,
}

impl Extractor {
    /// Creates an extractor, compiling the configured selectors
    pub fn new(config: &ExtractConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            rules: SelectorRules::compile(config)?,
        })
    }

    /// Extracts a fetched document
    ///
    /// `doc.final_url` is expected to be canonical already; it becomes the record's source URL
    /// and the source of URL-derived keys.
    pub fn extract(&self, doc: FetchedDocument) -> Extraction {
        let text = String::from_utf8_lossy(&doc.body);
        let lossy = matches!(text, Cow::Owned(_));

        let parsed = ParsedDocument::parse(&text);
        let links = parsed.hrefs(&self.rules.links);
        if lossy {
            return Extraction {
                outcome: ExtractOutcome::Skipped(SkipReason::Unparseable),
                links,
            };
        }

        let title = parsed.first_text(&self.rules.title);
        let fields: BTreeMap<String, Vec<String>> = self
            .rules
            .fields
            .iter()
            .map(|(name, selector)| (name.clone(), parsed.all_texts(selector)))
            .collect();
        drop(parsed);
        drop(text);

        let outcome = match self.accept(&doc.final_url, title, fields) {
            Ok((title, fields, key)) => ExtractOutcome::Accepted(DocumentRecord {
                source_url: doc.final_url.to_string(),
                title,
                fields,
                raw_bytes: doc.body,
                key,
            }),
            Err(reason) => ExtractOutcome::Skipped(reason),
        };

        Extraction { outcome, links }
    }

    /// Applies the persistence rules to the extracted values
    fn accept(
        &self,
        url: &Url,
        title: Option<String>,
        fields: BTreeMap<String, Vec<String>>,
    ) -> Result<(String, BTreeMap<String, Vec<String>>, StoreKey), SkipReason> {
        let title = title.ok_or(SkipReason::MissingTitle)?;

        let key_text = match self.rules.key_source {
            KeySource::Url => url_key_text(url),
            KeySource::Title => title.clone(),
        };

        let key =
            StoreKey::derive(&key_text).map_err(|_| SkipReason::InvalidKey(key_text.clone()))?;

        if let Some(prefix) = self
            .rules
            .excluded_key_prefixes
            .iter()
            .find(|prefix| key.label().starts_with(prefix.as_str()))
        {
            tracing::trace!("Key '{}' matches excluded prefix '{}'", key.label(), prefix);
            return Err(SkipReason::ExcludedKey(key.label().to_string()));
        }

        Ok((title, fields, key))
    }
}

/// Last non-empty path segment of `url`, or its host for the root path
fn url_key_text(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_string)
        .or_else(|| url.host_str().map(str::to_string))
        .unwrap_or_default()
}

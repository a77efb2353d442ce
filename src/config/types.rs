use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for Sumi-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub scope: ScopeConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of link hops from a seed
    #[serde(rename = "depth-limit")]
    pub depth_limit: u32,

    /// Maximum number of documents persisted in one run
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Maximum number of fetches in flight across all sources
    #[serde(rename = "global-concurrency")]
    pub global_concurrency: u32,

    /// Maximum number of fetches in flight against a single domain
    #[serde(rename = "per-source-concurrency")]
    pub per_source_concurrency: u32,

    /// Optional cap on the total number of fetch attempts
    #[serde(rename = "max-fetches", default)]
    pub max_fetches: Option<u32>,

    /// Whether to consult robots.txt before fetching
    #[serde(rename = "respect-robots", default = "default_respect_robots")]
    pub respect_robots: bool,
}

fn default_respect_robots() -> bool {
    true
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the user agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Where the crawl starts and which links it may follow
#[derive(Debug, Clone, Deserialize)]
pub struct ScopeConfig {
    /// Seed URLs, enqueued at depth 0
    pub seeds: Vec<String>,

    /// Domain allow-list (e.g., "en.wikipedia.org" or "*.example.com"); empty allows all
    #[serde(rename = "allowed-domains", default)]
    pub allowed_domains: Vec<String>,

    /// Canonical path prefixes that are never enqueued (e.g., "/wiki/Special:")
    #[serde(rename = "excluded-path-prefixes", default)]
    pub excluded_path_prefixes: Vec<String>,
}

/// Which text a document's store key is derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeySource {
    /// Last segment of the canonical URL path
    #[default]
    Url,
    /// Extracted document title
    Title,
}

/// Field selection rules for the extractor
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConfig {
    /// CSS selector for the document title
    #[serde(default = "default_title_selector")]
    pub title: String,

    /// CSS selector for outbound links (elements carrying `href`)
    #[serde(default = "default_links_selector")]
    pub links: String,

    /// Source of the store key
    #[serde(rename = "key-source", default)]
    pub key_source: KeySource,

    /// Store-key prefixes that mark a document as not worth persisting (e.g., "File:")
    #[serde(rename = "excluded-key-prefixes", default)]
    pub excluded_key_prefixes: Vec<String>,

    /// Named structured fields: field name -> CSS selector
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

fn default_title_selector() -> String {
    "title".to_string()
}

fn default_links_selector() -> String {
    "a[href]".to_string()
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            title: default_title_selector(),
            links: default_links_selector(),
            key_source: KeySource::default(),
            excluded_key_prefixes: Vec::new(),
            fields: BTreeMap::new(),
        }
    }
}

/// What happens when a derived store key is already taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Retry the write with a numeric discriminator appended to the key
    #[default]
    Disambiguate,
    /// Keep the earlier document and drop the later one
    Discard,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory that receives stored documents
    pub root: String,

    /// Path to the SQLite document manifest
    #[serde(rename = "manifest-path", default)]
    pub manifest_path: Option<String>,

    /// Path to the markdown run summary
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,

    /// Behavior on store key collisions
    #[serde(rename = "on-collision", default)]
    pub on_collision: CollisionPolicy,
}

//! Per-origin robots.txt cache
//!
//! Entries live for a single run: a robots.txt file is fetched at most once per origin and never
//! refreshed.

use crate::robots::{fetch_robots, ParsedRobots};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use url::Url;

/// Cached robots.txt data for an origin
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed robots.txt content
    pub content: Arc<ParsedRobots>,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    /// Wraps freshly fetched robots.txt data
    pub fn new(content: ParsedRobots) -> Self {
        Self {
            content: Arc::new(content),
            fetched_at: Utc::now(),
        }
    }
}

/// Robots.txt cache keyed by origin (`scheme://host:port`)
///
/// Each origin gets its own once-cell. The map lock is only held to look the cell up, so a slow
/// robots.txt download stalls fetches to that origin and no other.
#[derive(Debug, Default)]
pub struct RobotsCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<CachedRobots>>>>,
}

impl RobotsCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the robots.txt rules governing `url`, fetching them on first use
    ///
    /// Concurrent requests to a fresh origin wait on the same cell and trigger a single
    /// robots.txt download.
    pub async fn rules_for(&self, client: &Client, url: &Url) -> Arc<ParsedRobots> {
        let origin = url.origin().ascii_serialization();

        let cell = {
            let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(entries.entry(origin).or_default())
        };

        let cached = cell
            .get_or_init(|| async { CachedRobots::new(fetch_robots(client, url).await) })
            .await;
        Arc::clone(&cached.content)
    }

    /// Number of origins looked up so far
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Returns true if no origin has been looked up yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

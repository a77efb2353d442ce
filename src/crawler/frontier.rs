//! Crawl frontier
//!
//! FIFO queue of pending `(url, depth)` entries plus the visited set. Both live behind one mutex,
//! so the duplicate check and the enqueue are a single atomic step with respect to concurrent
//! discovery. FIFO order yields breadth-first expansion.

use crate::url::extract_domain;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use url::Url;

/// A unit of pending work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Canonical URL to fetch
    pub url: Url,
    /// Link hops from the nearest seed
    pub depth: u32,
    /// Lowercase host, the per-source accounting key
    pub domain: String,
}

impl FrontierEntry {
    /// Creates an entry for a canonical URL; `None` if the URL has no host
    pub fn new(url: Url, depth: u32) -> Option<Self> {
        let domain = extract_domain(&url)?;
        Some(Self { url, depth, domain })
    }
}

/// Result of offering an entry to the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    /// Enqueued and marked visited
    Accepted,
    /// Already dispatched or enqueued
    Duplicate,
    /// Deeper than the depth limit
    DepthExceeded,
    /// The frontier no longer accepts work
    Closed,
}

#[derive(Debug, Default)]
struct FrontierInner {
    queue: VecDeque<FrontierEntry>,
    visited: HashSet<String>,
    closed: bool,
}

/// Thread-safe pending-work queue with deduplication
#[derive(Debug)]
pub struct Frontier {
    depth_limit: u32,
    inner: Mutex<FrontierInner>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new(depth_limit: u32) -> Self {
        Self {
            depth_limit,
            inner: Mutex::new(FrontierInner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        // A panic while holding the lock leaves the queue itself consistent
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Offers an entry for future dispatch
    pub fn offer(&self, entry: FrontierEntry) -> OfferOutcome {
        if entry.depth > self.depth_limit {
            return OfferOutcome::DepthExceeded;
        }

        let mut inner = self.lock();
        if inner.closed {
            return OfferOutcome::Closed;
        }

        if !inner.visited.insert(entry.url.as_str().to_string()) {
            return OfferOutcome::Duplicate;
        }

        inner.queue.push_back(entry);
        OfferOutcome::Accepted
    }

    /// Registers a URL as visited without enqueuing it (e.g. a redirect target)
    ///
    /// Returns true if the URL was not visited before.
    pub fn mark_visited(&self, url: &Url) -> bool {
        self.lock().visited.insert(url.as_str().to_string())
    }

    /// Returns true if the URL has been enqueued or visited
    pub fn is_visited(&self, url: &Url) -> bool {
        self.lock().visited.contains(url.as_str())
    }

    /// Takes the oldest entry
    pub fn take(&self) -> Option<FrontierEntry> {
        self.take_where(|_| true)
    }

    /// Takes the oldest entry satisfying `eligible`
    ///
    /// Entries before it stay queued in order, so a domain at its cap does not block others.
    pub fn take_where<F>(&self, mut eligible: F) -> Option<FrontierEntry>
    where
        F: FnMut(&FrontierEntry) -> bool,
    {
        let mut inner = self.lock();
        if inner.closed {
            return None;
        }

        let index = inner.queue.iter().position(|entry| eligible(entry))?;
        inner.queue.remove(index)
    }

    /// Stops accepting offers and yielding entries; pending entries are discarded
    ///
    /// Returns the number of entries discarded.
    pub fn close(&self) -> usize {
        let mut inner = self.lock();
        inner.closed = true;
        let dropped = inner.queue.len();
        inner.queue.clear();
        dropped
    }

    /// Returns true once [`Frontier::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of pending entries
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Returns true if no entry is pending
    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Number of URLs enqueued or visited so far
    pub fn visited_len(&self) -> usize {
        self.lock().visited.len()
    }
}

//! Dispatch scheduler
//!
//! This module handles:
//! - The global concurrency cap
//! - Per-domain concurrency caps
//! - Selecting the next dispatchable entry from the frontier
//!
//! The scheduler is owned by the coordinator task, which is the only place fetches are started
//! and joined, so its counters are plain integers.

use crate::config::CrawlerConfig;
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::state::DomainState;
use std::collections::HashMap;

/// Tracks in-flight fetches against the global and per-source caps
#[derive(Debug)]
pub struct Scheduler {
    /// Maximum fetches in flight across all domains
    global_cap: u32,

    /// Maximum fetches in flight against one domain
    per_source_cap: u32,

    /// Fetches currently in flight
    global_in_flight: u32,

    /// Per-domain state tracking
    domain_states: HashMap<String, DomainState>,
}

impl Scheduler {
    /// Creates a new scheduler from the crawler configuration
    pub fn new(config: &CrawlerConfig) -> Self {
        Self::with_caps(config.global_concurrency, config.per_source_concurrency)
    }

    /// Creates a new scheduler with explicit caps
    pub fn with_caps(global_cap: u32, per_source_cap: u32) -> Self {
        Self {
            global_cap,
            per_source_cap,
            global_in_flight: 0,
            domain_states: HashMap::new(),
        }
    }

    /// Returns true if the global cap allows another fetch
    pub fn has_global_capacity(&self) -> bool {
        self.global_in_flight < self.global_cap
    }

    /// Returns true if `domain` is below its per-source cap
    pub fn has_domain_capacity(&self, domain: &str) -> bool {
        self.domain_states
            .get(domain)
            .map_or(true, |state| state.has_capacity(self.per_source_cap))
    }

    /// Takes the oldest frontier entry that may be dispatched now and records its dispatch
    ///
    /// Entries whose domain is at its cap are passed over, not removed.
    ///
    /// # Returns
    ///
    /// * `Some(FrontierEntry)` - An entry to fetch; it is now counted as in flight
    /// * `None` - The global cap is reached, or no pending entry is eligible
    pub fn next_dispatchable(&mut self, frontier: &Frontier) -> Option<FrontierEntry> {
        if !self.has_global_capacity() {
            return None;
        }

        let entry = frontier.take_where(|entry| self.has_domain_capacity(&entry.domain))?;
        self.record_dispatch(&entry.domain);
        Some(entry)
    }

    /// Records a fetch start against `domain`
    pub fn record_dispatch(&mut self, domain: &str) {
        self.global_in_flight += 1;
        self.domain_states
            .entry(domain.to_string())
            .or_default()
            .record_dispatch();
    }

    /// Records that a fetch against `domain` finished
    pub fn record_completion(&mut self, domain: &str, success: bool) {
        self.global_in_flight = self.global_in_flight.saturating_sub(1);
        if let Some(state) = self.domain_states.get_mut(domain) {
            state.record_completion(success);
        }
    }

    /// Fetches currently in flight
    pub fn in_flight(&self) -> u32 {
        self.global_in_flight
    }

    /// Fetches currently in flight against `domain`
    pub fn in_flight_for(&self, domain: &str) -> u32 {
        self.domain_states
            .get(domain)
            .map_or(0, |state| state.in_flight)
    }

    /// Per-domain counters for every domain dispatched to so far
    pub fn domain_states(&self) -> &HashMap<String, DomainState> {
        &self.domain_states
    }
}

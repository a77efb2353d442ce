//! Run report
//!
//! Counters accumulated by the coordinator while joining fetch tasks. The finished report is the
//! run's user-visible summary: printed, rendered as markdown and stored in the manifest.

use crate::state::CrawlPhase;
use serde::Serialize;
use std::collections::BTreeMap;

/// Final counters of a crawl run
///
/// A page slot is reserved before the write, so documents counted in `discarded` or
/// `store_errors` still consume budget. A run can therefore end with fewer than `max-pages`
/// documents stored while eligible pages remain; [`RunReport::budget_slots_used`] gives the total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Documents written to the content store
    pub pages_stored: u32,

    /// Fetches started
    pub fetches_dispatched: u32,

    /// Fetches that produced no document
    pub fetch_failures: u32,

    /// Fetch failures by kind (status, timeout, robots_denied, ...)
    pub failures_by_kind: BTreeMap<String, u32>,

    /// Documents fetched but not persisted, by skip reason
    pub skipped: BTreeMap<String, u32>,

    /// Accepted documents refused by the page budget
    pub budget_rejected: u32,

    /// Store keys found already taken
    pub collisions: u32,

    /// Documents stored under a discriminated key
    pub disambiguated: u32,

    /// Documents dropped because of a key collision; each used a page slot
    pub discarded: u32,

    /// Documents whose write failed; each used a page slot
    pub store_errors: u32,

    /// Manifest rows that could not be written
    pub manifest_errors: u32,

    /// Discovered links rejected by the link filter
    pub links_filtered: u32,

    /// Discovered links already enqueued or visited
    pub duplicates: u32,

    /// Discovered links beyond the depth limit
    pub depth_rejected: u32,

    /// Fetches whose redirect target was a duplicate or out of scope
    pub redirects_dropped: u32,

    /// Pending entries discarded by cancellation
    pub abandoned: u32,

    /// Whether the run was cancelled
    pub cancelled: bool,

    /// Phase the run ended in
    pub final_phase: CrawlPhase,

    /// Wall-clock duration in milliseconds
    pub elapsed_ms: u64,
}

impl RunReport {
    /// Total number of skipped documents
    pub fn skipped_total(&self) -> u32 {
        self.skipped.values().sum()
    }

    /// Page slots consumed: stored documents plus those lost to collisions or write errors
    pub fn budget_slots_used(&self) -> u32 {
        self.pages_stored + self.discarded + self.store_errors
    }

    pub(crate) fn record_failure(&mut self, kind: &str) {
        self.fetch_failures += 1;
        *self.failures_by_kind.entry(kind.to_string()).or_default() += 1;
    }

    pub(crate) fn record_skip(&mut self, kind: &str) {
        *self.skipped.entry(kind.to_string()).or_default() += 1;
    }

    /// Adds counters gathered by one fetch task
    pub(crate) fn merge(&mut self, other: &RunReport) {
        self.pages_stored += other.pages_stored;
        self.fetch_failures += other.fetch_failures;
        for (kind, n) in &other.failures_by_kind {
            *self.failures_by_kind.entry(kind.clone()).or_default() += n;
        }
        for (kind, n) in &other.skipped {
            *self.skipped.entry(kind.clone()).or_default() += n;
        }
        self.budget_rejected += other.budget_rejected;
        self.collisions += other.collisions;
        self.disambiguated += other.disambiguated;
        self.discarded += other.discarded;
        self.store_errors += other.store_errors;
        self.manifest_errors += other.manifest_errors;
        self.links_filtered += other.links_filtered;
        self.duplicates += other.duplicates;
        self.depth_rejected += other.depth_rejected;
        self.redirects_dropped += other.redirects_dropped;
    }
}

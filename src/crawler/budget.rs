//! Page budget
//!
//! The page counter is checked and incremented in one compare-exchange, so concurrent
//! reservations can never push it past the quota. The optional fetch-attempt cap works the
//! same way.

use std::sync::atomic::{AtomicU32, Ordering};

/// Answer to a reservation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// A page slot was consumed; the caller may persist one document
    Granted,
    /// The quota is reached; the document must not be persisted
    Exhausted,
}

/// Global page quota and fetch-attempt cap
#[derive(Debug)]
pub struct BudgetController {
    max_pages: u32,
    page_count: AtomicU32,
    max_fetches: Option<u32>,
    fetch_attempts: AtomicU32,
}

impl BudgetController {
    /// Creates a controller with a page quota and an optional fetch-attempt cap
    pub fn new(max_pages: u32, max_fetches: Option<u32>) -> Self {
        Self {
            max_pages,
            page_count: AtomicU32::new(0),
            max_fetches,
            fetch_attempts: AtomicU32::new(0),
        }
    }

    /// Reserves one page slot, immediately before persistence
    pub fn try_reserve(&self) -> Reservation {
        if increment_below(&self.page_count, self.max_pages) {
            Reservation::Granted
        } else {
            Reservation::Exhausted
        }
    }

    /// Counts one fetch attempt; false once the fetch cap is reached
    pub fn try_dispatch(&self) -> bool {
        match self.max_fetches {
            Some(cap) => increment_below(&self.fetch_attempts, cap),
            None => {
                self.fetch_attempts.fetch_add(1, Ordering::AcqRel);
                true
            }
        }
    }

    /// Returns true once every page slot has been reserved
    pub fn is_exhausted(&self) -> bool {
        self.page_count.load(Ordering::Acquire) >= self.max_pages
    }

    /// Returns true once the fetch cap has been reached
    pub fn fetches_exhausted(&self) -> bool {
        self.max_fetches
            .map_or(false, |cap| self.fetch_attempts.load(Ordering::Acquire) >= cap)
    }

    /// Page slots reserved so far
    pub fn page_count(&self) -> u32 {
        self.page_count.load(Ordering::Acquire)
    }

    /// Fetch attempts counted so far
    pub fn fetch_attempts(&self) -> u32 {
        self.fetch_attempts.load(Ordering::Acquire)
    }

    /// The page quota
    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }
}

/// Increments `counter` if it is below `limit`; returns whether it did
fn increment_below(counter: &AtomicU32, limit: u32) -> bool {
    counter
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            (current < limit).then_some(current + 1)
        })
        .is_ok()
}

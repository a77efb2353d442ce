/// Tracks the fetch activity of a single domain during a run
///
/// Owned by the scheduler, which is driven by the coordinator task alone, so the counters need no
/// synchronization of their own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainState {
    /// Fetches currently in flight against this domain
    pub in_flight: u32,

    /// Fetches dispatched to this domain so far
    pub dispatched: u32,

    /// Fetches that completed without a transport or status error
    pub succeeded: u32,

    /// Fetches that failed
    pub failed: u32,
}

impl DomainState {
    /// Creates a new DomainState with zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks whether another fetch may start under the per-source cap
    pub fn has_capacity(&self, per_source_cap: u32) -> bool {
        self.in_flight < per_source_cap
    }

    /// Records that a fetch was dispatched to this domain
    pub fn record_dispatch(&mut self) {
        self.in_flight += 1;
        self.dispatched += 1;
    }

    /// Records that a fetch against this domain finished
    pub fn record_completion(&mut self, success: bool) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Returns true when no fetch is in flight for this domain
    pub fn is_idle(&self) -> bool {
        self.in_flight == 0
    }
}

use crate::HarvestError;
use serde::Serialize;
use std::fmt;

/// Lifecycle phase of a crawl run
///
/// ```text
/// Running ──► BudgetFrozen ──► Draining ──► Terminated
///    └───────────────────────────┘
/// ```
///
/// `Running` dispatches new fetches. `BudgetFrozen` is entered once the page quota is reached:
/// in-flight fetches continue but nothing new is dispatched. `Draining` is entered when dispatch
/// stops for any reason (frontier exhausted, fetch cap, cancellation, frozen budget) and lasts
/// until the last in-flight fetch has been joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlPhase {
    #[default]
    Running,
    BudgetFrozen,
    Draining,
    Terminated,
}

impl CrawlPhase {
    /// Returns true if new fetches may be dispatched in this phase
    pub fn allows_dispatch(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns true if this is the final phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// Validates and performs a transition to `next`
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlPhase)` - The new phase
    /// * `Err(HarvestError::InvalidTransition)` - The transition is not part of the lifecycle
    pub fn transition(self, next: CrawlPhase) -> Result<CrawlPhase, HarvestError> {
        use CrawlPhase::*;

        match (self, next) {
            (Running, BudgetFrozen)
            | (Running, Draining)
            | (BudgetFrozen, Draining)
            | (Draining, Terminated) => Ok(next),
            _ => Err(HarvestError::InvalidTransition {
                from: self,
                to: next,
            }),
        }
    }

    /// Converts the phase to its manifest representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::BudgetFrozen => "budget_frozen",
            Self::Draining => "draining",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

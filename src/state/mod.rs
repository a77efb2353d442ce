//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: the run's lifecycle phase and its allowed transitions
//! - `DomainState`: per-domain in-flight accounting for the per-source concurrency cap

mod crawl_phase;
mod domain_state;

// Re-export main types
pub use crawl_phase::CrawlPhase;
pub use domain_state::DomainState;

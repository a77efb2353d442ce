//! Crawler module for document fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The frontier of pending work and the visited set
//! - Dispatch scheduling under global and per-source concurrency caps
//! - The page budget
//! - Fetching, HTML parsing, document extraction and link discovery
//! - Overall crawl coordination

mod budget;
mod coordinator;
mod extractor;
mod fetcher;
mod frontier;
mod parser;
mod report;
mod scheduler;

pub use budget::{BudgetController, Reservation};
pub use coordinator::{run_crawl, Coordinator, CrawlHandle};
pub use extractor::{DocumentRecord, ExtractOutcome, Extraction, Extractor, SelectorRules, SkipReason};
pub use fetcher::{build_http_client, FetchError, FetchedDocument, Fetcher, HttpFetcher};
pub use frontier::{Frontier, FrontierEntry, OfferOutcome};
pub use parser::ParsedDocument;
pub use report::RunReport;
pub use scheduler::Scheduler;

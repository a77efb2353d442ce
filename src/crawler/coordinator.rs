//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties the run together:
//! - Seeding the frontier
//! - Dispatching fetches under the concurrency caps and the budget
//! - Joining fetch tasks and folding their counters into the run report
//! - Driving the crawl phase machine until every fetch has drained
//!
//! The coordinator task is the only place fetches are started and joined. Each fetch task runs
//! fetch, extraction, link discovery, reservation and persistence for one frontier entry.

use crate::config::{validate, CollisionPolicy, Config};
use crate::crawler::budget::{BudgetController, Reservation};
use crate::crawler::extractor::{DocumentRecord, ExtractOutcome, Extractor};
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::frontier::{Frontier, FrontierEntry, OfferOutcome};
use crate::crawler::report::RunReport;
use crate::crawler::scheduler::Scheduler;
use crate::manifest::SqliteManifest;
use crate::state::CrawlPhase;
use crate::store::{place_document, ContentStore, FsContentStore, Placement};
use crate::url::{normalize_url, LinkFilter};
use crate::Result;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::task::{Id, JoinError, JoinSet};

/// Completed fetches between two progress log lines
const PROGRESS_INTERVAL: u32 = 25;

/// Cancels a running crawl from another task
///
/// Cancelling closes the frontier: pending entries are abandoned, nothing new is dispatched and
/// the run ends once the fetches already in flight have drained.
#[derive(Debug, Clone)]
pub struct CrawlHandle {
    frontier: Arc<Frontier>,
    cancelled: Arc<AtomicBool>,
    abandoned: Arc<AtomicUsize>,
}

impl CrawlHandle {
    /// Requests a graceful stop; repeated calls have no further effect
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }

        let dropped = self.frontier.close();
        self.abandoned.store(dropped, Ordering::Release);
        tracing::info!(
            "Cancellation requested, {} pending entries abandoned",
            dropped
        );
    }

    /// Returns true once [`CrawlHandle::cancel`] has been called
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Where a stored document is recorded
struct ManifestSink {
    run_id: i64,
    db: Mutex<SqliteManifest>,
}

/// Everything a fetch task needs, shared read-only across tasks
struct TaskContext {
    fetcher: Arc<dyn Fetcher>,
    frontier: Arc<Frontier>,
    filter: LinkFilter,
    budget: Arc<BudgetController>,
    extractor: Extractor,
    store: Box<dyn ContentStore>,
    collision_policy: CollisionPolicy,
    manifest: Option<ManifestSink>,
}

/// What a fetch task hands back to the coordinator
struct TaskOutcome {
    domain: String,
    success: bool,
    report: RunReport,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Arc<dyn Fetcher>,
    filter: LinkFilter,
    frontier: Arc<Frontier>,
    budget: Arc<BudgetController>,
    scheduler: Scheduler,
    extractor: Extractor,
    store: FsContentStore,
    manifest: Option<SqliteManifest>,
    config_hash: String,
    phase: CrawlPhase,
    handle: CrawlHandle,
    /// Domain each running fetch task holds a slot for
    running: HashMap<Id, String>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Validates the configuration, compiles the selector rules, creates the output root and
    /// opens the manifest when one is configured. Nothing is fetched yet.
    ///
    /// # Arguments
    ///
    /// * `config` - The run configuration
    /// * `fetcher` - The fetch collaborator every page is retrieved through
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to [`run`](Coordinator::run)
    /// * `Err(HarvestError)` - Invalid configuration, or the output root or manifest is unusable
    pub fn new(config: Config, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        validate(&config)?;

        let extractor = Extractor::new(&config.extract)?;
        let store = FsContentStore::new(&config.output.root)?;
        let manifest = match &config.output.manifest_path {
            Some(path) => Some(SqliteManifest::new(Path::new(path))?),
            None => None,
        };

        let frontier = Arc::new(Frontier::new(config.crawler.depth_limit));
        let handle = CrawlHandle {
            frontier: Arc::clone(&frontier),
            cancelled: Arc::new(AtomicBool::new(false)),
            abandoned: Arc::new(AtomicUsize::new(0)),
        };

        Ok(Self {
            filter: LinkFilter::new(&config.scope),
            budget: Arc::new(BudgetController::new(
                config.crawler.max_pages,
                config.crawler.max_fetches,
            )),
            scheduler: Scheduler::new(&config.crawler),
            config: Arc::new(config),
            fetcher,
            frontier,
            extractor,
            store,
            manifest,
            config_hash: String::new(),
            phase: CrawlPhase::Running,
            handle,
            running: HashMap::new(),
        })
    }

    /// Sets the configuration hash recorded with the run in the manifest
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = hash.into();
        self
    }

    /// Returns a handle that can cancel the run while it executes
    pub fn handle(&self) -> CrawlHandle {
        self.handle.clone()
    }

    /// Current phase of the run
    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    /// Runs the crawl to completion
    ///
    /// # Returns
    ///
    /// * `Ok(RunReport)` - The run terminated; fetch failures and skips are counted, not fatal
    /// * `Err(HarvestError)` - The manifest run row could not be created
    pub async fn run(mut self) -> Result<RunReport> {
        let started = Instant::now();
        let mut report = RunReport::default();

        let manifest = match self.manifest.take() {
            Some(mut db) => {
                let run_id = db.begin_run(&self.config_hash)?;
                tracing::info!("Starting crawl run {}", run_id);
                Some(ManifestSink {
                    run_id,
                    db: Mutex::new(db),
                })
            }
            None => None,
        };

        self.seed(&mut report);

        let ctx = Arc::new(TaskContext {
            fetcher: Arc::clone(&self.fetcher),
            frontier: Arc::clone(&self.frontier),
            filter: self.filter.clone(),
            budget: Arc::clone(&self.budget),
            extractor: self.extractor.clone(),
            store: Box::new(self.store.clone()),
            collision_policy: self.config.output.on_collision,
            manifest,
        });

        let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();
        let mut completed = 0u32;

        loop {
            if self.phase.allows_dispatch() {
                self.dispatch(&ctx, &mut tasks, &mut report);
            }

            self.advance_phase(tasks.len())?;
            if self.phase.is_terminal() {
                break;
            }

            if let Some(joined) = tasks.join_next_with_id().await {
                self.complete(joined, &mut report);
                completed += 1;

                if completed % PROGRESS_INTERVAL == 0 {
                    tracing::info!(
                        "Progress: {} fetched, {} stored, {} pending, {} in flight",
                        completed,
                        self.budget.page_count(),
                        self.frontier.len(),
                        self.scheduler.in_flight()
                    );
                }
            }
        }

        report.cancelled = self.handle.is_cancelled();
        report.abandoned += self.handle.abandoned.load(Ordering::Acquire) as u32;
        report.final_phase = self.phase;
        report.elapsed_ms = started.elapsed().as_millis() as u64;

        if let Some(sink) = &ctx.manifest {
            let mut db = sink.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Err(e) = db.finish_run(sink.run_id, &report) {
                tracing::warn!("Failed to record run {} in manifest: {}", sink.run_id, e);
                report.manifest_errors += 1;
            }
        }

        tracing::info!(
            "Crawl finished: {} stored, {} fetched, {} failed, {} skipped in {}ms",
            report.pages_stored,
            report.fetches_dispatched,
            report.fetch_failures,
            report.skipped_total(),
            report.elapsed_ms
        );

        Ok(report)
    }

    /// Offers every seed to the frontier at depth 0
    fn seed(&self, report: &mut RunReport) {
        for seed in &self.config.scope.seeds {
            let url = match self.filter.filter(seed, None) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Seed {} rejected: {}", seed, e);
                    report.links_filtered += 1;
                    continue;
                }
            };

            let Some(entry) = FrontierEntry::new(url, 0) else {
                report.links_filtered += 1;
                continue;
            };

            if self.frontier.offer(entry) == OfferOutcome::Duplicate {
                report.duplicates += 1;
            }
        }

        tracing::info!("Seeded frontier with {} URLs", self.frontier.len());
    }

    /// Starts fetches until a cap, the budget or the frontier stops dispatch
    fn dispatch(
        &mut self,
        ctx: &Arc<TaskContext>,
        tasks: &mut JoinSet<TaskOutcome>,
        report: &mut RunReport,
    ) {
        while !self.budget.is_exhausted() && !self.budget.fetches_exhausted() {
            let Some(entry) = self.scheduler.next_dispatchable(&self.frontier) else {
                break;
            };

            if !self.budget.try_dispatch() {
                self.scheduler.record_completion(&entry.domain, false);
                report.abandoned += 1;
                break;
            }

            tracing::debug!("Dispatching {} (depth {})", entry.url, entry.depth);
            report.fetches_dispatched += 1;
            let domain = entry.domain.clone();
            let task = tasks.spawn(process_entry(Arc::clone(ctx), entry));
            self.running.insert(task.id(), domain);
        }
    }

    /// Folds a finished fetch task into the run
    ///
    /// A task that panicked still gives its domain slot back.
    fn complete(
        &mut self,
        joined: std::result::Result<(Id, TaskOutcome), JoinError>,
        report: &mut RunReport,
    ) {
        match joined {
            Ok((id, outcome)) => {
                self.running.remove(&id);
                self.scheduler
                    .record_completion(&outcome.domain, outcome.success);
                report.merge(&outcome.report);
            }
            Err(e) => {
                tracing::error!("Fetch task failed: {}", e);
                report.record_failure("task");
                if let Some(domain) = self.running.remove(&e.id()) {
                    self.scheduler.record_completion(&domain, false);
                }
            }
        }
    }

    /// Applies every phase transition the current counters call for
    ///
    /// Called right after a dispatch attempt, so a running crawl with nothing in flight has no
    /// dispatchable work left.
    fn advance_phase(&mut self, in_flight: usize) -> Result<()> {
        use CrawlPhase::*;

        loop {
            let next = match self.phase {
                Running if self.budget.is_exhausted() => {
                    tracing::info!(
                        "Page budget of {} reached, no further fetches will be dispatched",
                        self.budget.max_pages()
                    );
                    BudgetFrozen
                }
                Running if self.handle.is_cancelled() => Draining,
                Running if self.budget.fetches_exhausted() => {
                    tracing::info!(
                        "Fetch cap of {} attempts reached",
                        self.budget.fetch_attempts()
                    );
                    Draining
                }
                Running if in_flight == 0 => Draining,
                BudgetFrozen => Draining,
                Draining if in_flight == 0 => Terminated,
                _ => return Ok(()),
            };

            tracing::debug!("Crawl phase {} -> {}", self.phase, next);
            self.phase = self.phase.transition(next)?;
        }
    }
}

/// Fetches one entry and handles everything downstream of the response
async fn process_entry(ctx: Arc<TaskContext>, entry: FrontierEntry) -> TaskOutcome {
    let mut report = RunReport::default();
    let success = handle_entry(&ctx, &entry, &mut report).await;

    TaskOutcome {
        domain: entry.domain,
        success,
        report,
    }
}

/// Returns false when the fetch itself failed
async fn handle_entry(
    ctx: &Arc<TaskContext>,
    entry: &FrontierEntry,
    report: &mut RunReport,
) -> bool {
    let mut doc = match ctx.fetcher.fetch(&entry.url).await {
        Ok(doc) => doc,
        Err(e) => {
            tracing::warn!("Failed to fetch {}: {}", entry.url, e);
            report.record_failure(e.kind());
            return false;
        }
    };

    let final_url = match normalize_url(doc.final_url.as_str()) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("Dropping {}: unusable final URL {}: {}", entry.url, doc.final_url, e);
            report.redirects_dropped += 1;
            return true;
        }
    };

    if final_url != entry.url {
        if let Err(e) = ctx.filter.admits(&final_url) {
            tracing::debug!("Dropping redirect {} -> {}: {}", entry.url, final_url, e);
            report.redirects_dropped += 1;
            return true;
        }

        if !ctx.frontier.mark_visited(&final_url) {
            tracing::debug!(
                "Dropping redirect {} -> {}: already visited",
                entry.url,
                final_url
            );
            report.redirects_dropped += 1;
            return true;
        }
    }

    doc.final_url = final_url;
    let base = doc.final_url.clone();
    let extraction = ctx.extractor.extract(doc);

    enqueue_links(ctx, &base, entry.depth + 1, &extraction.links, report);

    match extraction.outcome {
        ExtractOutcome::Skipped(reason) => {
            tracing::debug!("Skipping {}: {}", base, reason);
            report.record_skip(reason.kind());
        }
        ExtractOutcome::Accepted(record) => {
            if ctx.budget.try_reserve() == Reservation::Exhausted {
                tracing::debug!("Page budget exhausted, not storing {}", base);
                report.budget_rejected += 1;
                return true;
            }

            let persist_ctx = Arc::clone(ctx);
            match tokio::task::spawn_blocking(move || persist(&persist_ctx, record)).await {
                Ok(stored) => report.merge(&stored),
                Err(e) => {
                    tracing::error!("Persisting {} failed: {}", base, e);
                    report.store_errors += 1;
                }
            }
        }
    }

    true
}

/// Writes an accepted document and its manifest row
///
/// Runs on the blocking pool: both the content store and the manifest do synchronous IO.
fn persist(ctx: &TaskContext, record: DocumentRecord) -> RunReport {
    let mut report = RunReport::default();

    match place_document(
        ctx.store.as_ref(),
        &record.key,
        &record.raw_bytes,
        ctx.collision_policy,
    ) {
        Ok(Placement::Stored {
            key,
            path,
            collisions,
        }) => {
            report.pages_stored += 1;
            report.collisions += collisions;
            if collisions > 0 {
                report.disambiguated += 1;
            }
            tracing::debug!("Stored {} as {}", record.source_url, path.display());

            if let Some(sink) = &ctx.manifest {
                let mut db = sink.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                if let Err(e) = db.record_document(sink.run_id, &record, key.token(), &path) {
                    tracing::warn!("Failed to record {} in manifest: {}", record.source_url, e);
                    report.manifest_errors += 1;
                }
            }
        }
        Ok(Placement::Discarded { collisions }) => {
            tracing::warn!(
                "Discarding {}: store key '{}' is taken",
                record.source_url,
                record.key.token()
            );
            report.collisions += collisions;
            report.discarded += 1;
        }
        Err(e) => {
            tracing::warn!("Failed to store {}: {}", record.source_url, e);
            report.store_errors += 1;
        }
    }

    report
}

/// Filters discovered links and offers the survivors at `depth`
fn enqueue_links(
    ctx: &TaskContext,
    base: &url::Url,
    depth: u32,
    links: &[String],
    report: &mut RunReport,
) {
    for raw in links {
        let url = match ctx.filter.filter(raw, Some(base)) {
            Ok(url) => url,
            Err(e) => {
                tracing::trace!("Filtered link {}: {}", raw, e);
                report.links_filtered += 1;
                continue;
            }
        };

        let Some(entry) = FrontierEntry::new(url, depth) else {
            report.links_filtered += 1;
            continue;
        };

        match ctx.frontier.offer(entry) {
            OfferOutcome::Accepted | OfferOutcome::Closed => {}
            OfferOutcome::Duplicate => report.duplicates += 1,
            OfferOutcome::DepthExceeded => report.depth_rejected += 1,
        }
    }
}

/// Runs a complete crawl with the default HTTP fetcher
///
/// Ctrl-C is not handled here; use [`Coordinator::handle`] to wire cancellation.
pub async fn run_crawl(config: Config, config_hash: &str) -> Result<RunReport> {
    let fetcher = HttpFetcher::new(&config.user_agent, &config.crawler)?;
    Coordinator::new(config, Arc::new(fetcher))?
        .with_config_hash(config_hash)
        .run()
        .await
}

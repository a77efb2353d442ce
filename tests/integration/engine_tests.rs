//! Engine tests over an in-memory link graph
//!
//! The fetcher here serves canned pages without touching the network, so the tests can check
//! the crawl invariants (budget, depth, domain, dedup, fairness, caps, termination) exactly.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sumi_harvest::config::{
    CollisionPolicy, Config, CrawlerConfig, ExtractConfig, OutputConfig, ScopeConfig,
    UserAgentConfig,
};
use sumi_harvest::crawler::{
    Coordinator, CrawlHandle, FetchError, FetchedDocument, Fetcher, RunReport,
};
use sumi_harvest::CrawlPhase;
use tempfile::TempDir;
use url::Url;

#[derive(Default)]
struct Activity {
    requested: Vec<String>,
    in_flight: HashMap<String, u32>,
    max_in_flight: HashMap<String, u32>,
    global_in_flight: u32,
    max_global_in_flight: u32,
}

/// Serves a fixed link graph: URL -> (title, outbound hrefs)
#[derive(Default)]
struct GraphFetcher {
    pages: HashMap<String, (String, Vec<String>)>,
    delay: Duration,
    activity: Mutex<Activity>,
    cancel_at: Mutex<Option<(usize, CrawlHandle)>>,
}

impl GraphFetcher {
    fn page(mut self, url: &str, links: &[&str]) -> Self {
        let title = url.rsplit('/').next().unwrap_or(url).to_string();
        self.pages.insert(
            url.to_string(),
            (title, links.iter().map(|l| l.to_string()).collect()),
        );
        self
    }

    fn with_delay(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        self
    }

    fn cancel_on_request(&self, n: usize, handle: CrawlHandle) {
        *self.cancel_at.lock().unwrap() = Some((n, handle));
    }

    fn requested(&self) -> Vec<String> {
        self.activity.lock().unwrap().requested.clone()
    }

    fn requested_sorted(&self) -> Vec<String> {
        let mut urls = self.requested();
        urls.sort();
        urls
    }

    fn max_in_flight_for(&self, host: &str) -> u32 {
        self.activity
            .lock()
            .unwrap()
            .max_in_flight
            .get(host)
            .copied()
            .unwrap_or(0)
    }

    fn max_global_in_flight(&self) -> u32 {
        self.activity.lock().unwrap().max_global_in_flight
    }
}

#[async_trait]
impl Fetcher for GraphFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedDocument, FetchError> {
        let host = url.host_str().unwrap_or_default().to_string();
        let request_number = {
            let mut activity = self.activity.lock().unwrap();
            activity.requested.push(url.to_string());

            let n = activity.in_flight.entry(host.clone()).or_default();
            *n += 1;
            let current = *n;
            let max = activity.max_in_flight.entry(host.clone()).or_default();
            *max = (*max).max(current);

            activity.global_in_flight += 1;
            activity.max_global_in_flight =
                activity.max_global_in_flight.max(activity.global_in_flight);
            activity.requested.len()
        };

        let cancel = self
            .cancel_at
            .lock()
            .unwrap()
            .as_ref()
            .filter(|(n, _)| *n == request_number)
            .map(|(_, handle)| handle.clone());
        if let Some(handle) = cancel {
            handle.cancel();
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        {
            let mut activity = self.activity.lock().unwrap();
            if let Some(n) = activity.in_flight.get_mut(&host) {
                *n -= 1;
            }
            activity.global_in_flight -= 1;
        }

        let (title, links) = self.pages.get(url.as_str()).ok_or(FetchError::Status(404))?;
        let anchors: String = links
            .iter()
            .map(|href| format!("<a href=\"{}\">x</a>", href))
            .collect();

        Ok(FetchedDocument {
            final_url: url.clone(),
            status: 200,
            content_type: "text/html".to_string(),
            body: format!(
                "<html><head><title>{}</title></head><body>{}</body></html>",
                title, anchors
            )
            .into_bytes(),
        })
    }
}

fn config(root: &Path, seeds: &[&str], allowed: &[&str]) -> Config {
    Config {
        crawler: CrawlerConfig {
            depth_limit: 5,
            max_pages: 100,
            global_concurrency: 4,
            per_source_concurrency: 2,
            max_fetches: None,
            respect_robots: false,
        },
        user_agent: UserAgentConfig {
            crawler_name: "GraphBot".to_string(),
            crawler_version: "0.1".to_string(),
            contact_url: "https://example.com/bot".to_string(),
            contact_email: "bot@example.com".to_string(),
        },
        scope: ScopeConfig {
            seeds: seeds.iter().map(|s| s.to_string()).collect(),
            allowed_domains: allowed.iter().map(|s| s.to_string()).collect(),
            excluded_path_prefixes: Vec::new(),
        },
        extract: ExtractConfig::default(),
        output: OutputConfig {
            root: root.to_string_lossy().into_owned(),
            manifest_path: None,
            summary_path: None,
            on_collision: CollisionPolicy::Disambiguate,
        },
    }
}

async fn crawl(config: Config, fetcher: &Arc<GraphFetcher>) -> RunReport {
    Coordinator::new(config, fetcher.clone())
        .unwrap()
        .run()
        .await
        .unwrap()
}

fn stored_files(root: &Path) -> usize {
    std::fs::read_dir(root).unwrap().count()
}

#[tokio::test]
async fn test_depth_one_dispatches_seed_and_children() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(
        GraphFetcher::default()
            .page("https://a.test/A", &["/B", "/C"])
            .page("https://a.test/B", &["/D"])
            .page("https://a.test/C", &["/E"])
            .page("https://a.test/D", &[])
            .page("https://a.test/E", &[]),
    );
    let mut config = config(dir.path(), &["https://a.test/A"], &["a.test"]);
    config.crawler.depth_limit = 1;
    config.crawler.max_pages = 10;

    let report = crawl(config, &fetcher).await;

    assert_eq!(
        fetcher.requested_sorted(),
        vec!["https://a.test/A", "https://a.test/B", "https://a.test/C"]
    );
    assert_eq!(report.pages_stored, 3);
    assert_eq!(report.depth_rejected, 2);
    assert_eq!(report.final_phase, CrawlPhase::Terminated);
}

#[tokio::test]
async fn test_single_page_budget_persists_one_of_two_seeds() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(
        GraphFetcher::default()
            .page("https://a.test/A", &[])
            .page("https://a.test/B", &[]),
    );
    let mut config = config(dir.path(), &["https://a.test/A", "https://a.test/B"], &["a.test"]);
    config.crawler.max_pages = 1;

    let report = crawl(config, &fetcher).await;

    assert_eq!(report.pages_stored, 1);
    assert_eq!(report.budget_rejected, 1);
    assert_eq!(stored_files(dir.path()), 1);
}

#[tokio::test]
async fn test_budget_holds_under_concurrency() {
    let dir = TempDir::new().unwrap();
    let links: Vec<String> = (0..40).map(|i| format!("/p{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();

    let mut fetcher = GraphFetcher::default()
        .with_delay(2)
        .page("https://a.test/root", &link_refs);
    for i in 0..40 {
        fetcher = fetcher.page(&format!("https://a.test/p{}", i), &[]);
    }
    let fetcher = Arc::new(fetcher);

    let mut config = config(dir.path(), &["https://a.test/root"], &["a.test"]);
    config.crawler.max_pages = 5;
    config.crawler.global_concurrency = 8;
    config.crawler.per_source_concurrency = 8;

    let report = crawl(config, &fetcher).await;

    assert_eq!(report.pages_stored, 5);
    assert_eq!(stored_files(dir.path()), 5);
    assert!(report.fetches_dispatched < 41);
}

#[tokio::test]
async fn test_percent_encoded_link_is_a_duplicate() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(
        GraphFetcher::default()
            .page(
                "https://a.test/wiki/Start",
                &["/wiki/John_Cena", "/wiki/John%5FCena", "/wiki/John_Cena#Career"],
            )
            .page("https://a.test/wiki/John_Cena", &[]),
    );
    let config = config(dir.path(), &["https://a.test/wiki/Start"], &["a.test"]);

    let report = crawl(config, &fetcher).await;

    assert_eq!(
        fetcher.requested_sorted(),
        vec!["https://a.test/wiki/John_Cena", "https://a.test/wiki/Start"]
    );
    assert_eq!(report.duplicates, 2);
}

#[tokio::test]
async fn test_allow_list_blocks_foreign_hosts() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(
        GraphFetcher::default()
            .page(
                "https://a.test/A",
                &[
                    "https://b.test/X",
                    "https://docs.a.test/Guide",
                    "mailto:someone@a.test",
                ],
            )
            .page("https://b.test/X", &[])
            .page("https://docs.a.test/Guide", &[]),
    );
    let config = config(dir.path(), &["https://a.test/A"], &["a.test"]);

    let report = crawl(config, &fetcher).await;

    let requested = fetcher.requested();
    assert!(requested.iter().all(|url| !url.contains("b.test")));
    assert!(requested.contains(&"https://docs.a.test/Guide".to_string()));
    assert_eq!(report.links_filtered, 2);
}

#[tokio::test]
async fn test_hot_domain_does_not_starve_cold_domain() {
    let dir = TempDir::new().unwrap();
    let mut seeds: Vec<String> = (0..10).map(|i| format!("https://hot.test/{}", i)).collect();
    seeds.push("https://cold.test/only".to_string());
    let seed_refs: Vec<&str> = seeds.iter().map(String::as_str).collect();

    let mut fetcher = GraphFetcher::default().with_delay(5);
    for seed in &seeds {
        fetcher = fetcher.page(seed, &[]);
    }
    let fetcher = Arc::new(fetcher);

    let mut config = config(dir.path(), &seed_refs, &["hot.test", "cold.test"]);
    config.crawler.global_concurrency = 2;
    config.crawler.per_source_concurrency = 1;

    crawl(config, &fetcher).await;

    let requested = fetcher.requested();
    let cold_position = requested
        .iter()
        .position(|url| url == "https://cold.test/only")
        .unwrap();
    assert!(cold_position < 2, "cold domain fetched at position {}", cold_position);
    assert_eq!(requested.len(), 11);
}

#[tokio::test]
async fn test_concurrency_caps_are_respected() {
    let dir = TempDir::new().unwrap();
    let mut seeds = Vec::new();
    for host in ["one.test", "two.test", "three.test"] {
        for i in 0..6 {
            seeds.push(format!("https://{}/{}", host, i));
        }
    }
    let seed_refs: Vec<&str> = seeds.iter().map(String::as_str).collect();

    let mut fetcher = GraphFetcher::default().with_delay(10);
    for seed in &seeds {
        fetcher = fetcher.page(seed, &[]);
    }
    let fetcher = Arc::new(fetcher);

    let mut config = config(dir.path(), &seed_refs, &[]);
    config.crawler.global_concurrency = 4;
    config.crawler.per_source_concurrency = 2;

    let report = crawl(config, &fetcher).await;

    assert_eq!(report.fetches_dispatched, 18);
    assert!(fetcher.max_global_in_flight() <= 4);
    for host in ["one.test", "two.test", "three.test"] {
        assert!(fetcher.max_in_flight_for(host) <= 2, "{} exceeded its cap", host);
    }
}

#[tokio::test]
async fn test_link_cycle_terminates() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(
        GraphFetcher::default()
            .page("https://a.test/A", &["/B"])
            .page("https://a.test/B", &["/A", "/B"]),
    );
    let mut config = config(dir.path(), &["https://a.test/A"], &["a.test"]);
    config.crawler.depth_limit = 50;

    let report = crawl(config, &fetcher).await;

    assert_eq!(report.fetches_dispatched, 2);
    assert_eq!(report.duplicates, 2);
    assert_eq!(report.final_phase, CrawlPhase::Terminated);
}

#[tokio::test]
async fn test_depth_limit_bounds_a_chain() {
    let dir = TempDir::new().unwrap();
    let mut fetcher = GraphFetcher::default();
    for i in 0..10 {
        let next = format!("/n{}", i + 1);
        fetcher = fetcher.page(&format!("https://a.test/n{}", i), &[next.as_str()]);
    }
    let fetcher = Arc::new(fetcher);

    let mut config = config(dir.path(), &["https://a.test/n0"], &["a.test"]);
    config.crawler.depth_limit = 3;

    let report = crawl(config, &fetcher).await;

    assert_eq!(
        fetcher.requested(),
        vec![
            "https://a.test/n0",
            "https://a.test/n1",
            "https://a.test/n2",
            "https://a.test/n3"
        ]
    );
    assert_eq!(report.pages_stored, 4);
    assert_eq!(report.depth_rejected, 1);
}

#[tokio::test]
async fn test_cancellation_drains_in_flight_fetch() {
    let dir = TempDir::new().unwrap();
    let links: Vec<String> = (0..20).map(|i| format!("/p{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();

    let mut fetcher = GraphFetcher::default().page("https://a.test/root", &link_refs);
    for i in 0..20 {
        fetcher = fetcher.page(&format!("https://a.test/p{}", i), &["/root"]);
    }
    let fetcher = Arc::new(fetcher);

    let mut config = config(dir.path(), &["https://a.test/root"], &["a.test"]);
    config.crawler.global_concurrency = 1;

    let coordinator = Coordinator::new(config, fetcher.clone()).unwrap();
    fetcher.cancel_on_request(2, coordinator.handle());
    let report = coordinator.run().await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.fetches_dispatched, 2);
    assert_eq!(report.pages_stored, 2);
    assert_eq!(report.abandoned, 19);
    assert_eq!(report.final_phase, CrawlPhase::Terminated);
}

#[tokio::test]
async fn test_key_collision_is_disambiguated() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(
        GraphFetcher::default()
            .page("https://a.test/one/Foo", &[])
            .page("https://a.test/two/Foo", &[]),
    );
    let config = config(
        dir.path(),
        &["https://a.test/one/Foo", "https://a.test/two/Foo"],
        &["a.test"],
    );

    let report = crawl(config, &fetcher).await;

    assert_eq!(report.pages_stored, 2);
    assert_eq!(report.collisions, 1);
    assert_eq!(report.disambiguated, 1);
    assert!(dir.path().join("Foo.html").exists());
    assert!(dir.path().join("Foo-2.html").exists());
}

#[tokio::test]
async fn test_key_collision_discarded_by_policy() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(
        GraphFetcher::default()
            .page("https://a.test/one/Foo", &[])
            .page("https://a.test/two/Foo", &[]),
    );
    let mut config = config(
        dir.path(),
        &["https://a.test/one/Foo", "https://a.test/two/Foo"],
        &["a.test"],
    );
    config.output.on_collision = CollisionPolicy::Discard;

    let report = crawl(config, &fetcher).await;

    assert_eq!(report.pages_stored, 1);
    assert_eq!(report.discarded, 1);
    assert_eq!(report.budget_slots_used(), 2);
    assert_eq!(stored_files(dir.path()), 1);
}

#[tokio::test]
async fn test_excluded_key_prefix_is_skipped() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(
        GraphFetcher::default()
            .page("https://a.test/wiki/Start", &["/wiki/File:Photo.jpg"])
            .page("https://a.test/wiki/File:Photo.jpg", &[]),
    );
    let mut config = config(dir.path(), &["https://a.test/wiki/Start"], &["a.test"]);
    config.extract = ExtractConfig {
        excluded_key_prefixes: vec!["File:".to_string()],
        ..ExtractConfig::default()
    };

    let report = crawl(config, &fetcher).await;

    assert_eq!(report.fetches_dispatched, 2);
    assert_eq!(report.pages_stored, 1);
    assert_eq!(report.skipped["excluded_key"], 1);
    assert!(dir.path().join("Start.html").exists());
}

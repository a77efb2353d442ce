//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full crawl cycle end-to-end
//! through the default HTTP fetcher.

use std::path::Path;
use std::sync::Arc;
use sumi_harvest::config::{
    CollisionPolicy, Config, CrawlerConfig, ExtractConfig, OutputConfig, ScopeConfig,
    UserAgentConfig,
};
use sumi_harvest::crawler::{Coordinator, HttpFetcher};
use sumi_harvest::manifest::SqliteManifest;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling the mock server from `seeds`
fn create_test_config(seeds: Vec<String>, root: &Path, depth_limit: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            depth_limit,
            max_pages: 50,
            global_concurrency: 4,
            per_source_concurrency: 2,
            max_fetches: None,
            respect_robots: true,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        scope: ScopeConfig {
            seeds,
            allowed_domains: vec!["127.0.0.1".to_string()],
            excluded_path_prefixes: Vec::new(),
        },
        extract: ExtractConfig::default(),
        output: OutputConfig {
            root: root.join("docs").to_string_lossy().into_owned(),
            manifest_path: Some(root.join("manifest.db").to_string_lossy().into_owned()),
            summary_path: None,
            on_collision: CollisionPolicy::Disambiguate,
        },
    }
}

fn html(title: Option<&str>, links: &[&str]) -> String {
    let head = title
        .map(|t| format!("<head><title>{}</title></head>", t))
        .unwrap_or_default();
    let anchors: String = links
        .iter()
        .map(|href| format!("<a href=\"{}\">{}</a>", href, href))
        .collect();
    format!("<html>{}<body>{}</body></html>", head, anchors)
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8"))
        .mount(server)
        .await;
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn coordinator(config: Config) -> Coordinator {
    let fetcher = HttpFetcher::new(&config.user_agent, &config.crawler).unwrap();
    Coordinator::new(config, Arc::new(fetcher)).unwrap()
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_page(
        &server,
        "/start",
        html(
            Some("Start"),
            &["/wiki/Alpha", "/wiki/Beta#History", "https://elsewhere.test/x"],
        ),
    )
    .await;
    mount_page(&server, "/wiki/Alpha", html(Some("Alpha"), &["/start"])).await;
    mount_page(&server, "/wiki/Beta", html(Some("Beta"), &[])).await;

    let config = create_test_config(vec![format!("{}/start", base_url)], dir.path(), 2);
    let report = coordinator(config).run().await.unwrap();

    assert_eq!(report.pages_stored, 3);
    assert_eq!(report.fetches_dispatched, 3);
    assert_eq!(report.fetch_failures, 0);
    assert_eq!(report.links_filtered, 1);
    assert_eq!(report.duplicates, 1);

    let docs = dir.path().join("docs");
    for name in ["start.html", "Alpha.html", "Beta.html"] {
        assert!(docs.join(name).exists(), "{} should be stored", name);
    }
    let stored = std::fs::read_to_string(docs.join("Beta.html")).unwrap();
    assert!(stored.contains("<title>Beta</title>"));

    let manifest = SqliteManifest::new(&dir.path().join("manifest.db")).unwrap();
    let run = manifest.latest_run().unwrap().unwrap();
    assert_eq!(run.pages_stored, 3);
    assert_eq!(manifest.count_documents(run.id).unwrap(), 3);
}

#[tokio::test]
async fn test_robots_disallow_prevents_fetch() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&server, "User-agent: *\nDisallow: /private").await;
    mount_page(&server, "/start", html(Some("Start"), &["/private/secret"])).await;
    Mock::given(method("GET"))
        .and(path("/private/secret"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html(Some("Secret"), &[]), "text/html"))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(vec![format!("{}/start", server.uri())], dir.path(), 2);
    let report = coordinator(config).run().await.unwrap();

    assert_eq!(report.pages_stored, 1);
    assert_eq!(report.failures_by_kind["robots_denied"], 1);
    assert!(!dir.path().join("docs").join("secret.html").exists());
}

#[tokio::test]
async fn test_depth_limit_zero_fetches_only_seeds() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_page(&server, "/start", html(Some("Start"), &["/child"])).await;
    Mock::given(method("GET"))
        .and(path("/child"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html(Some("Child"), &[]), "text/html"))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(vec![format!("{}/start", server.uri())], dir.path(), 0);
    let report = coordinator(config).run().await.unwrap();

    assert_eq!(report.fetches_dispatched, 1);
    assert_eq!(report.depth_rejected, 1);
}

#[tokio::test]
async fn test_non_html_response_is_a_fetch_failure() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_page(&server, "/start", html(Some("Start"), &["/paper.pdf"])).await;
    Mock::given(method("GET"))
        .and(path("/paper.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"))
        .mount(&server)
        .await;

    let config = create_test_config(vec![format!("{}/start", server.uri())], dir.path(), 1);
    let report = coordinator(config).run().await.unwrap();

    assert_eq!(report.pages_stored, 1);
    assert_eq!(report.fetch_failures, 1);
    assert_eq!(report.failures_by_kind["content_mismatch"], 1);
}

#[tokio::test]
async fn test_missing_title_is_skipped_but_links_followed() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    mount_page(&server, "/start", html(None, &["/next"])).await;
    mount_page(&server, "/next", html(Some("Next"), &[])).await;

    let config = create_test_config(vec![format!("{}/start", server.uri())], dir.path(), 1);
    let report = coordinator(config).run().await.unwrap();

    assert_eq!(report.pages_stored, 1);
    assert_eq!(report.skipped["missing_title"], 1);
    assert!(dir.path().join("docs").join("next.html").exists());
    assert!(!dir.path().join("docs").join("start.html").exists());
}

#[tokio::test]
async fn test_redirect_target_is_stored_under_final_url() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&server, "User-agent: *\nAllow: /").await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", "/new"),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/new", html(Some("New"), &["/new"])).await;

    let config = create_test_config(vec![format!("{}/old", server.uri())], dir.path(), 1);
    let report = coordinator(config).run().await.unwrap();

    assert_eq!(report.pages_stored, 1);
    assert_eq!(report.fetches_dispatched, 1);
    assert_eq!(report.duplicates, 1);
    assert!(dir.path().join("docs").join("new.html").exists());

    let manifest = SqliteManifest::new(&dir.path().join("manifest.db")).unwrap();
    let run = manifest.latest_run().unwrap().unwrap();
    let docs = manifest.documents_for_run(run.id).unwrap();
    assert_eq!(docs[0].url, format!("{}/new", server.uri()));
}

#[tokio::test]
async fn test_unreachable_seed_terminates_cleanly() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(vec!["http://127.0.0.1:1/start".to_string()], dir.path(), 1);
    config.crawler.respect_robots = false;

    let report = coordinator(config).run().await.unwrap();

    assert_eq!(report.pages_stored, 0);
    assert_eq!(report.fetch_failures, 1);
    assert_eq!(report.final_phase, sumi_harvest::CrawlPhase::Terminated);
}

//! Integration tests for the citation crawl
//!
//! These tests use wiremock to stand in for the search and citation APIs and
//! run the full crawl cycle end-to-end into a SQLite snapshot database.

use citation_harvest::checkpoint::{SqliteSnapshotSink, FINAL_CHECKPOINT_NAME};
use citation_harvest::config::{parse_config, Config};
use citation_harvest::crawler::run_crawl;
use citation_harvest::events::CollectingObserver;
use citation_harvest::HarvestError;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing both sources at the mock server
fn create_test_config(base_url: &str, db_path: &Path, extra: &str) -> Config {
    let content = format!(
        r#"
[crawl]
query = "network science"
page-size = 2
request-delay-ms = 0
{extra}

[fetch]
max-retries = 2
timeout-secs = 5

[sources]
search-url = "{base_url}/works"
citations-url = "{base_url}/citations"

[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[output]
sink = "sqlite"
database-path = "{db}"
"#,
        extra = extra,
        base_url = base_url,
        db = db_path.display()
    );
    parse_config(&content).expect("test config should be valid")
}

async fn mount_page(server: &MockServer, offset: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("offset", offset))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
        .mount(server)
        .await;
}

async fn mount_citations(server: &MockServer, doi: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/citations/{}", doi)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_builds_citation_graph() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("citations.db");

    mount_page(
        &server,
        "0",
        r#"{"message":{"items":[
            {"DOI":"10.1/a","title":["Emergence of scaling"],
             "author":[{"given":"Réka","family":"Albert"}]},
            {"DOI":"10.1/b","title":["Small worlds"]}
        ]}}"#,
    )
    .await;
    mount_page(&server, "2", r#"{"message":{"items":[]}}"#).await;
    mount_citations(
        &server,
        "10.1/a",
        r#"[{"citing":"10.1/c","cited":"10.1/a"},{"citing":"omid:br/1 doi:10.1/b","cited":"10.1/a"}]"#,
    )
    .await;
    mount_citations(&server, "10.1/b", "[]").await;

    let config = create_test_config(&server.uri(), &db_path, "");
    let observer = Arc::new(CollectingObserver::new());

    let report = run_crawl(&config, observer.clone())
        .await
        .expect("crawl should succeed");

    assert_eq!(report.pages, 1);
    assert_eq!(report.final_offset, 2);
    assert_eq!(report.snapshot.node_count(), 3);
    assert_eq!(report.snapshot.edge_count(), 2);
    assert!(report.snapshot.contains_edge("10.1/c", "10.1/a"));
    assert!(report.snapshot.contains_edge("10.1/b", "10.1/a"));

    let sink = SqliteSnapshotSink::new(&db_path).unwrap();
    let stored = sink.load_snapshot(FINAL_CHECKPOINT_NAME).unwrap();
    assert_eq!(stored.node_count(), 3);
    assert_eq!(
        stored.node("10.1/a").unwrap().metadata.title.as_deref(),
        Some("Emergence of scaling")
    );
    assert!(stored.node("10.1/c").unwrap().is_dangling());
    assert_eq!(observer.count("end_of_stream"), 1);
    assert_eq!(observer.count("checkpoint_written"), 1);
}

#[tokio::test]
async fn test_unavailable_citations_do_not_stop_the_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("citations.db");

    mount_page(
        &server,
        "0",
        r#"{"message":{"items":[{"DOI":"10.1/a"},{"DOI":"10.1/b"}]}}"#,
    )
    .await;
    mount_page(&server, "2", r#"{"message":{"items":[]}}"#).await;
    Mock::given(method("GET"))
        .and(path("/citations/10.1/a"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;
    mount_citations(&server, "10.1/b", r#"[{"citing":"10.1/d"}]"#).await;

    let config = create_test_config(&server.uri(), &db_path, "");
    let observer = Arc::new(CollectingObserver::new());

    let report = run_crawl(&config, observer.clone()).await.unwrap();

    assert_eq!(report.snapshot.node_count(), 3);
    assert_eq!(report.snapshot.edge_count(), 1);
    assert_eq!(observer.count("relation_unavailable"), 1);
    assert_eq!(observer.count("fetch_attempt_failed"), 2);
}

#[tokio::test]
async fn test_search_outage_aborts_after_final_checkpoint() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("citations.db");

    mount_page(&server, "0", r#"{"message":{"items":[{"DOI":"10.1/a"}]}}"#).await;
    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_citations(&server, "10.1/a", "[]").await;

    let config = create_test_config(&server.uri(), &db_path, "");
    let observer = Arc::new(CollectingObserver::new());

    let err = run_crawl(&config, observer.clone()).await.unwrap_err();
    assert!(matches!(err, HarvestError::SourceUnavailable { offset: 2, .. }));

    let sink = SqliteSnapshotSink::new(&db_path).unwrap();
    let stored = sink.load_snapshot(FINAL_CHECKPOINT_NAME).unwrap();
    assert!(stored.contains_node("10.1/a"));
}

#[tokio::test]
async fn test_skip_policy_continues_past_search_outage() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("citations.db");

    mount_page(&server, "0", r#"{"message":{"items":[{"DOI":"10.1/a"}]}}"#).await;
    Mock::given(method("GET"))
        .and(path("/works"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    mount_page(&server, "4", r#"{"message":{"items":[{"DOI":"10.1/e"}]}}"#).await;
    mount_page(&server, "6", r#"{"message":{"items":[]}}"#).await;
    mount_citations(&server, "10.1/a", "[]").await;
    mount_citations(&server, "10.1/e", "[]").await;

    let config = create_test_config(&server.uri(), &db_path, r#"on-source-error = "skip""#);
    let observer = Arc::new(CollectingObserver::new());

    let report = run_crawl(&config, observer.clone()).await.unwrap();

    assert_eq!(report.skipped_pages, 1);
    assert_eq!(report.final_offset, 6);
    assert!(report.snapshot.contains_node("10.1/e"));
    assert_eq!(observer.count("page_failed"), 1);
}

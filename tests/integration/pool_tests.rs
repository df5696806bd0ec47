//! Integration tests for the bulk fetch pool and stitching
//!
//! A wiremock server serves numbered line files; the pool fetches them into a
//! temporary directory, and the stitcher turns them into one station graph.

use citation_harvest::config::{parse_config, Config};
use citation_harvest::events::CollectingObserver;
use citation_harvest::fetch::{run_bulk_fetch, TaskStatus};
use citation_harvest::stitch::{run_stitch, stitch_directory};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_config(base_url: &str, dir: &Path) -> Config {
    let content = format!(
        r#"
[fetch]
max-retries = 3

[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[output]
sink = "gexf"
directory = "{out}"
file-prefix = "train_network"

[bulk]
url-template = "{base_url}/json/line/en/{{id}}.json"
start-id = 1
end-id = 4
workers = 3
output-dir = "{lines}"

[stitch]
input-dir = "{lines}"
"#,
        base_url = base_url,
        out = dir.display(),
        lines = dir.join("lines").display()
    );
    parse_config(&content).expect("test config should be valid")
}

fn line(stations: &[&str]) -> String {
    let records: Vec<String> = stations
        .iter()
        .map(|s| format!(r#"{{"STATION_NAME_EN_M":"{}"}}"#, s))
        .collect();
    format!(r#"{{"data":[{}]}}"#, records.join(","))
}

async fn mount_line(server: &MockServer, id: u32, stations: &[&str]) {
    Mock::given(method("GET"))
        .and(path(format!("/json/line/en/{}.json", id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(line(stations)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_bulk_fetch_writes_one_file_per_id() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_line(&server, 1, &["Tokyo", "Kanda", "Akihabara"]).await;
    mount_line(&server, 2, &["Akihabara", "Okachimachi", "Ueno"]).await;
    mount_line(&server, 3, &["Ochanomizu", "Akihabara"]).await;
    // id 4 is never mounted and answers 404 on every attempt

    let config = create_test_config(&server.uri(), dir.path());
    let bulk = config.bulk.clone().unwrap();
    let observer = Arc::new(CollectingObserver::new());

    let report = run_bulk_fetch(&config, &bulk, observer.clone())
        .await
        .unwrap();

    assert_eq!(report.tasks.len(), 4);
    assert_eq!(report.pending_count(), 0);
    assert_eq!(report.succeeded().len(), 3);
    assert_eq!(report.exhausted().len(), 1);
    assert_eq!(report.attempts, 3 + 3);

    let failed = report
        .tasks
        .iter()
        .find(|t| t.status == TaskStatus::Exhausted)
        .unwrap();
    assert_eq!(failed.id.as_str(), "4");
    assert!(failed.last_error.as_deref().unwrap().contains("404"));

    let lines = dir.path().join("lines");
    for id in 1..=3 {
        assert!(lines.join(format!("{}.json", id)).exists());
    }
    assert!(!lines.join("4.json").exists());
    assert_eq!(observer.count("task_exhausted"), 1);
}

#[tokio::test]
async fn test_fetched_lines_stitch_into_station_graph() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_line(&server, 1, &["Tokyo", "Kanda", "Akihabara"]).await;
    mount_line(&server, 2, &["Akihabara", "Okachimachi", "Ueno"]).await;
    mount_line(&server, 3, &["Ochanomizu", "Akihabara"]).await;
    mount_line(&server, 4, &["Ueno"]).await;

    let config = create_test_config(&server.uri(), dir.path());
    let bulk = config.bulk.clone().unwrap();
    let stitch = config.stitch.clone().unwrap();
    let observer = Arc::new(CollectingObserver::new());

    run_bulk_fetch(&config, &bulk, observer.clone())
        .await
        .unwrap();

    let report = stitch_directory(&stitch, observer.as_ref()).unwrap();
    assert_eq!(report.files, 4);
    assert_eq!(report.graph.node_count(), 6);
    assert_eq!(report.graph.edge_count(), 5);
    assert!(report.graph.contains_edge("Akihabara", "Ochanomizu"));

    let snapshot = run_stitch(&config, &stitch, observer.as_ref()).unwrap();
    assert_eq!(snapshot.edge_count(), 5);

    let gexf = std::fs::read_to_string(dir.path().join("train_network_stitched.gexf")).unwrap();
    assert!(gexf.contains("defaultedgetype=\"undirected\""));
    assert!(gexf.contains("label=\"Okachimachi\""));
}

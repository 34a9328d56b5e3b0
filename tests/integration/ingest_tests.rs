//! Integration tests for the ingester
//!
//! These tests use wiremock to serve RSS feeds and drive full ingestion
//! cycles end-to-end against a SQLite file in a temp directory.

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use newsreel::config::{ApiConfig, Config, FeedsConfig, FetcherConfig, StorageConfig};
use newsreel::ingest::SchedulerState;
use newsreel::storage::{open_storage_with_retry, share, SharedStorage};
use newsreel::{api, ItemRecord, NewsError, Scheduler, SqliteStorage, Storage};
use std::time::Duration;
use tokio::sync::watch;
use tower::ServiceExt as _;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration for the given feeds
fn create_test_config(feeds: Vec<String>, db_path: &str) -> Config {
    Config {
        feeds: FeedsConfig {
            urls: feeds,
            request_period: Some(1),
        },
        fetcher: FetcherConfig {
            timeout_secs: 2,
            user_agent: "newsreel-test/1.0".to_string(),
        },
        storage: StorageConfig {
            database_path: db_path.to_string(),
            connect_retries: 1,
            retry_delay_ms: 1,
            max_consecutive_failures: 3,
        },
        api: ApiConfig::default(),
    }
}

/// Renders an RSS document with one item per (title, description) pair
fn rss(items: &[(&str, &str)]) -> String {
    let body: String = items
        .iter()
        .map(|(title, description)| {
            format!(
                "<item>\n  <title>{}</title>\n  <description>{}</description>\n  \
                 <pubDate>Tue, 02 Jan 2024 10:00:00 GMT</pubDate>\n</item>\n",
                title, description
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\"?>\n<rss version=\"2.0\">\
         <channel><title>Test</title>\n{}</channel></rss>",
        body
    )
}

async fn mount_feed(server: &MockServer, route: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

async fn open_shared(config: &Config) -> SharedStorage {
    share(
        open_storage_with_retry(&config.storage)
            .await
            .expect("Failed to open storage"),
    )
}

fn titles(storage: &SharedStorage, limit: usize) -> Vec<String> {
    storage
        .lock()
        .unwrap()
        .latest_items(limit)
        .unwrap()
        .into_iter()
        .map(|item| item.title)
        .collect()
}

#[tokio::test]
async fn test_cycle_stores_only_new_titles() {
    let mock_server = MockServer::start().await;
    mount_feed(
        &mock_server,
        "/f1",
        ResponseTemplate::new(200).set_body_string(rss(&[("A", "first"), ("B", "old")])),
    )
    .await;
    mount_feed(
        &mock_server,
        "/f2",
        ResponseTemplate::new(200).set_body_string(rss(&[("C", "third"), ("D", "old")])),
    )
    .await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("news.db");
    let feeds = vec![
        format!("{}/f1", mock_server.uri()),
        format!("{}/f2", mock_server.uri()),
    ];
    let config = create_test_config(feeds.clone(), db_path.to_str().unwrap());

    // Each feed serves one title that is already stored
    {
        let mut storage = SqliteStorage::new(&db_path).unwrap();
        storage
            .insert_new_items(&[
                ItemRecord::new("B", "stored earlier", "", "elsewhere"),
                ItemRecord::new("D", "also stored earlier", "", "elsewhere"),
            ])
            .unwrap();
    }

    let storage = open_shared(&config).await;
    let mut scheduler = Scheduler::from_config(&config, storage.clone()).unwrap();
    let report = scheduler.run_cycle().await.expect("Cycle should succeed");

    assert_eq!(report.extracted, 4);
    assert_eq!(report.stored, 2);
    assert_eq!(report.skipped(), 2);
    assert!(report.feed_failures.is_empty());
    assert_eq!(storage.lock().unwrap().count_items().unwrap(), 4);

    // Newest first, and the pre-existing rows are untouched
    assert_eq!(titles(&storage, 5), vec!["C", "A", "D", "B"]);
    let items = storage.lock().unwrap().latest_items(5).unwrap();
    assert_eq!(items[2].description, "also stored earlier");
    assert_eq!(items[3].description, "stored earlier");
    assert_eq!(items[0].source_link, feeds[1]);
    assert_eq!(items[1].source_link, feeds[0]);
}

#[tokio::test]
async fn test_failing_feed_does_not_block_others() {
    let mock_server = MockServer::start().await;
    mount_feed(&mock_server, "/broken", ResponseTemplate::new(500)).await;
    mount_feed(
        &mock_server,
        "/slow",
        ResponseTemplate::new(200)
            .set_body_string(rss(&[("Never", "too late")]))
            .set_delay(Duration::from_secs(5)),
    )
    .await;
    mount_feed(
        &mock_server,
        "/ok",
        ResponseTemplate::new(200).set_body_string(rss(&[("Survivor", "made it")])),
    )
    .await;

    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("news.db");
    let config = create_test_config(
        vec![
            format!("{}/broken", mock_server.uri()),
            format!("{}/slow", mock_server.uri()),
            format!("{}/ok", mock_server.uri()),
        ],
        db_path.to_str().unwrap(),
    );

    let storage = open_shared(&config).await;
    let mut scheduler = Scheduler::from_config(&config, storage.clone()).unwrap();
    let report = scheduler.run_cycle().await.unwrap();

    assert_eq!(report.feed_failures.len(), 2);
    assert_eq!(report.feeds_succeeded(), 1);
    assert_eq!(report.stored, 1);
    assert_eq!(titles(&storage, 10), vec!["Survivor"]);
}

#[tokio::test]
async fn test_merge_order_follows_configuration() {
    let mock_server = MockServer::start().await;
    mount_feed(
        &mock_server,
        "/first",
        ResponseTemplate::new(200)
            .set_body_string(rss(&[("Shared", "from first"), ("First only", "x")]))
            .set_delay(Duration::from_millis(400)),
    )
    .await;
    mount_feed(
        &mock_server,
        "/second",
        ResponseTemplate::new(200).set_body_string(rss(&[("Shared", "from second")])),
    )
    .await;

    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("news.db");
    let config = create_test_config(
        vec![
            format!("{}/first", mock_server.uri()),
            format!("{}/second", mock_server.uri()),
        ],
        db_path.to_str().unwrap(),
    );

    let storage = open_shared(&config).await;
    let mut scheduler = Scheduler::from_config(&config, storage.clone()).unwrap();
    let report = scheduler.run_cycle().await.unwrap();

    // The first feed in configuration order wins the shared title,
    // even though its response arrived last
    assert_eq!(report.extracted, 3);
    assert_eq!(report.stored, 2);
    let items = storage.lock().unwrap().latest_items(10).unwrap();
    let shared = items.iter().find(|i| i.title == "Shared").unwrap();
    assert_eq!(shared.description, "from first");
    assert_eq!(titles(&storage, 10), vec!["First only", "Shared"]);
}

#[tokio::test]
async fn test_repeated_cycles_are_idempotent() {
    let mock_server = MockServer::start().await;
    mount_feed(
        &mock_server,
        "/rss",
        ResponseTemplate::new(200).set_body_string(rss(&[("One", "1"), ("Two", "2")])),
    )
    .await;

    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("news.db");
    let config = create_test_config(
        vec![format!("{}/rss", mock_server.uri())],
        db_path.to_str().unwrap(),
    );

    let storage = open_shared(&config).await;
    let mut scheduler = Scheduler::from_config(&config, storage.clone()).unwrap();

    let first = scheduler.run_cycle().await.unwrap();
    let second = scheduler.run_cycle().await.unwrap();
    let third = scheduler.run_cycle().await.unwrap();

    assert_eq!(first.stored, 2);
    assert_eq!(second.stored, 0);
    assert_eq!(third.stored, 0);
    assert_eq!(storage.lock().unwrap().count_items().unwrap(), 2);
}

#[tokio::test]
async fn test_cdata_and_markup_are_cleaned() {
    let mock_server = MockServer::start().await;
    let body = "<rss><channel><item>\
        <title><![CDATA[Markets <rally>]]></title>\
        <description><![CDATA[<p>Stocks <b>rose</b> today.</p>]]></description>\
        <pubDate> Wed, 03 Jan 2024 08:00:00 GMT </pubDate>\
        </item></channel></rss>";
    mount_feed(
        &mock_server,
        "/rss",
        ResponseTemplate::new(200).set_body_string(body),
    )
    .await;

    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("news.db");
    let config = create_test_config(
        vec![format!("{}/rss", mock_server.uri())],
        db_path.to_str().unwrap(),
    );

    let storage = open_shared(&config).await;
    let mut scheduler = Scheduler::from_config(&config, storage.clone()).unwrap();
    scheduler.run_cycle().await.unwrap();

    let items = storage.lock().unwrap().latest_items(1).unwrap();
    assert_eq!(items[0].title, "Markets <rally>");
    assert_eq!(items[0].description, "Stocks rose today.");
    assert_eq!(items[0].publication_date, "Wed, 03 Jan 2024 08:00:00 GMT");
}

#[tokio::test]
async fn test_scheduler_runs_until_cancelled() {
    let mock_server = MockServer::start().await;
    mount_feed(
        &mock_server,
        "/rss",
        ResponseTemplate::new(200).set_body_string(rss(&[("Ticked", "yes")])),
    )
    .await;

    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("news.db");
    let config = create_test_config(
        vec![format!("{}/rss", mock_server.uri())],
        db_path.to_str().unwrap(),
    );

    let storage = open_shared(&config).await;
    let mut scheduler = Scheduler::from_config(&config, storage.clone()).unwrap();
    assert_eq!(scheduler.interval(), Duration::from_secs(1));

    let (tx, rx) = watch::channel(false);
    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        tx.send(true).unwrap();
    });

    tokio::time::timeout(Duration::from_secs(10), scheduler.run(rx))
        .await
        .expect("Scheduler should stop after cancellation")
        .expect("Scheduler should stop cleanly");
    stopper.await.unwrap();

    assert_eq!(scheduler.state(), SchedulerState::Terminated);
    assert_eq!(scheduler.reporter().history().count(), 1);
    assert_eq!(titles(&storage, 10), vec!["Ticked"]);
}

#[tokio::test]
async fn test_read_api_after_ingest() {
    let mock_server = MockServer::start().await;
    mount_feed(
        &mock_server,
        "/rss",
        ResponseTemplate::new(200).set_body_string(rss(&[("Old", "o"), ("New", "n")])),
    )
    .await;

    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("news.db");
    let config = create_test_config(
        vec![format!("{}/rss", mock_server.uri())],
        db_path.to_str().unwrap(),
    );

    let storage = open_shared(&config).await;
    let mut scheduler = Scheduler::from_config(&config, storage.clone()).unwrap();
    scheduler.run_cycle().await.unwrap();

    let app = api::router(storage, None);
    let req = Request::builder()
        .method("GET")
        .uri("/news/1")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let items: Vec<serde_json::Value> = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "New");
    assert_eq!(items[0]["link"], format!("{}/rss", mock_server.uri()));
}

#[tokio::test]
async fn test_unreachable_storage_stops_scheduler() {
    let mock_server = MockServer::start().await;
    mount_feed(
        &mock_server,
        "/rss",
        ResponseTemplate::new(200).set_body_string(rss(&[("Item", "i")])),
    )
    .await;

    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("news.db");
    let mut config = create_test_config(
        vec![format!("{}/rss", mock_server.uri())],
        db_path.to_str().unwrap(),
    );
    config.storage.max_consecutive_failures = 2;

    let storage = open_shared(&config).await;
    let mut scheduler = Scheduler::from_config(&config, storage.clone()).unwrap();

    // Poison the shared lock so every commit fails
    let poisoner = storage.clone();
    let _ = std::thread::spawn(move || {
        let _guard = poisoner.lock().unwrap();
        panic!("poisoning storage lock");
    })
    .join();

    let first = scheduler.run_cycle().await.unwrap();
    assert!(first.storage_error.is_some());
    assert_eq!(first.stored, 0);

    let second = scheduler.run_cycle().await;
    assert!(matches!(
        second,
        Err(NewsError::StorageUnavailable { consecutive: 2 })
    ));
}

//! End-to-end: one capture pass over a snapshot with a malformed item,
//! then an enrichment pass whose model response covers the surviving post.

use std::path::Path;

use birdwatch_capture::run_capture;
use birdwatch_core::AppConfig;
use birdwatch_db::PoolConfig;
use birdwatch_enrich::run_enrichment;
use sqlx::SqlitePool;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn test_pool() -> SqlitePool {
    let config = PoolConfig {
        max_connections: 1,
        acquire_timeout_secs: 5,
    };
    let pool = birdwatch_db::connect_pool("sqlite::memory:", config)
        .await
        .expect("in-memory pool should connect");
    birdwatch_db::run_migrations(&pool)
        .await
        .expect("migrations should apply");
    pool
}

fn test_config(dir: &Path, browser_url: &str, model_url: &str) -> AppConfig {
    let api_key_file = dir.join("key.txt");
    std::fs::write(&api_key_file, "test-key").expect("key file should write");

    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        log_level: "info".to_string(),
        bind_addr: "127.0.0.1:0".parse().expect("addr parses"),
        browser_url: browser_url.to_string(),
        browser_token: None,
        browser_timeout_secs: 5,
        timeline_url: "https://x.com/home".to_string(),
        capture_target: 10,
        screenshots_dir: dir.join("screenshots"),
        model_url: model_url.to_string(),
        model_name: "test-model".to_string(),
        api_key_file,
        model_timeout_secs: 5,
        dashboard_bin: "birdwatch-dashboard".to_string(),
        db_max_connections: 1,
        db_acquire_timeout_secs: 5,
    }
}

#[tokio::test]
async fn capture_then_enrich_leaves_no_unprocessed_posts() {
    let dir = tempfile::tempdir().unwrap();
    let browser = MockServer::start().await;
    let model = MockServer::start().await;
    let config = test_config(dir.path(), &browser.uri(), &model.uri());
    let pool = test_pool().await;

    // Two items: one complete, one with no timestamp. Only the first can
    // become a post.
    let items = serde_json::json!([
        {
            "text": "shipping a new release today",
            "author": "Builder",
            "author_handle": "@builder",
            "timestamp": "2025-03-01T10:00:00.000Z",
            "permalink": "/builder/status/4242",
            "repost": false,
            "media_links": [],
            "external_links": ["https://example.com/changelog"],
            "metrics": { "replies": "4", "likes": "1.2K" }
        },
        {
            "text": "half-rendered item",
            "author": "Ghost",
            "permalink": "/ghost/status/9999"
        }
    ]);
    Mock::given(method("POST"))
        .and(path("/function"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&items))
        .mount(&browser)
        .await;
    Mock::given(method("POST"))
        .and(path("/screenshot"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1, 2, 3]))
        .mount(&browser)
        .await;

    let capture_stats = run_capture(&config, &pool).await.expect("capture runs");
    assert_eq!(capture_stats.total, 1, "malformed item never becomes a post");
    assert_eq!(capture_stats.new_posts, 1);
    assert_eq!(capture_stats.new_links, 1);

    // The model answers for the surviving post only.
    let analyses = serde_json::json!([{
        "id": "4242",
        "summary": "release announcement",
        "sentiment": "excited",
        "category": "announcement",
    }]);
    let content = serde_json::json!({ "analyses": analyses }).to_string();
    let envelope = serde_json::json!({
        "choices": [ { "message": { "content": content } } ]
    });
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&envelope))
        .mount(&model)
        .await;

    let enrich_stats = run_enrichment(&config, &pool).await.expect("enrich runs");
    assert_eq!(enrich_stats.processed, 1);

    let remaining = birdwatch_db::next_unprocessed_batch(&pool, 10).await.unwrap();
    assert!(remaining.is_empty(), "every captured post ends up processed");

    let counts = birdwatch_db::post_counts(&pool).await.unwrap();
    assert_eq!(counts.total, 1);
    assert_eq!(counts.processed, 1);

    let observations = birdwatch_db::list_metric_observations(&pool, "4242")
        .await
        .unwrap();
    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].likes, 1200);
}

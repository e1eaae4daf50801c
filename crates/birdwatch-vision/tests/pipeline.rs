//! Visual-insight pipeline tests against a temp screenshot directory, an
//! in-memory store, and a mocked vision model.

use std::path::Path;

use birdwatch_core::AppConfig;
use birdwatch_db::PoolConfig;
use birdwatch_vision::{run_visual_insight, VisionError};
use chrono::{TimeZone, Utc};
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

fn test_config(dir: &Path, model_url: &str) -> AppConfig {
    let api_key_file = dir.join("key.txt");
    std::fs::write(&api_key_file, "test-key").expect("key file should write");

    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        log_level: "info".to_string(),
        bind_addr: "127.0.0.1:0".parse().expect("addr parses"),
        browser_url: "http://localhost:3000".to_string(),
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

fn write_screenshot(config: &AppConfig, name: &str) -> std::path::PathBuf {
    std::fs::create_dir_all(&config.screenshots_dir).expect("dir should create");
    let path = config.screenshots_dir.join(name);
    image::RgbaImage::new(48, 48)
        .save(&path)
        .expect("png should save");
    path
}

/// Wraps a vision JSON value in a chat-completion envelope.
fn envelope(payload: &serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "choices": [ { "message": { "content": payload.to_string() } } ]
    })
}

#[tokio::test]
async fn screenshot_is_analyzed_persisted_and_consumed() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    let config = test_config(dir.path(), &server.uri());
    let pool = test_pool().await;
    let source = write_screenshot(&config, "timeline_20250301_093000.png");

    let payload = serde_json::json!({
        "trends": [
            { "topic": "RustConf", "category": "Trending in Tech", "tweet_volume": "12400" },
            { "topic": "Elections", "tweet_volume": "12.4K posts" },
            { "topic": "   " }
        ],
        "recommendations": [
            { "username": "@ferris", "display_name": "Ferris", "description": "crab" },
            { "username": "", "display_name": "", "description": "nameless" }
        ]
    });
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(&payload)))
        .expect(1)
        .mount(&server)
        .await;

    let stats = run_visual_insight(&config, &pool)
        .await
        .expect("run should succeed");

    assert_eq!(stats.trends, 2);
    assert_eq!(stats.recommendations, 1);
    assert_eq!(stats.dropped_elements, 2);

    let trends = birdwatch_db::list_recent_trends(&pool, 10).await.unwrap();
    assert_eq!(trends.len(), 2);
    let rustconf = trends.iter().find(|t| t.topic == "RustConf").unwrap();
    assert_eq!(rustconf.tweet_volume, Some(12400));
    assert_eq!(
        rustconf.observed_at,
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap(),
        "observation time comes from the filename"
    );
    assert_eq!(
        rustconf.screenshot_ref,
        "processed_timeline_20250301_093000.png"
    );
    let elections = trends.iter().find(|t| t.topic == "Elections").unwrap();
    assert_eq!(elections.tweet_volume, None, "prose volume coerces to null");

    let recs = birdwatch_db::list_recent_recommendations(&pool, 10)
        .await
        .unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].username, "ferris");

    assert!(!source.exists(), "consumed screenshot is deleted");
    assert!(
        config
            .screenshots_dir
            .join("processed")
            .join("processed_timeline_20250301_093000.png")
            .exists(),
        "cropped derivative is retained"
    );
}

#[tokio::test]
async fn service_failure_retains_the_screenshot() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    let config = test_config(dir.path(), &server.uri());
    let pool = test_pool().await;
    let source = write_screenshot(&config, "timeline_20250301_093000.png");

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = run_visual_insight(&config, &pool).await.unwrap_err();
    assert!(matches!(err, VisionError::Model(_)));
    assert!(source.exists(), "failed runs never consume the artifact");
    assert!(birdwatch_db::list_recent_trends(&pool, 10)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn invalid_payload_shape_retains_the_screenshot() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    let config = test_config(dir.path(), &server.uri());
    let pool = test_pool().await;
    let source = write_screenshot(&config, "timeline_20250301_093000.png");

    // `recommendations` is missing; the strict parse must reject this.
    let payload = serde_json::json!({ "trends": [] });
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(&payload)))
        .mount(&server)
        .await;

    let err = run_visual_insight(&config, &pool).await.unwrap_err();
    assert!(matches!(err, VisionError::Deserialize { .. }));
    assert!(source.exists());
}

#[tokio::test]
async fn no_screenshot_is_a_noop_success() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    let config = test_config(dir.path(), &server.uri());
    let pool = test_pool().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let stats = run_visual_insight(&config, &pool)
        .await
        .expect("missing input is a clean no-op");
    assert_eq!(stats.trends, 0);
    assert_eq!(stats.recommendations, 0);
}

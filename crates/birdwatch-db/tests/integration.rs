//! Store invariant tests against an in-memory SQLite database.

use birdwatch_db::{MetricCounts, NewPost, NewRecommendation, NewTrend, PoolConfig};
use chrono::{TimeZone, Utc};
use sqlx::SqlitePool;

async fn test_pool() -> SqlitePool {
    // A second in-memory connection would see a different database, so the
    // pool is pinned to one connection.
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

fn sample_post(post_id: &str) -> NewPost {
    NewPost {
        post_id: post_id.to_string(),
        author: "Ada Lovelace".to_string(),
        author_handle: Some("@ada".to_string()),
        created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        text: "Engines should compute more than numbers.".to_string(),
        url: format!("https://twitter.com/ada/status/{post_id}"),
        media_links: None,
        is_original: true,
    }
}

#[tokio::test]
async fn repeated_post_upsert_keeps_one_row_and_two_observations() {
    let pool = test_pool().await;
    let post = sample_post("100");
    let counts = MetricCounts {
        replies: 1,
        reposts: 2,
        likes: 3,
        views: 400,
        bookmarks: 0,
    };

    let first = birdwatch_db::insert_post_if_absent(&pool, &post)
        .await
        .unwrap();
    birdwatch_db::insert_metric_observation(&pool, "100", Utc::now(), &counts)
        .await
        .unwrap();

    let second = birdwatch_db::insert_post_if_absent(&pool, &post)
        .await
        .unwrap();
    birdwatch_db::insert_metric_observation(&pool, "100", Utc::now(), &counts)
        .await
        .unwrap();

    assert!(first, "first upsert creates the row");
    assert!(!second, "second upsert is an ignored duplicate");

    let post_counts = birdwatch_db::post_counts(&pool).await.unwrap();
    assert_eq!(post_counts.total, 1);

    let observations = birdwatch_db::list_metric_observations(&pool, "100")
        .await
        .unwrap();
    assert_eq!(observations.len(), 2, "metrics append on every capture");
}

#[tokio::test]
async fn re_observation_never_overwrites_capture_fields() {
    let pool = test_pool().await;
    let original = sample_post("200");
    birdwatch_db::insert_post_if_absent(&pool, &original)
        .await
        .unwrap();

    let mut altered = sample_post("200");
    altered.text = "completely different text".to_string();
    altered.author = "Impostor".to_string();
    birdwatch_db::insert_post_if_absent(&pool, &altered)
        .await
        .unwrap();

    let batch = birdwatch_db::next_unprocessed_batch(&pool, 10)
        .await
        .unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].author, "Ada Lovelace");
    assert_eq!(batch[0].text, "Engines should compute more than numbers.");
}

#[tokio::test]
async fn duplicate_link_pair_yields_one_row() {
    let pool = test_pool().await;
    birdwatch_db::insert_post_if_absent(&pool, &sample_post("300"))
        .await
        .unwrap();

    let now = Utc::now();
    let first = birdwatch_db::insert_link_if_absent(&pool, "300", "https://example.com/a", now)
        .await
        .unwrap();
    let second = birdwatch_db::insert_link_if_absent(&pool, "300", "https://example.com/a", now)
        .await
        .unwrap();
    let other_post =
        birdwatch_db::insert_link_if_absent(&pool, "301", "https://example.com/a", now)
            .await
            .unwrap();

    assert!(first);
    assert!(!second, "same (post, url) pair is a no-op");
    assert!(other_post, "same url under another post is a new row");
}

#[tokio::test]
async fn processed_posts_leave_the_unprocessed_batch() {
    let pool = test_pool().await;
    for id in ["400", "401", "402"] {
        birdwatch_db::insert_post_if_absent(&pool, &sample_post(id))
            .await
            .unwrap();
    }

    let marked = birdwatch_db::mark_processed(
        &pool,
        "401",
        Utc::now(),
        "a summary",
        "neutral",
        "discussion",
    )
    .await
    .unwrap();
    assert!(marked);

    let batch = birdwatch_db::next_unprocessed_batch(&pool, 10)
        .await
        .unwrap();
    let ids: Vec<&str> = batch.iter().map(|p| p.post_id.as_str()).collect();
    assert_eq!(ids, vec!["400", "402"]);
}

#[tokio::test]
async fn batch_respects_limit_and_storage_order() {
    let pool = test_pool().await;
    for id in ["500", "501", "502", "503"] {
        birdwatch_db::insert_post_if_absent(&pool, &sample_post(id))
            .await
            .unwrap();
    }

    let batch = birdwatch_db::next_unprocessed_batch(&pool, 2).await.unwrap();
    let ids: Vec<&str> = batch.iter().map(|p| p.post_id.as_str()).collect();
    assert_eq!(ids, vec!["500", "501"]);

    // Marking the head of the batch processed advances the window.
    birdwatch_db::mark_processed(&pool, "500", Utc::now(), "s", "happy", "news")
        .await
        .unwrap();
    let batch = birdwatch_db::next_unprocessed_batch(&pool, 2).await.unwrap();
    let ids: Vec<&str> = batch.iter().map(|p| p.post_id.as_str()).collect();
    assert_eq!(ids, vec!["501", "502"]);
}

#[tokio::test]
async fn mark_processed_unknown_id_is_a_noop() {
    let pool = test_pool().await;
    let marked =
        birdwatch_db::mark_processed(&pool, "does-not-exist", Utc::now(), "s", "sad", "news")
            .await
            .unwrap();
    assert!(!marked);
}

#[tokio::test]
async fn trends_and_recommendations_append_without_dedup() {
    let pool = test_pool().await;
    let observed_at = Utc.with_ymd_and_hms(2025, 3, 2, 8, 30, 0).unwrap();

    let trend = NewTrend {
        topic: "RustConf".to_string(),
        category: Some("Trending in Tech".to_string()),
        tweet_volume: Some(12_400),
        observed_at,
        screenshot_ref: "processed_timeline_20250302_083000.png".to_string(),
    };
    birdwatch_db::insert_trend(&pool, &trend).await.unwrap();
    birdwatch_db::insert_trend(&pool, &trend).await.unwrap();

    let rec = NewRecommendation {
        username: "ferris".to_string(),
        display_name: "Ferris".to_string(),
        description: "unofficial mascot".to_string(),
        observed_at,
        screenshot_ref: "processed_timeline_20250302_083000.png".to_string(),
    };
    birdwatch_db::insert_recommendation(&pool, &rec).await.unwrap();

    let trends = birdwatch_db::list_recent_trends(&pool, 10).await.unwrap();
    assert_eq!(trends.len(), 2, "identical trend snapshots both persist");
    assert_eq!(trends[0].tweet_volume, Some(12_400));

    let recs = birdwatch_db::list_recent_recommendations(&pool, 10)
        .await
        .unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].username, "ferris");
}

#[tokio::test]
async fn recent_posts_join_latest_observation() {
    let pool = test_pool().await;
    birdwatch_db::insert_post_if_absent(&pool, &sample_post("600"))
        .await
        .unwrap();

    let early = Utc.with_ymd_and_hms(2025, 3, 1, 13, 0, 0).unwrap();
    let late = Utc.with_ymd_and_hms(2025, 3, 1, 14, 0, 0).unwrap();
    birdwatch_db::insert_metric_observation(
        &pool,
        "600",
        early,
        &MetricCounts {
            likes: 5,
            ..MetricCounts::default()
        },
    )
    .await
    .unwrap();
    birdwatch_db::insert_metric_observation(
        &pool,
        "600",
        late,
        &MetricCounts {
            likes: 90,
            ..MetricCounts::default()
        },
    )
    .await
    .unwrap();

    let rows = birdwatch_db::recent_posts_with_metrics(&pool, 10)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].likes, Some(90), "latest observation wins");
}

#[tokio::test]
async fn sentiment_breakdown_counts_processed_posts() {
    let pool = test_pool().await;
    for (id, sentiment) in [("700", "happy"), ("701", "happy"), ("702", "concerned")] {
        birdwatch_db::insert_post_if_absent(&pool, &sample_post(id))
            .await
            .unwrap();
        birdwatch_db::mark_processed(&pool, id, Utc::now(), "s", sentiment, "news")
            .await
            .unwrap();
    }
    // Unprocessed posts never count.
    birdwatch_db::insert_post_if_absent(&pool, &sample_post("703"))
        .await
        .unwrap();

    let breakdown = birdwatch_db::sentiment_breakdown(&pool).await.unwrap();
    assert_eq!(breakdown.len(), 2);
    assert_eq!(breakdown[0].sentiment, "happy");
    assert_eq!(breakdown[0].count, 2);
    assert_eq!(breakdown[1].sentiment, "concerned");
    assert_eq!(breakdown[1].count, 1);
}

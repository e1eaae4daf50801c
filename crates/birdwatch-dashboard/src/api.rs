//! Read-only JSON API over the ingestion store.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/stats", get(stats))
        .route("/api/posts/recent", get(recent_posts))
        .route("/api/sentiment/summary", get(sentiment_summary))
        .route("/api/trends", get(recent_trends))
        .route("/api/recommendations", get(recent_recommendations))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

struct ApiError(birdwatch_db::DbError);

impl From<birdwatch_db::DbError> for ApiError {
    fn from(err: birdwatch_db::DbError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "dashboard query failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "internal error" })),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<i64>,
}

fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

#[derive(Debug, Serialize)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

async fn healthz(State(state): State<AppState>) -> Response {
    match birdwatch_db::ping(&state.pool).await {
        Ok(()) => Json(HealthData {
            status: "ok",
            database: "ok",
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthData {
                    status: "degraded",
                    database: "unreachable",
                }),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Serialize)]
struct StatsData {
    total_posts: i64,
    processed_posts: i64,
}

async fn stats(State(state): State<AppState>) -> Result<Json<StatsData>, ApiError> {
    let counts = birdwatch_db::post_counts(&state.pool).await?;
    Ok(Json(StatsData {
        total_posts: counts.total,
        processed_posts: counts.processed,
    }))
}

#[derive(Debug, Serialize)]
struct RecentPostItem {
    post_id: String,
    author: String,
    author_handle: Option<String>,
    created_at: DateTime<Utc>,
    text: String,
    url: String,
    summary: Option<String>,
    sentiment: Option<String>,
    category: Option<String>,
    replies: Option<i64>,
    reposts: Option<i64>,
    likes: Option<i64>,
    views: Option<i64>,
    bookmarks: Option<i64>,
}

async fn recent_posts(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<RecentPostItem>>, ApiError> {
    let rows =
        birdwatch_db::recent_posts_with_metrics(&state.pool, normalize_limit(query.limit)).await?;

    let data = rows
        .into_iter()
        .map(|row| RecentPostItem {
            post_id: row.post_id,
            author: row.author,
            author_handle: row.author_handle,
            created_at: row.created_at,
            text: row.text,
            url: row.url,
            summary: row.summary,
            sentiment: row.sentiment,
            category: row.category,
            replies: row.replies,
            reposts: row.reposts,
            likes: row.likes,
            views: row.views,
            bookmarks: row.bookmarks,
        })
        .collect();

    Ok(Json(data))
}

#[derive(Debug, Serialize)]
struct SentimentSummaryItem {
    sentiment: String,
    count: i64,
}

async fn sentiment_summary(
    State(state): State<AppState>,
) -> Result<Json<Vec<SentimentSummaryItem>>, ApiError> {
    let rows = birdwatch_db::sentiment_breakdown(&state.pool).await?;
    let data = rows
        .into_iter()
        .map(|row| SentimentSummaryItem {
            sentiment: row.sentiment,
            count: row.count,
        })
        .collect();
    Ok(Json(data))
}

#[derive(Debug, Serialize)]
struct TrendItem {
    topic: String,
    category: Option<String>,
    tweet_volume: Option<i64>,
    observed_at: DateTime<Utc>,
    screenshot_ref: String,
}

async fn recent_trends(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<TrendItem>>, ApiError> {
    let rows = birdwatch_db::list_recent_trends(&state.pool, normalize_limit(query.limit)).await?;
    let data = rows
        .into_iter()
        .map(|row| TrendItem {
            topic: row.topic,
            category: row.category,
            tweet_volume: row.tweet_volume,
            observed_at: row.observed_at,
            screenshot_ref: row.screenshot_ref,
        })
        .collect();
    Ok(Json(data))
}

#[derive(Debug, Serialize)]
struct RecommendationItem {
    username: String,
    display_name: String,
    description: String,
    observed_at: DateTime<Utc>,
}

async fn recent_recommendations(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<RecommendationItem>>, ApiError> {
    let rows =
        birdwatch_db::list_recent_recommendations(&state.pool, normalize_limit(query.limit))
            .await?;
    let data = rows
        .into_iter()
        .map(|row| RecommendationItem {
            username: row.username,
            display_name: row.display_name,
            description: row.description,
            observed_at: row.observed_at,
        })
        .collect();
    Ok(Json(data))
}

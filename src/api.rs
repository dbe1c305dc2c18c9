//! Thin HTTP shim over `ArticleService`.
//!
//! - `GET /api/articles?refresh=true`: next batch (`FetchResult`)
//! - `GET /api/feeds`: configured feed catalog
//! - `GET /api/health`: liveness probe

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::ingest::types::{ApiResponse, FeedSource, FetchResult};
use crate::service::ArticleService;

#[derive(Clone)]
pub struct AppState {
    pub service: ArticleService,
}

impl AppState {
    pub fn new(service: ArticleService) -> Self {
        Self { service }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/articles", get(get_articles))
        .route("/api/feeds", get(get_feeds))
        .route("/api/health", get(health))
        .fallback(not_found)
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct ArticlesQuery {
    #[serde(default)]
    refresh: bool,
}

async fn get_articles(
    State(state): State<AppState>,
    Query(q): Query<ArticlesQuery>,
) -> (StatusCode, Json<FetchResult>) {
    let result = state.service.fetch_articles(q.refresh).await;
    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(result))
}

async fn get_feeds(State(state): State<AppState>) -> Json<ApiResponse<Vec<FeedSource>>> {
    Json(ApiResponse::ok(state.service.config().feeds.clone()))
}

#[derive(serde::Serialize)]
struct Health {
    status: &'static str,
    timestamp: String,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "OK",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not Found" })),
    )
}

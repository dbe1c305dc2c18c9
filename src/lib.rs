// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod clock;
pub mod ingest;
pub mod metrics;
pub mod select;
pub mod service;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::ingest::config::{load_config_default, ServiceConfig};
pub use crate::ingest::parser::parse_feed;
pub use crate::ingest::types::{ApiResponse, ArticleRecord, FeedSource, FetchResult, Sentiment};
pub use crate::service::ArticleService;

use std::sync::Arc;

use crate::ingest::relay::ReqwestTransport;

/// Build the full in-process app (API + `/metrics`) from a loaded config.
pub fn build_app(config: ServiceConfig) -> anyhow::Result<axum::Router> {
    let metrics = crate::metrics::Metrics::init(config.cache_ttl_secs)?;
    let transport = Arc::new(ReqwestTransport::new()?);
    let service = ArticleService::new(config, transport);
    Ok(router(AppState::new(service)).merge(metrics.router()))
}

//! Goodish News: binary entrypoint.
//! Boots the Axum HTTP server with the article service, CORS and `/metrics`.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a tracing subscriber unless the runtime already did.
/// `RUST_LOG` controls filtering; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("goodish_news=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let config = goodish_news::load_config_default()?;
    tracing::info!(
        feeds = config.feeds.len(),
        relays = config.relays.len(),
        page_size = config.page_size,
        cache_ttl_secs = config.cache_ttl_secs,
        "starting goodish-news"
    );

    let router = goodish_news::build_app(config)?;
    Ok(router.into())
}

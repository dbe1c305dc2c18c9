// tests/common/mod.rs
// Shared wiring for service-level tests: stub feeds behind a fake relay.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

use goodish_news::clock::ManualClock;
use goodish_news::ingest::relay::{Relay, RelayFormat, StubTransport};
use goodish_news::{ArticleService, FeedSource, ServiceConfig};

pub const FEED_ONE: &str = "https://feed-one.test/rss";
pub const FEED_TWO: &str = "https://feed-two.test/rss";

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
}

/// RSS document with `n` complete items, links `https://{host}/story/{i}`.
pub fn rss_with_items(host: &str, n: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Stub</title>"#,
    );
    for i in 0..n {
        xml.push_str(&format!(
            "<item><title>Story {i}</title><link>https://{host}/story/{i}</link>\
             <description>Something nice happened, part {i}.</description></item>"
        ));
    }
    xml.push_str("</channel></rss>");
    xml
}

pub fn config_for(feeds: &[(&str, &str)]) -> ServiceConfig {
    ServiceConfig {
        page_size: 3,
        cache_ttl_secs: 30 * 60,
        relay_timeout_ms: 500,
        fallback_delay_ms: 0,
        feeds: feeds
            .iter()
            .map(|(url, name)| FeedSource::new(url, name, "test"))
            .collect(),
        relays: vec![Relay::new(
            "relay-a",
            "https://relay-a.test/?u={url}",
            RelayFormat::Raw,
        )],
        fallback_images: vec!["https://fb.test/0.jpg".to_string()],
        ..ServiceConfig::default()
    }
}

pub struct Harness {
    pub service: ArticleService,
    pub stub: Arc<StubTransport>,
    pub clock: Arc<ManualClock>,
}

pub fn harness(config: ServiceConfig, stub: StubTransport, seed: u64) -> Harness {
    let stub = Arc::new(stub);
    let clock = Arc::new(ManualClock::new(start()));
    let service = ArticleService::with_parts(
        config,
        stub.clone(),
        clock.clone(),
        StdRng::seed_from_u64(seed),
    );
    Harness {
        service,
        stub,
        clock,
    }
}

/// One feed answering with `n` items.
pub fn single_feed(n: usize) -> Harness {
    let stub = StubTransport::new().route(&["feed-one.test"], 200, rss_with_items("one.test", n));
    harness(config_for(&[(FEED_ONE, "Feed One")]), stub, 7)
}

pub fn slow_single_feed(n: usize, delay: Duration) -> Harness {
    let stub = StubTransport::new()
        .route(&["feed-one.test"], 200, rss_with_items("one.test", n))
        .with_delay(delay);
    harness(config_for(&[(FEED_ONE, "Feed One")]), stub, 7)
}

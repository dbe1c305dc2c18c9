// src/ingest/config.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::relay::{Relay, RelayFormat};
use crate::ingest::types::FeedSource;

pub const ENV_CONFIG_PATH: &str = "GOODISH_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/goodish.toml";
pub const DEFAULT_JSON_PATH: &str = "config/goodish.json";

fn default_page_size() -> usize {
    3
}
fn default_cache_ttl_secs() -> u64 {
    30 * 60
}
fn default_max_items_per_feed() -> usize {
    10
}
fn default_excerpt_max_chars() -> usize {
    800
}
fn default_relay_timeout_ms() -> u64 {
    8_000
}
fn default_fallback_delay_ms() -> u64 {
    1_000
}

/// Runtime knobs for the ingestion pipeline and the batch cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    /// Articles per served batch.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_max_items_per_feed")]
    pub max_items_per_feed: usize,
    #[serde(default = "default_excerpt_max_chars")]
    pub excerpt_max_chars: usize,
    /// Upper bound for a single relay attempt.
    #[serde(default = "default_relay_timeout_ms")]
    pub relay_timeout_ms: u64,
    /// Pause before handing out the built-in sample set.
    #[serde(default = "default_fallback_delay_ms")]
    pub fallback_delay_ms: u64,
    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedSource>,
    #[serde(default = "default_relays")]
    pub relays: Vec<Relay>,
    #[serde(default = "default_fallback_images")]
    pub fallback_images: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            cache_ttl_secs: default_cache_ttl_secs(),
            max_items_per_feed: default_max_items_per_feed(),
            excerpt_max_chars: default_excerpt_max_chars(),
            relay_timeout_ms: default_relay_timeout_ms(),
            fallback_delay_ms: default_fallback_delay_ms(),
            feeds: default_feeds(),
            relays: default_relays(),
            fallback_images: default_fallback_images(),
        }
    }
}

impl ServiceConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn relay_timeout(&self) -> Duration {
        Duration::from_millis(self.relay_timeout_ms)
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            bail!("page_size must be at least 1");
        }
        if self.max_items_per_feed == 0 {
            bail!("max_items_per_feed must be at least 1");
        }
        for r in &self.relays {
            if !r.template.contains("{url}") {
                bail!("relay '{}' template lacks a {{url}} placeholder", r.name);
            }
        }
        Ok(())
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<ServiceConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let cfg = parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing config {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load config using env var + fallbacks:
/// 1) $GOODISH_CONFIG_PATH
/// 2) config/goodish.toml
/// 3) config/goodish.json
/// 4) built-in defaults
pub fn load_config_default() -> Result<ServiceConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from(DEFAULT_TOML_PATH);
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from(DEFAULT_JSON_PATH);
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(ServiceConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<ServiceConfig> {
    // JSON documents start with '{'; anything else is tried as TOML first.
    let looks_json = hint_ext == "json" || s.trim_start().starts_with('{');
    if looks_json {
        return serde_json::from_str(s).map_err(Into::into);
    }
    match toml::from_str(s) {
        Ok(cfg) => Ok(cfg),
        Err(toml_err) => serde_json::from_str(s).map_err(|_| anyhow!(toml_err)),
    }
}

pub fn default_feeds() -> Vec<FeedSource> {
    vec![
        FeedSource::new(
            "https://www.goodnewsnetwork.org/category/news/feed/",
            "Good News Network",
            "news",
        ),
        FeedSource::new("https://www.positive.news/feed/", "Positive News", "general"),
        FeedSource::new(
            "https://www.optimistdaily.com/feed/",
            "The Optimist Daily",
            "lifestyle",
        ),
        FeedSource::new(
            "https://www.goodgoodgood.co/articles/rss.xml",
            "Good Good Good",
            "general",
        ),
        FeedSource::new(
            "https://reasonstobecheerful.world/feed/",
            "Reasons to be Cheerful",
            "lifestyle",
        ),
        FeedSource::new(
            "https://notallnewsisbad.com/feed/",
            "Not All News is Bad",
            "news",
        ),
        FeedSource::new(
            "https://feeds.feedburner.com/SunnySkyz",
            "Sunny Skyz",
            "general",
        ),
        FeedSource::new(
            "https://www.upworthy.com/feeds/feed.rss",
            "Upworthy",
            "social",
        ),
    ]
}

pub fn default_relays() -> Vec<Relay> {
    vec![
        Relay::new(
            "codetabs",
            "https://api.codetabs.com/v1/proxy?quest={url}",
            RelayFormat::Raw,
        ),
        Relay::new("corsproxy", "https://corsproxy.io/?{url}", RelayFormat::Raw),
        Relay::new(
            "allorigins",
            "https://api.allorigins.win/get?url={url}",
            RelayFormat::JsonContents,
        ),
    ]
}

pub fn default_fallback_images() -> Vec<String> {
    [
        "https://images.unsplash.com/photo-1506905925346-21bda4d32df4?w=800&q=80",
        "https://images.unsplash.com/photo-1441974231531-c6227db76b6e?w=800&q=80",
        "https://images.unsplash.com/photo-1544551763-46a013bb70d5?w=800&q=80",
        "https://images.unsplash.com/photo-1469474968028-56623f02e42e?w=800&q=80",
        "https://images.unsplash.com/photo-1470071459604-3b5ec3a7fe05?w=800&q=80",
        "https://images.unsplash.com/photo-1500382017468-9049fed747ef?w=800&q=80",
        "https://images.unsplash.com/photo-1465146344425-f00d5f5c8f07?w=800&q=80",
        "https://images.unsplash.com/photo-1518837695005-2083093ee35b?w=800&q=80",
        "https://images.unsplash.com/photo-1501436513145-30f24e19fcc4?w=800&q=80",
        "https://images.unsplash.com/photo-1558618047-3c8c76ca7d13?w=800&q=80",
        "https://images.unsplash.com/photo-1504681869696-d977211a5f4c?w=800&q=80",
        "https://images.unsplash.com/photo-1502780402662-acc01917738e?w=800&q=80",
        "https://images.unsplash.com/photo-1417325384643-aac51acc9e5d?w=800&q=80",
        "https://images.unsplash.com/photo-1566041510394-cf7c8fe21800?w=800&q=80",
        "https://images.unsplash.com/photo-1554189097-ffe88e998a2b?w=800&q=80",
        "https://images.unsplash.com/photo-1500375592092-40eb2168fd21?w=800&q=80",
        "https://images.unsplash.com/photo-1527004760525-d49e17cf2dcf?w=800&q=80",
        "https://images.unsplash.com/photo-1498081959737-f3ba1af08103?w=800&q=80",
        "https://images.unsplash.com/photo-1419242902214-272b3f66ee7a?w=800&q=80",
        "https://images.unsplash.com/photo-1506905925346-21bda4d32df4?w=800&q=80",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

// src/ingest/relay.rs
//! Feed retrieval through third-party relay endpoints.
//!
//! Origin feeds are often unreachable directly, so each feed URL is tried
//! through an ordered list of relays until one hands back something that looks
//! like a feed. Every relay failure is logged and swallowed.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const FEED_ACCEPT: &str = "application/rss+xml, application/xml, text/xml, */*";

/// Substrings whose presence marks a body as feed XML.
const FEED_MARKERS: [&str; 3] = ["<rss", "<feed", "<rdf:RDF"];

/// Status + body of a completed GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Minimal HTTP capability the relay fetcher needs. Swappable in tests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse>;
}

/// Production transport on `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("goodish-news/0.1")
            .connect_timeout(Duration::from_secs(4))
            .build()
            .context("building reqwest client")?;
        Ok(Self { http })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse> {
        let resp = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, FEED_ACCEPT)
            .timeout(timeout)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let status = resp.status().as_u16();
        let body = resp.text().await.context("reading relay body")?;
        Ok(HttpResponse { status, body })
    }
}

/// How a relay packages the upstream document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RelayFormat {
    /// Body is the feed itself.
    Raw,
    /// Body is JSON with the feed in a `contents` string.
    JsonContents,
}

/// One relay endpoint; `template` carries a `{url}` placeholder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relay {
    pub name: String,
    pub template: String,
    pub format: RelayFormat,
}

impl Relay {
    pub fn new(name: &str, template: &str, format: RelayFormat) -> Self {
        Self {
            name: name.to_string(),
            template: template.to_string(),
            format,
        }
    }

    /// Relay URL for `feed_url`, URL-encoded into the placeholder.
    pub fn url_for(&self, feed_url: &str) -> String {
        self.template.replace("{url}", &urlencoding::encode(feed_url))
    }

    /// Pull the feed document out of a relay response body.
    pub fn unwrap_body(&self, body: String) -> Result<String> {
        match self.format {
            RelayFormat::Raw => Ok(body),
            RelayFormat::JsonContents => {
                #[derive(Deserialize)]
                struct Wrapped {
                    contents: Option<String>,
                }
                let w: Wrapped =
                    serde_json::from_str(&body).context("decoding relay json wrapper")?;
                match w.contents {
                    Some(c) => Ok(c),
                    None => bail!("relay json has no contents"),
                }
            }
        }
    }
}

pub fn looks_like_feed(text: &str) -> bool {
    FEED_MARKERS.iter().any(|m| text.contains(m))
}

/// Tries relays in order for a single feed.
#[derive(Clone)]
pub struct RelayFetcher {
    transport: Arc<dyn HttpTransport>,
    relays: Vec<Relay>,
    timeout: Duration,
}

impl RelayFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, relays: Vec<Relay>, timeout: Duration) -> Self {
        Self {
            transport,
            relays,
            timeout,
        }
    }

    /// Feed XML from the first relay that yields a feed, or `None` when all fail.
    pub async fn fetch_feed(&self, feed_url: &str) -> Option<String> {
        for relay in &self.relays {
            match self.try_relay(relay, feed_url).await {
                Ok(xml) => {
                    tracing::debug!(relay = %relay.name, feed = feed_url, bytes = xml.len(), "relay ok");
                    return Some(xml);
                }
                Err(e) => {
                    tracing::debug!(relay = %relay.name, feed = feed_url, error = %e, "relay failed");
                    counter!("goodish_relay_errors_total").increment(1);
                }
            }
        }
        tracing::warn!(feed = feed_url, relays = self.relays.len(), "all relays failed");
        None
    }

    async fn try_relay(&self, relay: &Relay, feed_url: &str) -> Result<String> {
        let url = relay.url_for(feed_url);
        let resp = self.transport.get(&url, self.timeout).await?;
        if !resp.is_success() {
            bail!("status {}", resp.status);
        }
        let text = relay.unwrap_body(resp.body)?;
        if !looks_like_feed(&text) {
            bail!("body is not a feed");
        }
        Ok(text)
    }
}

// --- Test helper ---

/// Canned transport: answers from a route table and counts calls.
/// A route matches when every needle occurs in the requested URL; unmatched
/// URLs fail like a network error.
pub struct StubTransport {
    routes: Vec<(Vec<String>, HttpResponse)>,
    delay: Duration,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn route(mut self, needles: &[&str], status: u16, body: impl Into<String>) -> Self {
        self.routes.push((
            needles.iter().map(|n| n.to_string()).collect(),
            HttpResponse {
                status,
                body: body.into(),
            },
        ));
        self
    }

    /// Simulated latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

impl Default for StubTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(url.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.routes
            .iter()
            .find(|(needles, _)| needles.iter().all(|n| url.contains(n.as_str())))
            .map(|(_, resp)| resp.clone())
            .ok_or_else(|| anyhow::anyhow!("connection refused: {url}"))
    }
}

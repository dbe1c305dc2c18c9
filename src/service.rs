// src/service.rs
//! Aggregation cache: the one entry point the display layer calls.
//!
//! A call ends up in one of four places:
//! - **in flight**: another call is already running an operation; await its result.
//! - **rotation hit**: the cache is fresh and holds articles not yet served.
//! - **cold fetch**: walk the (shuffled) feed catalog until one feed parses to
//!   at least one article.
//! - **fallback**: nothing parsed; serve the built-in sample set.
//!
//! Every call goes through a single in-flight slot, so two ingestions never
//! run at once. The operation itself runs as a spawned task: it completes, and
//! frees the slot, even if every caller awaiting it goes away.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, TimeDelta, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use metrics::{counter, gauge};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::clock::{Clock, SystemClock};
use crate::ingest::config::ServiceConfig;
use crate::ingest::parser::FeedParser;
use crate::ingest::relay::{HttpTransport, RelayFetcher};
use crate::ingest::samples::sample_articles;
use crate::ingest::types::{ApiResponse, ArticleRecord, FetchResult};
use crate::select::select_diverse;

type PendingBatch = Shared<BoxFuture<'static, FetchResult>>;

#[derive(Debug, Default)]
struct CacheState {
    all_fetched: Vec<ArticleRecord>,
    fetched_at: Option<DateTime<Utc>>,
    /// Always a subset of the ids in `all_fetched`.
    served_ids: HashSet<String>,
}

/// Read-only view of the cache for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSnapshot {
    pub articles: usize,
    pub served: usize,
    pub fetched_at: Option<DateTime<Utc>>,
    pub sources: Vec<String>,
}

struct Inner {
    config: ServiceConfig,
    fetcher: RelayFetcher,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
    state: Mutex<CacheState>,
    in_flight: Mutex<Option<PendingBatch>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

/// Empties the in-flight slot when the operation task ends, panics included.
/// Cache state is installed before this runs, so a caller arriving afterwards
/// sees the fresh cache.
struct ClearInFlight(Arc<Inner>);

impl Drop for ClearInFlight {
    fn drop(&mut self) {
        *lock(&self.0.in_flight) = None;
    }
}

/// Cloneable handle; clones share one cache and one in-flight slot.
#[derive(Clone)]
pub struct ArticleService {
    inner: Arc<Inner>,
}

impl ArticleService {
    /// Production wiring: system clock, OS-seeded randomness.
    pub fn new(config: ServiceConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_parts(
            config,
            transport,
            Arc::new(SystemClock),
            StdRng::from_os_rng(),
        )
    }

    pub fn with_parts(
        config: ServiceConfig,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
        rng: StdRng,
    ) -> Self {
        crate::ingest::ensure_metrics_described();
        let fetcher = RelayFetcher::new(transport, config.relays.clone(), config.relay_timeout());
        Self {
            inner: Arc::new(Inner {
                config,
                fetcher,
                clock,
                rng: Mutex::new(rng),
                state: Mutex::new(CacheState::default()),
                in_flight: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    /// Boundary name used by the display layer.
    pub async fn fetch_articles(&self, force_refresh: bool) -> FetchResult {
        self.get_batch(force_refresh).await
    }

    /// Serve the next batch. Never panics; failures come back in the envelope.
    ///
    /// A call made while another operation is in flight gets that operation's
    /// result, whatever its own `force_refresh`. A forced call that lands on an
    /// in-flight rotation therefore receives the rotated batch, not a refetch.
    pub async fn get_batch(&self, force_refresh: bool) -> FetchResult {
        let (pending, joined) = {
            let mut slot = lock(&self.inner.in_flight);
            match slot.as_ref() {
                Some(p) => (p.clone(), true),
                None => {
                    let p = self.start_operation(force_refresh);
                    *slot = Some(p.clone());
                    (p, false)
                }
            }
        };
        if joined {
            tracing::debug!(force_refresh, "joining operation already in flight");
            counter!("goodish_inflight_joins_total").increment(1);
        }

        pending.await
    }

    /// Spawn the operation; the caller must hold the `in_flight` lock, so the
    /// task cannot clear the slot before it has been filled.
    fn start_operation(&self, force_refresh: bool) -> PendingBatch {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let _slot = ClearInFlight(Arc::clone(&inner));
            inner.perform(force_refresh).await
        });
        async move {
            match task.await {
                Ok(batch) => ApiResponse::ok(batch),
                Err(e) => {
                    tracing::error!(error = %e, "article fetch task died");
                    ApiResponse::failure(if e.is_panic() {
                        "article fetch panicked"
                    } else {
                        "article fetch was cancelled"
                    })
                }
            }
        }
        .boxed()
        .shared()
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let st = lock(&self.inner.state);
        let mut sources: Vec<String> = st.all_fetched.iter().map(|a| a.source.clone()).collect();
        sources.sort();
        sources.dedup();
        CacheSnapshot {
            articles: st.all_fetched.len(),
            served: st.served_ids.len(),
            fetched_at: st.fetched_at,
            sources,
        }
    }
}

impl Inner {
    /// Relay and parse failures are absorbed on the way down (next relay, next
    /// feed, samples), so this always produces a batch.
    async fn perform(&self, force_refresh: bool) -> Vec<ArticleRecord> {
        let now = self.clock.now();
        if force_refresh {
            let mut st = lock(&self.state);
            st.all_fetched.clear();
            st.served_ids.clear();
            st.fetched_at = None;
        } else if let Some(batch) = self.rotate(now) {
            counter!("goodish_batches_total", "path" => "rotation").increment(1);
            return batch;
        }
        self.cold_fetch(now).await
    }

    fn is_fresh(&self, st: &CacheState, now: DateTime<Utc>) -> bool {
        let ttl = TimeDelta::from_std(self.config.cache_ttl()).unwrap_or(TimeDelta::MAX);
        !st.all_fetched.is_empty()
            && st
                .fetched_at
                .is_some_and(|at| now.signed_duration_since(at) < ttl)
    }

    /// Next unused batch from a fresh cache. When everything has been served the
    /// served set is cleared and rotation starts over, once.
    fn rotate(&self, now: DateTime<Utc>) -> Option<Vec<ArticleRecord>> {
        let mut st = lock(&self.state);
        if !self.is_fresh(&st, now) {
            return None;
        }

        for restarted in [false, true] {
            let unused: Vec<ArticleRecord> = st
                .all_fetched
                .iter()
                .filter(|a| !st.served_ids.contains(&a.id))
                .cloned()
                .collect();
            if unused.is_empty() {
                if !restarted {
                    tracing::debug!(articles = st.all_fetched.len(), "rotation exhausted, restarting");
                    st.served_ids.clear();
                }
                continue;
            }

            let batch = {
                let mut rng = lock(&self.rng);
                select_diverse(&unused, self.config.page_size, &mut *rng)
            };
            st.served_ids.extend(batch.iter().map(|a| a.id.clone()));
            return Some(batch);
        }
        None
    }

    async fn cold_fetch(&self, now: DateTime<Utc>) -> Vec<ArticleRecord> {
        let mut feeds = self.config.feeds.clone();
        {
            let mut rng = lock(&self.rng);
            feeds.shuffle(&mut *rng);
        }

        for feed in &feeds {
            let Some(xml) = self.fetcher.fetch_feed(&feed.url).await else {
                counter!("goodish_feed_empty_total").increment(1);
                continue;
            };
            let articles = {
                let mut rng = lock(&self.rng);
                FeedParser::new(&feed.name, &self.config.fallback_images, now)
                    .max_items(self.config.max_items_per_feed)
                    .excerpt_max_chars(self.config.excerpt_max_chars)
                    .parse(&xml, &mut *rng)
            };
            if articles.is_empty() {
                tracing::warn!(feed = %feed.name, "feed parsed to zero articles");
                counter!("goodish_feed_empty_total").increment(1);
                continue;
            }

            let batch = {
                let mut rng = lock(&self.rng);
                select_diverse(&articles, self.config.page_size, &mut *rng)
            };
            tracing::info!(
                feed = %feed.name,
                articles = articles.len(),
                served = batch.len(),
                "cold fetch complete"
            );
            counter!("goodish_batches_total", "path" => "cold").increment(1);
            self.install(articles, &batch, now);
            return batch;
        }

        tracing::info!(feeds = feeds.len(), "no feed yielded articles, serving samples");
        tokio::time::sleep(self.config.fallback_delay()).await;
        let samples = sample_articles(now, self.config.page_size);
        counter!("goodish_batches_total", "path" => "fallback").increment(1);
        self.install(samples.clone(), &samples, now);
        samples
    }

    fn install(&self, all: Vec<ArticleRecord>, batch: &[ArticleRecord], now: DateTime<Utc>) {
        let mut st = lock(&self.state);
        st.served_ids = batch.iter().map(|a| a.id.clone()).collect();
        st.all_fetched = all;
        st.fetched_at = Some(now);
        gauge!("goodish_cache_articles").set(st.all_fetched.len() as f64);
    }
}

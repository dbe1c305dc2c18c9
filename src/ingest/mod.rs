// src/ingest/mod.rs
pub mod config;
pub mod image;
pub mod parser;
pub mod relay;
pub mod samples;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "goodish_batches_total",
            "Batches served, labelled by path (rotation, cold, fallback)."
        );
        describe_counter!(
            "goodish_relay_errors_total",
            "Relay attempts that failed or returned non-feed content."
        );
        describe_counter!(
            "goodish_feed_empty_total",
            "Feeds that yielded no articles during a cold fetch."
        );
        describe_counter!(
            "goodish_articles_parsed_total",
            "Articles emitted by the feed parser."
        );
        describe_counter!(
            "goodish_inflight_joins_total",
            "Callers that attached to an operation already in flight."
        );
        describe_histogram!("goodish_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!(
            "goodish_cache_articles",
            "Articles held by the rotation cache."
        );
    });
}

/// Normalize feed text: decode entities, strip tags, fold quotes, collapse whitespace.
///
/// Entities are decoded before tags are stripped, and the pass repeats until the
/// text stops changing, so double-encoded markup (`&amp;lt;b&amp;gt;`) is removed
/// at any nesting depth and `normalize_text(normalize_text(s)) == normalize_text(s)`.
/// A changing pass never grows the text (only the `…` fold keeps its byte
/// length, and it cannot recur), so the loop always settles.
pub fn normalize_text(s: &str) -> String {
    let mut out = normalize_pass(s);
    loop {
        let next = normalize_pass(&out);
        if next == out || next.len() > out.len() {
            return out;
        }
        out = next;
    }
}

fn normalize_pass(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }

    // 1) HTML entity decode (named, decimal and hex forms)
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?s)<[^>]*>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ … to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace('\u{2026}', "...");

    // 4) Collapse whitespace (\s is Unicode-aware, so NBSP folds too)
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

/// Truncate to `max` chars. The `...` marker is appended when `original_len`
/// (the raw decoded length, before tags were stripped) exceeds `max`.
pub fn truncate_excerpt(normalized: &str, original_len: usize, max: usize) -> String {
    let mut out: String = normalized.chars().take(max).collect();
    if original_len > max {
        out.push_str("...");
    }
    out
}

// src/ingest/parser.rs
//! Feed XML → `ArticleRecord`s.
//!
//! Works on RSS 2.0, RSS 1.0 and Atom documents. Parsing is streaming
//! (`quick_xml::Reader`); fields are taken from the first matching descendant
//! of each `item`/`entry`, the same way a DOM `querySelector` would.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rand::Rng;
use regex::Regex;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::ingest::image::resolve_image;
use crate::ingest::types::{ArticleRecord, Sentiment};
use crate::ingest::{normalize_text, truncate_excerpt};

pub const DEFAULT_MAX_ITEMS: usize = 10;
pub const DEFAULT_EXCERPT_MAX_CHARS: usize = 800;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

/// Fields pulled out of one `item`/`entry`, still XML-decoded but not normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    /// `description` (RSS) or `summary` (Atom).
    pub description: Option<String>,
    pub pub_date: Option<String>,
    /// `content:encoded` (RSS) or `content` (Atom).
    pub content_encoded: Option<String>,
    pub media_content: Option<String>,
    pub media_thumbnail: Option<String>,
    pub enclosure: Option<String>,
    pub atom: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextField {
    Title,
    Link,
    Description,
    PubDate,
    Content,
}

impl TextField {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::Title),
            b"link" => Some(Self::Link),
            b"description" | b"summary" => Some(Self::Description),
            b"pubDate" | b"published" | b"updated" | b"dc:date" => Some(Self::PubDate),
            b"content:encoded" | b"content" => Some(Self::Content),
            _ => None,
        }
    }

    fn slot<'a>(&self, item: &'a mut RawItem) -> &'a mut Option<String> {
        match self {
            Self::Title => &mut item.title,
            Self::Link => &mut item.link,
            Self::Description => &mut item.description,
            Self::PubDate => &mut item.pub_date,
            Self::Content => &mut item.content_encoded,
        }
    }
}

/// Text capture in progress: which field, the depth it opened at, and the text so far.
struct Capture {
    field: TextField,
    depth: usize,
    text: String,
}

/// Item being assembled; `depth` counts open elements below the item element.
struct OpenItem {
    item: RawItem,
    depth: usize,
    capture: Option<Capture>,
}

static RE_KNOWN_ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:amp|lt|gt|quot|apos|#[0-9]+|#[xX][0-9a-fA-F]+);").expect("entity regex")
});

/// Escape `&` that does not start an XML entity, leaving CDATA sections untouched.
///
/// Feeds routinely ship `&nbsp;` or bare `&` in text; turning those into `&amp;`
/// keeps the document well-formed and the normalizer decodes them later.
pub fn repair_bare_ampersands(xml: &str) -> String {
    const CDATA_OPEN: &str = "<![CDATA[";
    const CDATA_CLOSE: &str = "]]>";

    let mut out = String::with_capacity(xml.len() + 16);
    let mut rest = xml;
    while !rest.is_empty() {
        let next_amp = rest.find('&');
        let next_cdata = rest.find(CDATA_OPEN);
        match (next_amp, next_cdata) {
            (Some(a), Some(c)) if c < a => {
                let end = rest[c..]
                    .find(CDATA_CLOSE)
                    .map(|e| c + e + CDATA_CLOSE.len())
                    .unwrap_or(rest.len());
                out.push_str(&rest[..end]);
                rest = &rest[end..];
            }
            (Some(a), _) => {
                out.push_str(&rest[..a]);
                if RE_KNOWN_ENTITY.is_match(&rest[a + 1..]) {
                    out.push('&');
                } else {
                    out.push_str("&amp;");
                }
                rest = &rest[a + 1..];
            }
            (None, _) => {
                out.push_str(rest);
                rest = "";
            }
        }
    }
    out
}

fn attr_value(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.try_get_attribute(key)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.trim().to_string()))
        .filter(|v| !v.is_empty())
}

fn set_once(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value;
    }
}

/// Pick up attribute-borne fields from a start or empty element inside an item.
fn absorb_attributes(item: &mut RawItem, e: &BytesStart<'_>) {
    match e.name().as_ref() {
        b"media:content" => set_once(&mut item.media_content, attr_value(e, "url")),
        b"media:thumbnail" => set_once(&mut item.media_thumbnail, attr_value(e, "url")),
        b"enclosure" => set_once(&mut item.enclosure, attr_value(e, "url")),
        b"link" => {
            let rel = attr_value(e, "rel");
            if matches!(rel.as_deref(), None | Some("alternate")) {
                set_once(&mut item.link, attr_value(e, "href"));
            }
        }
        _ => {}
    }
}

fn is_item_element(e: &BytesStart<'_>) -> Option<bool> {
    match e.local_name().as_ref() {
        b"item" => Some(false),
        b"entry" => Some(true),
        _ => None,
    }
}

/// Walk the document and collect up to `cap` items.
///
/// Errors when the XML is structurally broken (mismatched tags, bad escapes,
/// elements still open at end of input). The whole document is read even after
/// the cap is reached, so breakage late in the file, including a body cut off
/// mid-transfer, still counts as a parse failure.
pub fn extract_items(xml: &str, cap: usize) -> Result<Vec<RawItem>> {
    let mut reader = Reader::from_str(xml);
    let mut items = Vec::new();
    let mut open: Option<OpenItem> = None;
    // Elements currently open anywhere in the document.
    let mut doc_depth = 0usize;

    loop {
        let event = reader
            .read_event()
            .with_context(|| format!("xml error at byte {}", reader.buffer_position()))?;
        match event {
            Event::Start(e) => {
                doc_depth += 1;
                match open.as_mut() {
                    None => {
                        if let Some(atom) = is_item_element(&e) {
                            open = Some(OpenItem {
                                item: RawItem {
                                    atom,
                                    ..RawItem::default()
                                },
                                depth: 0,
                                capture: None,
                            });
                        }
                    }
                    Some(cur) => {
                        cur.depth += 1;
                        absorb_attributes(&mut cur.item, &e);
                        if cur.capture.is_none() {
                            if let Some(field) = TextField::from_name(e.name().as_ref()) {
                                if field.slot(&mut cur.item).is_none() {
                                    cur.capture = Some(Capture {
                                        field,
                                        depth: cur.depth,
                                        text: String::new(),
                                    });
                                }
                            }
                        }
                    }
                }
            }
            Event::Empty(e) => {
                if let Some(cur) = open.as_mut() {
                    absorb_attributes(&mut cur.item, &e);
                }
            }
            Event::Text(t) => {
                if let Some(cap) = open.as_mut().and_then(|c| c.capture.as_mut()) {
                    let text = t.unescape().context("unescaping text node")?;
                    cap.text.push_str(&text);
                }
            }
            Event::CData(cdata) => {
                if let Some(cap) = open.as_mut().and_then(|c| c.capture.as_mut()) {
                    cap.text.push_str(&String::from_utf8_lossy(&cdata.into_inner()));
                }
            }
            Event::End(_) => {
                doc_depth = doc_depth.saturating_sub(1);
                if let Some(mut cur) = open.take() {
                    if cur.depth == 0 {
                        if items.len() < cap {
                            items.push(cur.item);
                        }
                        continue;
                    }
                    if cur.capture.as_ref().is_some_and(|c| c.depth == cur.depth) {
                        if let Some(done) = cur.capture.take() {
                            let value = done.text.trim().to_string();
                            if !value.is_empty() {
                                *done.field.slot(&mut cur.item) = Some(value);
                            }
                        }
                    }
                    cur.depth -= 1;
                    open = Some(cur);
                }
            }
            Event::Eof => {
                if doc_depth != 0 || open.is_some() {
                    bail!("unexpected end of document, {doc_depth} element(s) still open");
                }
                break;
            }
            _ => {}
        }
    }

    Ok(items)
}

fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let unix = OffsetDateTime::parse(raw, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(raw, &Rfc3339))
        .ok()
        .map(|dt| dt.unix_timestamp());
    match unix {
        Some(secs) => DateTime::from_timestamp(secs, 0),
        // chrono is more forgiving about obsolete zone names ("EST", "UT").
        None => DateTime::parse_from_rfc2822(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
    }
}

fn random_suffix<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Per-feed parser settings.
#[derive(Debug, Clone)]
pub struct FeedParser<'a> {
    source: &'a str,
    fallback_images: &'a [String],
    max_items: usize,
    excerpt_max_chars: usize,
    ingested_at: DateTime<Utc>,
}

impl<'a> FeedParser<'a> {
    pub fn new(source: &'a str, fallback_images: &'a [String], ingested_at: DateTime<Utc>) -> Self {
        Self {
            source,
            fallback_images,
            max_items: DEFAULT_MAX_ITEMS,
            excerpt_max_chars: DEFAULT_EXCERPT_MAX_CHARS,
            ingested_at,
        }
    }

    pub fn max_items(mut self, n: usize) -> Self {
        self.max_items = n;
        self
    }

    pub fn excerpt_max_chars(mut self, n: usize) -> Self {
        self.excerpt_max_chars = n;
        self
    }

    /// Parse `xml`; any structural failure yields an empty list.
    pub fn parse<R: Rng + ?Sized>(&self, xml: &str, rng: &mut R) -> Vec<ArticleRecord> {
        let t0 = std::time::Instant::now();
        let repaired = repair_bare_ampersands(xml.trim());
        let raw_items = match extract_items(&repaired, self.max_items) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = ?e, source = self.source, "feed xml rejected");
                return Vec::new();
            }
        };

        let stamp = self.ingested_at.timestamp_millis();
        let mut out = Vec::with_capacity(raw_items.len());
        for (index, raw) in raw_items.iter().enumerate() {
            if let Some(article) = self.build_record(index, raw, stamp, rng) {
                out.push(article);
            } else {
                tracing::debug!(source = self.source, index, "skipping incomplete feed item");
            }
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("goodish_parse_ms").record(ms);
        counter!("goodish_articles_parsed_total").increment(out.len() as u64);
        out
    }

    fn build_record<R: Rng + ?Sized>(
        &self,
        index: usize,
        raw: &RawItem,
        stamp: i64,
        rng: &mut R,
    ) -> Option<ArticleRecord> {
        let title = raw.title.as_deref()?;
        let link = raw.link.as_deref()?;
        let description = match (&raw.description, raw.atom) {
            (Some(d), _) => d.as_str(),
            (None, true) => raw.content_encoded.as_deref()?,
            (None, false) => return None,
        };

        let title = normalize_text(title);
        let body = normalize_text(description);
        if title.is_empty() || body.is_empty() {
            return None;
        }
        let excerpt = truncate_excerpt(&body, description.chars().count(), self.excerpt_max_chars);
        let image = resolve_image(raw, self.fallback_images, index);

        Some(ArticleRecord {
            id: format!(
                "rss-{}-{}-{}-{}",
                self.source,
                index,
                stamp,
                random_suffix(rng)
            ),
            title,
            excerpt,
            content: None,
            url: link.to_string(),
            source: self.source.to_string(),
            published_date: raw
                .pub_date
                .as_deref()
                .and_then(parse_feed_date)
                .unwrap_or(self.ingested_at),
            image_url: Some(image).filter(|s| !s.is_empty()),
            sentiment: Sentiment::Positive,
            tags: vec!["news".to_string(), "positive".to_string()],
        })
    }
}

/// Parse with default limits, the default fallback image pool, the current
/// time and thread-local randomness.
pub fn parse_feed(xml: &str, source: &str) -> Vec<ArticleRecord> {
    let pool = crate::ingest::config::default_fallback_images();
    FeedParser::new(source, &pool, Utc::now()).parse(xml, &mut rand::rng())
}

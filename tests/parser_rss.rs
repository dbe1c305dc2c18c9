// tests/parser_rss.rs
//
// Feed parsing against a realistic RSS 2.0 fixture: media extensions, CDATA,
// entity-escaped HTML, bare ampersands, incomplete items and more items than
// the per-feed cap.

use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

use goodish_news::ingest::parser::FeedParser;
use goodish_news::{parse_feed, ArticleRecord, Sentiment};

const UPBEAT: &str = include_str!("fixtures/upbeat_rss.xml");
const BROKEN: &str = include_str!("fixtures/broken_rss.xml");
const TRUNCATED: &str = include_str!("fixtures/truncated_rss.xml");

fn pool() -> Vec<String> {
    ["https://fb.test/0.jpg", "https://fb.test/1.jpg", "https://fb.test/2.jpg", "https://fb.test/3.jpg"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn ingested_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn parse_upbeat() -> Vec<ArticleRecord> {
    let pool = pool();
    let mut rng = StdRng::seed_from_u64(42);
    FeedParser::new("Upbeat Wire", &pool, ingested_at()).parse(UPBEAT, &mut rng)
}

fn by_url<'a>(arts: &'a [ArticleRecord], url: &str) -> &'a ArticleRecord {
    arts.iter()
        .find(|a| a.url == url)
        .unwrap_or_else(|| panic!("no article for {url}"))
}

#[test]
fn good_news_item_is_decoded_and_stripped() {
    let xml = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>T</title>
  <item>
    <title>Good News</title>
    <link>http://x/1</link>
    <description>&lt;p&gt;Great &amp;amp; Sunny&lt;/p&gt;</description>
  </item>
</channel></rss>"#;
    let arts = parse_feed(xml, "Test Source");
    assert_eq!(arts.len(), 1);
    let a = &arts[0];
    assert_eq!(a.title, "Good News");
    assert_eq!(a.excerpt, "Great & Sunny");
    assert_eq!(a.url, "http://x/1");
    assert_eq!(a.source, "Test Source");
    assert_eq!(a.sentiment, Sentiment::Positive);
    assert_eq!(a.tags, vec!["news".to_string(), "positive".to_string()]);
    assert!(a.content.is_none());
    assert!(a.id.starts_with("rss-Test Source-0-"), "id = {}", a.id);
    assert!(a.image_url.as_deref().is_some_and(|u| !u.is_empty()));
}

#[test]
fn cap_and_incomplete_items() {
    let arts = parse_upbeat();
    // Ten items are located, two of them lack description/title.
    assert_eq!(arts.len(), 8);
    assert!(arts.iter().all(|a| !a.url.contains("/cap")));
    assert!(arts.iter().all(|a| a.url != "https://upbeat.test/no-body"));
    assert!(arts.iter().all(|a| a.url != "https://upbeat.test/untitled"));
}

#[test]
fn skipped_items_do_not_shift_positions() {
    let arts = parse_upbeat();
    let stamp = ingested_at().timestamp_millis();
    let expected = [
        (0, "https://upbeat.test/trees"),
        (2, "https://upbeat.test/thumb"),
        (3, "https://upbeat.test/enclosure"),
        (4, "https://upbeat.test/shelter"),
        (5, "https://upbeat.test/library"),
        (6, "https://upbeat.test/plain"),
        (8, "https://upbeat.test/long"),
    ];
    for (index, url) in expected {
        let a = by_url(&arts, url);
        let prefix = format!("rss-Upbeat Wire-{index}-{stamp}-");
        assert!(a.id.starts_with(&prefix), "{} should start with {prefix}", a.id);
        let suffix = &a.id[prefix.len()..];
        assert_eq!(suffix.len(), 9);
        assert!(suffix.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_lowercase()));
    }

    let mut ids: Vec<&str> = arts.iter().map(|a| a.id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), arts.len());
}

#[test]
fn text_fields_are_normalized() {
    let arts = parse_upbeat();

    let trees = by_url(&arts, "https://upbeat.test/trees");
    assert_eq!(trees.title, "Kids Plant 10,000 Trees & Count Them");
    assert_eq!(trees.excerpt, "Volunteers planted trees today.");

    let shelter = by_url(&arts, "https://upbeat.test/shelter");
    assert_eq!(shelter.excerpt, "Rescued puppies & kittens");

    // Bare `&` and HTML-only entities survive the XML layer.
    let fish = by_url(&arts, "https://upbeat.test/fish?a=1&b=2");
    assert_eq!(fish.title, "Fish & Chips Shop Feeds Town");
    assert_eq!(fish.excerpt, "Free meals for all 'til Sunday");
}

#[test]
fn long_description_is_truncated_with_marker() {
    let arts = parse_upbeat();
    let long = by_url(&arts, "https://upbeat.test/long");
    assert_eq!(long.excerpt.chars().count(), 803);
    assert!(long.excerpt.ends_with("..."));
    assert!(long.excerpt.starts_with("Sunny days ahead"));

    let pool = pool();
    let mut rng = StdRng::seed_from_u64(1);
    let short = FeedParser::new("Upbeat Wire", &pool, ingested_at())
        .excerpt_max_chars(20)
        .parse(UPBEAT, &mut rng);
    let trees = by_url(&short, "https://upbeat.test/trees");
    assert_eq!(trees.excerpt, "Volunteers planted t...");
}

#[test]
fn image_priority_follows_media_then_markup_then_pool() {
    let arts = parse_upbeat();
    let img = |url: &str| by_url(&arts, url).image_url.clone().unwrap_or_default();

    assert_eq!(img("https://upbeat.test/trees"), "https://img.test/media0.jpg");
    assert_eq!(img("https://upbeat.test/thumb"), "https://img.test/thumb2.png");
    assert_eq!(
        img("https://upbeat.test/enclosure"),
        "https://img.test/enc3.webp?size=large"
    );
    assert_eq!(img("https://upbeat.test/shelter"), "https://img.test/desc4.gif");
    assert_eq!(img("https://upbeat.test/library"), "https://img.test/enc5.png");
    // Item 6 with a pool of four.
    assert_eq!(img("https://upbeat.test/plain"), "https://fb.test/2.jpg");
}

#[test]
fn dates_parse_or_fall_back_to_ingestion() {
    let arts = parse_upbeat();
    assert_eq!(
        by_url(&arts, "https://upbeat.test/trees").published_date,
        Utc.with_ymd_and_hms(2003, 6, 10, 4, 0, 0).unwrap()
    );
    assert_eq!(
        by_url(&arts, "https://upbeat.test/enclosure").published_date,
        ingested_at()
    );
    assert_eq!(
        by_url(&arts, "https://upbeat.test/plain").published_date,
        ingested_at()
    );
}

#[test]
fn max_items_counts_skipped_items() {
    let pool = pool();
    let mut rng = StdRng::seed_from_u64(5);
    let arts = FeedParser::new("Upbeat Wire", &pool, ingested_at())
        .max_items(3)
        .parse(UPBEAT, &mut rng);
    let urls: Vec<&str> = arts.iter().map(|a| a.url.as_str()).collect();
    assert_eq!(urls, vec!["https://upbeat.test/trees", "https://upbeat.test/thumb"]);
}

#[test]
fn malformed_or_empty_input_yields_nothing() {
    assert!(parse_feed(BROKEN, "Broken").is_empty());
    assert!(parse_feed("", "Empty").is_empty());
    assert!(parse_feed("<html><body>Access denied</body></html>", "Html").is_empty());
    assert!(parse_feed("<rss><channel></channel></rss>", "NoItems").is_empty());
}

#[test]
fn cut_off_body_yields_nothing() {
    // Items before the cut are complete, the document is not.
    assert!(parse_feed(TRUNCATED, "Upbeat Wire").is_empty());

    let partial = "<rss><channel><item><title>A</title><link>http://x/1</link>\
                   <description>ok</description></item><item><title>B";
    assert!(parse_feed(partial, "S").is_empty());
}

#[test]
fn same_seed_same_ids() {
    let a = parse_upbeat();
    let b = parse_upbeat();
    assert_eq!(a, b);
}

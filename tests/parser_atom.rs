// tests/parser_atom.rs
use chrono::{TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

use goodish_news::ingest::parser::{extract_items, FeedParser};

const CHEER: &str = include_str!("fixtures/cheer_atom.xml");

#[test]
fn atom_entries_are_located() {
    let items = extract_items(CHEER, 10).expect("atom fixture parses");
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|i| i.atom));
    // rel="self" is ignored in favour of the plain/alternate link.
    assert_eq!(items[1].link.as_deref(), Some("https://cheer.test/energy"));
    assert!(items[2].link.is_none());
}

#[test]
fn atom_entries_become_articles() {
    let pool = vec!["https://fb.test/a.jpg".to_string()];
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let mut rng = StdRng::seed_from_u64(9);
    let arts = FeedParser::new("Cheerful Atom", &pool, now).parse(CHEER, &mut rng);
    assert_eq!(arts.len(), 2, "entry without a link is dropped");

    let bridge = &arts[0];
    assert_eq!(bridge.title, "Bridge Built By Volunteers");
    assert_eq!(bridge.url, "https://cheer.test/bridge");
    assert_eq!(bridge.excerpt, "Neighbours finished the footbridge in a weekend.");
    assert_eq!(
        bridge.published_date,
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
    );
    assert_eq!(bridge.image_url.as_deref(), Some("https://fb.test/a.jpg"));

    // No summary: the HTML content stands in for the description.
    let energy = &arts[1];
    assert_eq!(energy.title, "Solar & Wind Records");
    assert_eq!(energy.url, "https://cheer.test/energy");
    assert_eq!(energy.excerpt, "Clean power hit a record.");
    assert_eq!(energy.image_url.as_deref(), Some("https://img.test/solar.jpg"));
    assert_eq!(
        energy.published_date,
        Utc.with_ymd_and_hms(2024, 4, 30, 6, 0, 0).unwrap()
    );
    assert!(energy.id.starts_with("rss-Cheerful Atom-1-"));
}

// src/ingest/image.rs
//! Pick a representative image for a feed item.
//!
//! Explicit media attributes win over anything scraped from markup; when the
//! item carries nothing usable, a fallback is chosen by position so the same
//! feed always renders the same placeholders.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ingest::parser::RawItem;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

// Tried in order against description / encoded content.
static IMG_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"(?i)<img[^>]+src=["']([^"'>]+)["']"#,
        r#"(?i)<img[^>]+src=([^\s>]+)"#,
        r#"(?i)src=["']([^"'>]+\.(?:jpg|jpeg|png|gif|webp))["']"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("image pattern"))
    .collect()
});

/// Resolve an image URL for `item`; see module docs for the priority order.
/// Returns an empty string only when nothing matched and `fallback_pool` is empty.
pub fn resolve_image(item: &RawItem, fallback_pool: &[String], position: usize) -> String {
    explicit_image(item)
        .or_else(|| item.description.as_deref().and_then(first_img_src))
        .or_else(|| item.content_encoded.as_deref().and_then(first_img_src))
        .or_else(|| fallback_image(fallback_pool, position))
        .unwrap_or_default()
}

fn explicit_image(item: &RawItem) -> Option<String> {
    non_empty(item.media_content.as_deref())
        .or_else(|| non_empty(item.media_thumbnail.as_deref()))
        .or_else(|| non_empty(item.enclosure.as_deref()).filter(|u| is_raster_image_url(u)))
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// First `<img src>` found in an HTML fragment.
pub fn first_img_src(html: &str) -> Option<String> {
    IMG_PATTERNS.iter().find_map(|re| {
        re.captures(html)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// True when the URL path (query and fragment ignored) ends in a raster extension.
pub fn is_raster_image_url(raw: &str) -> bool {
    let path = match url::Url::parse(raw) {
        Ok(u) => u.path().to_string(),
        // Relative or odd URLs: drop query/fragment by hand.
        Err(_) => raw.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    path.rsplit_once('.')
        .map(|(_, ext)| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

fn fallback_image(pool: &[String], position: usize) -> Option<String> {
    if pool.is_empty() {
        return None;
    }
    Some(pool[position % pool.len()].clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Vec<String> {
        vec!["fb0".into(), "fb1".into(), "fb2".into()]
    }

    #[test]
    fn media_content_beats_everything() {
        let item = RawItem {
            media_content: Some("http://m/c.jpg".into()),
            media_thumbnail: Some("http://m/t.jpg".into()),
            enclosure: Some("http://m/e.png".into()),
            description: Some(r#"<img src="http://d/x.jpg">"#.into()),
            ..RawItem::default()
        };
        assert_eq!(resolve_image(&item, &pool(), 0), "http://m/c.jpg");
    }

    #[test]
    fn enclosure_must_look_like_an_image() {
        let audio = RawItem {
            enclosure: Some("http://pod/ep1.mp3".into()),
            ..RawItem::default()
        };
        assert_eq!(resolve_image(&audio, &pool(), 4), "fb1");

        let img = RawItem {
            enclosure: Some("http://cdn/pic.JPEG?w=800".into()),
            ..RawItem::default()
        };
        assert_eq!(resolve_image(&img, &pool(), 4), "http://cdn/pic.JPEG?w=800");
    }

    #[test]
    fn description_then_encoded_content() {
        let item = RawItem {
            description: Some("no pictures here".into()),
            content_encoded: Some(r#"<p><img class="a" src='http://c/1.webp' /></p>"#.into()),
            ..RawItem::default()
        };
        assert_eq!(resolve_image(&item, &pool(), 0), "http://c/1.webp");

        let unquoted = RawItem {
            description: Some("<img src=http://d/2.gif>".into()),
            ..RawItem::default()
        };
        assert_eq!(resolve_image(&unquoted, &pool(), 0), "http://d/2.gif");
    }

    #[test]
    fn fallback_is_positional_and_empty_pool_yields_empty() {
        let item = RawItem::default();
        assert_eq!(resolve_image(&item, &pool(), 2), "fb2");
        assert_eq!(resolve_image(&item, &pool(), 3), "fb0");
        assert_eq!(resolve_image(&item, &[], 3), "");
    }
}

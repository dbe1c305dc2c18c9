// src/ingest/samples.rs
//! Built-in articles served when no feed yields anything.

use chrono::{DateTime, Duration, Utc};

use crate::ingest::types::{ArticleRecord, Sentiment};

struct Sample {
    id: &'static str,
    title: &'static str,
    excerpt: &'static str,
    url: &'static str,
    source: &'static str,
    image: &'static str,
    tags: &'static [&'static str],
}

const SAMPLES: [Sample; 5] = [
    Sample {
        id: "sample-1",
        title: "Scientists Develop Revolutionary Ocean Cleanup Technology",
        excerpt: "Researchers have created an innovative system that can remove plastic waste from oceans while protecting marine life. The breakthrough technology uses biodegradable materials and has shown promising results in initial trials, potentially removing millions of tons of plastic annually.",
        url: "https://example.com/ocean-cleanup",
        source: "Environmental Science Daily",
        image: "https://images.unsplash.com/photo-1583212292454-1fe6229603b7?w=800",
        tags: &["environment", "technology", "ocean"],
    },
    Sample {
        id: "sample-2",
        title: "Community Gardens Transform Urban Neighborhoods",
        excerpt: "A grassroots initiative has transformed vacant lots into thriving gardens, providing fresh produce to food-insecure neighborhoods while building stronger communities and teaching valuable agricultural skills to residents of all ages.",
        url: "https://example.com/community-gardens",
        source: "Local News Network",
        image: "https://images.unsplash.com/photo-1416879595882-3373a0480b5b?w=800",
        tags: &["community", "agriculture", "urban development"],
    },
    Sample {
        id: "sample-3",
        title: "Breakthrough Battery Technology Revolutionizes Renewable Energy",
        excerpt: "Engineers have developed a new battery technology that can store renewable energy for weeks, solving one of the biggest challenges in sustainable power generation and bringing us significantly closer to a carbon-neutral future.",
        url: "https://example.com/battery-breakthrough",
        source: "Tech Innovation Today",
        image: "https://images.unsplash.com/photo-1509391366360-2e959784a276?w=800",
        tags: &["technology", "renewable energy", "innovation"],
    },
    Sample {
        id: "sample-4",
        title: "Reading Program Transforms Students' Lives",
        excerpt: "An innovative reading program that pairs students with community volunteers has dramatically improved literacy rates by 40%, with participating students showing increased confidence, academic performance, and genuine love for learning.",
        url: "https://example.com/reading-program",
        source: "Education Weekly",
        image: "https://images.unsplash.com/photo-1481627834876-b7833e8f5570?w=800",
        tags: &["education", "literacy", "community"],
    },
    Sample {
        id: "sample-5",
        title: "Wildlife Conservation Success Story: Species Population Triples",
        excerpt: "Thanks to dedicated conservation efforts and community involvement, the population of a critically endangered species has increased by 300% over the past five years, demonstrating that targeted conservation efforts can create meaningful change.",
        url: "https://example.com/wildlife-conservation",
        source: "Nature Conservation News",
        image: "https://images.unsplash.com/photo-1549366021-9f761d040a94?w=800",
        tags: &["wildlife", "conservation", "success story"],
    },
];

/// The first `count` sample articles, dated one day apart going back from `now`.
pub fn sample_articles(now: DateTime<Utc>, count: usize) -> Vec<ArticleRecord> {
    SAMPLES
        .iter()
        .take(count)
        .enumerate()
        .map(|(i, s)| ArticleRecord {
            id: s.id.to_string(),
            title: s.title.to_string(),
            excerpt: s.excerpt.to_string(),
            content: None,
            url: s.url.to_string(),
            source: s.source.to_string(),
            published_date: now - Duration::days(i as i64 + 1),
            image_url: Some(s.image.to_string()),
            sentiment: Sentiment::Positive,
            tags: s.tags.iter().map(|t| t.to_string()).collect(),
        })
        .collect()
}

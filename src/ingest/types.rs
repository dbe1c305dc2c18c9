// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentiment label carried on every article. The feed pipeline only ever
/// emits `Positive`; the other variants exist for the wire contract.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    #[default]
    Positive,
    Neutral,
    Negative,
}

/// One ingested story, in the shape the display layer consumes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    pub id: String,
    pub title: String,
    pub excerpt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub url: String,
    pub source: String, // human-readable feed name
    pub published_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub sentiment: Sentiment,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Response envelope shared by the service boundary and the HTTP shim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiResponse<T> {
    pub data: T,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data,
            success: true,
            error: None,
        }
    }
}

impl<T: Default> ApiResponse<T> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            data: T::default(),
            success: false,
            error: Some(message.into()),
        }
    }
}

/// What `ArticleService::get_batch` hands back.
pub type FetchResult = ApiResponse<Vec<ArticleRecord>>;

/// Catalog entry for a syndication source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedSource {
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
}

impl FeedSource {
    pub fn new(url: &str, name: &str, category: &str) -> Self {
        Self {
            url: url.to_string(),
            name: name.to_string(),
            category: category.to_string(),
        }
    }
}

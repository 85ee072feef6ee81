//! Normalized internal types shared by every ingestion source.

use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    News,
    Social,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::News => f.write_str("News"),
            ItemKind::Social => f.write_str("Social"),
        }
    }
}

/// One unenriched unit of ingested text. Immutable once emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    pub kind: ItemKind,
    pub source_name: String,
    pub title: String,
    pub text: String,
    pub url: String,
    pub timestamp: String,
}

/// An entry as returned by a feed endpoint; absent fields are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub link: Option<String>,
    pub published: Option<String>,
}

/// One post emitted by the external scraping process (a single JSON line).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SocialPost {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl SocialPost {
    pub fn into_raw_item(self, platform: &str) -> RawItem {
        RawItem {
            kind: ItemKind::Social,
            source_name: platform.to_string(),
            title: self
                .username
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            text: self.text.unwrap_or_default(),
            url: self.url.unwrap_or_default(),
            timestamp: self.timestamp.unwrap_or_default(),
        }
    }
}

//! Feed retrieval over HTTP for RSS 2.0, RSS 1.0 (RDF) and Atom documents.

use super::types::FeedEntry;
use super::FeedSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) signal-monitor/0.1";

// ── RSS 2.0 ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Rss {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "dc:date")]
    dc_date: Option<String>,
}

// ── RSS 1.0: items are siblings of the channel ───────────────────────

#[derive(Debug, Deserialize)]
struct Rdf {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

// ── Atom ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href", default)]
    href: String,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

// ── Parsing ───────────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
enum FeedFormat {
    Rss,
    Rdf,
    Atom,
}

fn detect_format(xml: &str) -> FeedFormat {
    let candidates = [
        (xml.find("<rss"), FeedFormat::Rss),
        (xml.find("<rdf:RDF"), FeedFormat::Rdf),
        (xml.find("<feed"), FeedFormat::Atom),
    ];
    candidates
        .into_iter()
        .filter_map(|(pos, fmt)| pos.map(|p| (p, fmt)))
        .min_by_key(|(p, _)| *p)
        .map(|(_, fmt)| fmt)
        .unwrap_or(FeedFormat::Rss)
}

/// Decode entities, drop markup and collapse whitespace.
pub fn clean_text(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    let mut out = String::with_capacity(decoded.len());
    let mut in_tag = false;
    for ch in decoded.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| clean_text(&v)).filter(|v| !v.is_empty())
}

fn rss_entry(item: RssItem) -> FeedEntry {
    FeedEntry {
        title: non_empty(item.title),
        summary: non_empty(item.description),
        link: item
            .link
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty()),
        published: non_empty(item.pub_date.or(item.dc_date)),
    }
}

fn atom_entry(entry: AtomEntry) -> FeedEntry {
    let link = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate"))
        .or_else(|| entry.links.first())
        .map(|l| l.href.trim().to_string())
        .filter(|l| !l.is_empty());
    FeedEntry {
        title: non_empty(entry.title.map(|t| t.value)),
        summary: non_empty(entry.summary.or(entry.content).map(|t| t.value)),
        link,
        published: non_empty(entry.published.or(entry.updated)),
    }
}

/// Parse a feed document into entries, in document order.
/// Public for unit testing with fixtures.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let entries = match detect_format(xml) {
        FeedFormat::Rss => {
            let rss: Rss = quick_xml::de::from_str(xml).context("failed to parse RSS feed")?;
            rss.channel.items.into_iter().map(rss_entry).collect()
        }
        FeedFormat::Rdf => {
            let rdf: Rdf = quick_xml::de::from_str(xml).context("failed to parse RDF feed")?;
            rdf.items.into_iter().map(rss_entry).collect()
        }
        FeedFormat::Atom => {
            let feed: AtomFeed =
                quick_xml::de::from_str(xml).context("failed to parse Atom feed")?;
            feed.entries.into_iter().map(atom_entry).collect()
        }
    };
    Ok(entries)
}

// ── FeedSource implementation ────────────────────────────────────────

pub struct RssFeedSource {
    client: Client,
}

impl RssFeedSource {
    pub fn new(timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    async fn fetch(&self, endpoint: &str) -> Result<Vec<FeedEntry>> {
        let resp = self
            .client
            .get(endpoint)
            .send()
            .await
            .with_context(|| format!("request to {} failed", endpoint))?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("{} returned {}", endpoint, status);
        }

        let body = resp
            .text()
            .await
            .with_context(|| format!("failed to read body from {}", endpoint))?;
        parse_feed(&body)
    }
}

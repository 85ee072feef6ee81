use super::types::{FeedEntry, ItemKind, RawItem};
use super::{FeedSource, IngestionSource};
use crate::config::NewsSourceConfig;
use crate::lifecycle::Lifecycle;
use crate::logs::LogSink;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Polls a fixed list of feed endpoints, emitting each link at most once per instance.
pub struct NewsProducer {
    sources: Vec<NewsSourceConfig>,
    feed: Arc<dyn FeedSource>,
    interval: Duration,
    raw_tx: mpsc::Sender<RawItem>,
    log: LogSink,
    seen_links: Mutex<HashSet<String>>,
    lifecycle: Lifecycle,
}

/// Apply the defaults for fields the feed left out.
fn normalize_entry(source_name: &str, entry: FeedEntry, link: String) -> RawItem {
    RawItem {
        kind: ItemKind::News,
        source_name: source_name.to_string(),
        title: entry.title.unwrap_or_else(|| "No Title".to_string()),
        text: entry.summary.unwrap_or_default(),
        url: link,
        timestamp: entry
            .published
            .unwrap_or_else(|| chrono::Local::now().to_rfc3339()),
    }
}

impl NewsProducer {
    pub fn new(
        sources: Vec<NewsSourceConfig>,
        feed: Arc<dyn FeedSource>,
        interval: Duration,
        raw_tx: mpsc::Sender<RawItem>,
        log: LogSink,
    ) -> Self {
        Self {
            sources,
            feed,
            interval,
            raw_tx,
            log,
            seen_links: Mutex::new(HashSet::new()),
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Insert `link` into the dedup set. Returns true the first time a link is seen.
    fn mark_seen(&self, link: &str) -> bool {
        match self.seen_links.lock() {
            Ok(mut seen) => seen.insert(link.to_string()),
            Err(poisoned) => poisoned.into_inner().insert(link.to_string()),
        }
    }

    /// One pass over every configured endpoint. Returns the number of items emitted.
    pub async fn fetch_cycle(&self) -> usize {
        self.log.info("Starting news fetch cycle...");
        let mut emitted = 0;

        for source in &self.sources {
            if self.lifecycle.is_stop_requested() {
                break;
            }
            self.log.debug(format!("Fetching {}...", source.name));

            let entries = match self.feed.fetch(&source.url).await {
                Ok(entries) => entries,
                Err(e) => {
                    self.log
                        .error(format!("Failed to fetch {}: {:#}", source.name, e));
                    continue;
                }
            };

            for mut entry in entries {
                let Some(link) = entry.link.take().filter(|l| !l.is_empty()) else {
                    continue;
                };
                if !self.mark_seen(&link) {
                    continue;
                }
                let item = normalize_entry(&source.name, entry, link);
                let headline = format!("[{}] {}", source.name, item.title);
                if self.raw_tx.send(item).await.is_err() {
                    self.log.debug("raw item channel closed, ending cycle");
                    return emitted;
                }
                self.log.news(headline);
                emitted += 1;
            }
        }

        emitted
    }
}

#[async_trait]
impl IngestionSource for NewsProducer {
    fn name(&self) -> &str {
        "NewsFetcher"
    }

    async fn run(&self) {
        if !self.lifecycle.begin() {
            self.lifecycle.finish();
            return;
        }
        self.log.info("NewsFetcher started.");

        loop {
            self.fetch_cycle().await;
            if self.lifecycle.sleep(self.interval).await {
                break;
            }
        }

        self.log.info("NewsFetcher stopped.");
        self.lifecycle.finish();
    }

    async fn stop(&self) {
        self.lifecycle.request_stop();
    }
}

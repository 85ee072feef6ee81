pub mod news;
pub mod rss;
pub mod scraper;
pub mod social;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use social::SocialBuffer;
use types::FeedEntry;

use crate::logs::LogSink;

/// Retrieves the current entries of one feed endpoint.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, endpoint: &str) -> Result<Vec<FeedEntry>>;
}

/// A long-running scraping worker that appends posts to a shared buffer.
#[async_trait]
pub trait SocialScraper: Send + Sync {
    /// Blocks until the scraper finishes on its own or `stop` is called.
    async fn run(&self, buffer: SocialBuffer, log: LogSink) -> Result<()>;
    /// Request a graceful halt. Idempotent.
    fn stop(&self);
}

/// A producer loop feeding raw items into the pipeline.
///
/// `run` never returns an error: failures are logged and the loop carries on.
#[async_trait]
pub trait IngestionSource: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self);
    async fn stop(&self);
}

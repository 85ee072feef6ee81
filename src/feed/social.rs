use super::types::{RawItem, SocialPost};
use super::{IngestionSource, SocialScraper};
use crate::lifecycle::Lifecycle;
use crate::logs::LogSink;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Append-only post buffer shared between the scraper (writer) and the producer (reader).
#[derive(Debug, Clone, Default)]
pub struct SocialBuffer {
    posts: Arc<Mutex<Vec<SocialPost>>>,
}

impl SocialBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SocialPost>> {
        self.posts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, post: SocialPost) {
        self.lock().push(post);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Posts at `[cursor, len)` plus the length they were read up to.
    pub fn read_from(&self, cursor: usize) -> (Vec<SocialPost>, usize) {
        let posts = self.lock();
        let end = posts.len();
        let start = cursor.min(end);
        (posts[start..end].to_vec(), end)
    }
}

/// Supervises a [`SocialScraper`] and forwards each newly appended post exactly once.
pub struct SocialProducer {
    scraper: Arc<dyn SocialScraper>,
    buffer: SocialBuffer,
    keyword: String,
    platform: String,
    poll_interval: Duration,
    shutdown_timeout: Duration,
    raw_tx: mpsc::Sender<RawItem>,
    log: LogSink,
    forwarded: AtomicUsize,
    scraper_task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    lifecycle: Lifecycle,
}

impl SocialProducer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scraper: Arc<dyn SocialScraper>,
        buffer: SocialBuffer,
        keyword: &str,
        platform: &str,
        poll_interval: Duration,
        shutdown_timeout: Duration,
        raw_tx: mpsc::Sender<RawItem>,
        log: LogSink,
    ) -> Self {
        Self {
            scraper,
            buffer,
            keyword: keyword.to_string(),
            platform: platform.to_string(),
            poll_interval,
            shutdown_timeout,
            raw_tx,
            log,
            forwarded: AtomicUsize::new(0),
            scraper_task: tokio::sync::Mutex::new(None),
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn forwarded(&self) -> usize {
        self.forwarded.load(Ordering::Acquire)
    }

    /// Forward posts appended since the last call. `None` once the raw channel is closed.
    pub async fn forward_pending(&self) -> Option<usize> {
        let cursor = self.forwarded.load(Ordering::Acquire);
        let (posts, end) = self.buffer.read_from(cursor);
        let count = posts.len();
        for post in posts {
            if self.raw_tx.send(post.into_raw_item(&self.platform)).await.is_err() {
                return None;
            }
        }
        self.forwarded.store(end, Ordering::Release);
        if count > 0 {
            self.log.debug(format!("Forwarded {} new {} posts", count, self.platform));
        }
        Some(count)
    }

    fn launch_scraper(&self) -> JoinHandle<()> {
        let scraper = self.scraper.clone();
        let buffer = self.buffer.clone();
        let log = self.log.for_origin("Scraper");
        tokio::spawn(async move {
            if let Err(e) = scraper.run(buffer, log.clone()).await {
                log.error(format!("Scraper failed: {:#}", e));
            }
        })
    }

    async fn scraper_finished(&self) -> bool {
        self.scraper_task
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| h.is_finished())
    }

    /// Halt the scraper and wait for it, bounded by the shutdown timeout.
    async fn shutdown_scraper(&self) {
        self.scraper.stop();
        let Some(mut handle) = self.scraper_task.lock().await.take() else {
            return;
        };
        match tokio::time::timeout(self.shutdown_timeout, &mut handle).await {
            Ok(_) => self.log.debug("Scraper worker joined."),
            Err(_) => {
                self.log.warn(format!(
                    "Scraper did not stop within {}s, abandoning it",
                    self.shutdown_timeout.as_secs_f32()
                ));
                handle.abort();
            }
        }
    }
}

#[async_trait]
impl IngestionSource for SocialProducer {
    fn name(&self) -> &str {
        "SocialMonitor"
    }

    async fn run(&self) {
        // Held across begin() and launch so a concurrent stop() always finds the handle.
        let mut task = self.scraper_task.lock().await;
        if !self.lifecycle.begin() {
            drop(task);
            self.lifecycle.finish();
            return;
        }
        self.log.info(format!(
            "Starting {} monitor for '{}'...",
            self.platform, self.keyword
        ));
        *task = Some(self.launch_scraper());
        drop(task);

        loop {
            let finished = self.scraper_finished().await;
            if self.forward_pending().await.is_none() {
                self.log.debug("raw item channel closed, stopping");
                break;
            }
            if finished {
                self.log.warn("Scraper worker finished.");
                break;
            }
            if self.lifecycle.sleep(self.poll_interval).await {
                break;
            }
        }

        self.lifecycle.finish();
    }

    async fn stop(&self) {
        self.lifecycle.request_stop();
        self.shutdown_scraper().await;
    }
}

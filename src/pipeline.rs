//! Wires the ingestion sources, the analyzer and the dashboard together and owns shutdown.

use crate::config::{Config, DashboardConfig};
use crate::engine::analyzer::{Analyzer, EnrichedItem};
use crate::engine::sentiment::LexiconScorer;
use crate::engine::worker::AnalysisWorker;
use crate::feed::news::NewsProducer;
use crate::feed::rss::RssFeedSource;
use crate::feed::scraper::CommandScraper;
use crate::feed::social::{SocialBuffer, SocialProducer};
use crate::feed::IngestionSource;
use crate::logs::{LogReceiver, LogSink};
use crate::tui;
use anyhow::Result;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// The dashboard's ends of the enriched-item and log channels.
pub struct DashboardFeed {
    pub items_rx: mpsc::Receiver<EnrichedItem>,
    pub logs_rx: LogReceiver,
}

pub struct Pipeline {
    sources: Vec<Arc<dyn IngestionSource>>,
    analyzer: Arc<AnalysisWorker>,
    log: LogSink,
    shutdown_grace: Duration,
    source_tasks: Vec<JoinHandle<()>>,
    analyzer_task: Option<JoinHandle<()>>,
}

impl Pipeline {
    pub fn new(
        sources: Vec<Arc<dyn IngestionSource>>,
        analyzer: Arc<AnalysisWorker>,
        log: LogSink,
        shutdown_grace: Duration,
    ) -> Self {
        Self {
            sources,
            analyzer,
            log,
            shutdown_grace,
            source_tasks: Vec::new(),
            analyzer_task: None,
        }
    }

    /// Build every component described by `config`, with the channels connecting them.
    pub fn from_config(config: &Config) -> Result<(Self, DashboardFeed)> {
        let capacity = config.pipeline.channel_capacity.max(1);
        let (raw_tx, raw_rx) = mpsc::channel(capacity);
        let (items_tx, items_rx) = mpsc::channel(capacity);
        let (log, logs_rx) = LogSink::channel("Orchestrator");

        let mut sources: Vec<Arc<dyn IngestionSource>> = Vec::new();

        let feed = Arc::new(RssFeedSource::new(config.news.request_timeout_ms)?);
        sources.push(Arc::new(NewsProducer::new(
            config.news.sources.clone(),
            feed,
            config.news.interval(),
            raw_tx.clone(),
            log.for_origin("NewsFetcher"),
        )));

        if config.social.enabled {
            let social = &config.social;
            let scraper = Arc::new(CommandScraper::new(
                &social.command,
                social.args.clone(),
                &social.keyword,
                social.max_items,
                social.scraper.clone(),
            ));
            sources.push(Arc::new(SocialProducer::new(
                scraper,
                SocialBuffer::new(),
                &social.keyword,
                &social.platform,
                social.poll_interval(),
                social.shutdown_timeout(),
                raw_tx.clone(),
                log.for_origin("SocialMonitor"),
            )));
        }
        drop(raw_tx);

        let analyzer = Analyzer::from_config(&config.analysis, Arc::new(LexiconScorer::new()));
        let worker = AnalysisWorker::new(
            Arc::new(analyzer),
            raw_rx,
            items_tx,
            log.for_origin("Analyzer"),
            Duration::from_millis(config.analysis.recv_timeout_ms.max(1)),
        );

        let pipeline = Self::new(
            sources,
            Arc::new(worker),
            log,
            Duration::from_secs(config.pipeline.shutdown_grace_s),
        );
        Ok((pipeline, DashboardFeed { items_rx, logs_rx }))
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Start the analyzer and one task per ingestion source.
    pub fn spawn_workers(&mut self) {
        let analyzer = self.analyzer.clone();
        self.analyzer_task = Some(tokio::spawn(async move { analyzer.run().await }));

        for source in &self.sources {
            let source = source.clone();
            self.source_tasks
                .push(tokio::spawn(async move { source.run().await }));
        }
        self.log.info(format!(
            "System initialized: {} sources running",
            self.sources.len()
        ));
    }

    /// Stop every ingestion source and wait, bounded by the grace period, for their loops to end.
    /// Returns false when the grace period ran out first.
    pub async fn shutdown(&mut self) -> bool {
        self.log.info("Shutting down...");
        join_all(self.sources.iter().map(|s| s.stop())).await;

        let tasks = std::mem::take(&mut self.source_tasks);
        match tokio::time::timeout(self.shutdown_grace, join_all(tasks)).await {
            Ok(results) => {
                for r in results {
                    if let Err(e) = r {
                        tracing::warn!(error = %e, "ingestion task ended abnormally");
                    }
                }
                true
            }
            Err(_) => {
                tracing::warn!(
                    grace_s = self.shutdown_grace.as_secs(),
                    "ingestion sources did not terminate within the grace period"
                );
                false
            }
        }
    }

    /// Run until the dashboard is interrupted, then shut the sources down.
    pub async fn run(mut self, dashboard: &DashboardConfig, feed: DashboardFeed) -> Result<()> {
        self.spawn_workers();
        let result = tui::run_dashboard(dashboard, feed.items_rx, feed.logs_rx).await;
        self.shutdown().await;
        // The analyzer is daemonic: it goes away with the runtime.
        if let Some(task) = self.analyzer_task.take() {
            task.abort();
        }
        result
    }
}

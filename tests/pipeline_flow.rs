// End-to-end flow: sources -> analyzer -> dashboard state, with in-test capabilities.

use anyhow::Result;
use async_trait::async_trait;
use signal_monitor::config::{AnalysisConfig, DashboardConfig, NewsSourceConfig};
use signal_monitor::engine::analyzer::{Analyzer, Category, EnrichedItem};
use signal_monitor::engine::sentiment::LexiconScorer;
use signal_monitor::engine::worker::AnalysisWorker;
use signal_monitor::feed::news::NewsProducer;
use signal_monitor::feed::social::{SocialBuffer, SocialProducer};
use signal_monitor::feed::types::{FeedEntry, SocialPost};
use signal_monitor::feed::{FeedSource, IngestionSource, SocialScraper};
use signal_monitor::lifecycle::WorkerState;
use signal_monitor::logs::{LogLevel, LogReceiver, LogSink};
use signal_monitor::pipeline::Pipeline;
use signal_monitor::tui::state::DashboardState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

struct StaticFeed;

#[async_trait]
impl FeedSource for StaticFeed {
    async fn fetch(&self, endpoint: &str) -> Result<Vec<FeedEntry>> {
        if endpoint.contains("down") {
            anyhow::bail!("connection refused");
        }
        Ok(vec![
            FeedEntry {
                title: Some("Unrest".to_string()),
                summary: Some("Protest erupts amid inflation crisis".to_string()),
                link: Some(format!("{}/1", endpoint)),
                published: Some("Tue, 10 Jun 2025 08:30:00 +0530".to_string()),
            },
            FeedEntry {
                title: Some("Markets".to_string()),
                summary: Some("Market growth signals recovery".to_string()),
                link: Some(format!("{}/2", endpoint)),
                published: None,
            },
        ])
    }
}

/// Appends a fixed set of posts, then waits to be stopped.
struct ScriptedScraper {
    posts: Vec<&'static str>,
    stop_tx: watch::Sender<bool>,
}

impl ScriptedScraper {
    fn new(posts: Vec<&'static str>) -> Self {
        let (stop_tx, _rx) = watch::channel(false);
        Self { posts, stop_tx }
    }
}

#[async_trait]
impl SocialScraper for ScriptedScraper {
    async fn run(&self, buffer: SocialBuffer, _log: LogSink) -> Result<()> {
        for text in &self.posts {
            buffer.push(SocialPost {
                username: Some("colombo_watch".to_string()),
                text: Some(text.to_string()),
                ..SocialPost::default()
            });
        }
        let mut rx = self.stop_tx.subscribe();
        let _ = rx.wait_for(|s| *s).await;
        Ok(())
    }

    fn stop(&self) {
        self.stop_tx.send_replace(true);
    }
}

fn sources(names: &[&str]) -> Vec<NewsSourceConfig> {
    names
        .iter()
        .map(|n| NewsSourceConfig {
            name: n.to_string(),
            url: format!("http://{}", n),
        })
        .collect()
}

async fn drain_until(
    state: &mut DashboardState,
    items_rx: &mut mpsc::Receiver<EnrichedItem>,
    logs_rx: &mut LogReceiver,
    total: u64,
) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while state.stats.news + state.stats.social < total {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for items");
        state.drain(items_rx, logs_rx);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_news_and_social_reach_the_dashboard() {
    let (raw_tx, raw_rx) = mpsc::channel(64);
    let (items_tx, mut items_rx) = mpsc::channel(64);
    let (log, mut logs_rx) = LogSink::channel("Orchestrator");

    let news = Arc::new(NewsProducer::new(
        sources(&["derana", "down"]),
        Arc::new(StaticFeed),
        Duration::from_millis(20),
        raw_tx.clone(),
        log.for_origin("NewsFetcher"),
    ));
    let social = Arc::new(SocialProducer::new(
        Arc::new(ScriptedScraper::new(vec![
            "Fuel shortage warning in Kandy",
            "Great day at Galle Face",
        ])),
        SocialBuffer::new(),
        "Sri Lanka",
        "Twitter",
        Duration::from_millis(10),
        Duration::from_secs(1),
        raw_tx,
        log.for_origin("SocialMonitor"),
    ));

    let analyzer =
        Analyzer::from_config(&AnalysisConfig::default(), Arc::new(LexiconScorer::new()));
    let worker = Arc::new(AnalysisWorker::new(
        Arc::new(analyzer),
        raw_rx,
        items_tx,
        log.for_origin("Analyzer"),
        Duration::from_millis(20),
    ));

    let all: Vec<Arc<dyn IngestionSource>> = vec![news.clone(), social.clone()];
    let mut pipeline = Pipeline::new(all, worker, log, Duration::from_secs(2));
    pipeline.spawn_workers();

    let mut state = DashboardState::new(&DashboardConfig::default());
    drain_until(&mut state, &mut items_rx, &mut logs_rx, 4).await;

    // Repeated news cycles must not re-emit the same links.
    tokio::time::sleep(Duration::from_millis(80)).await;
    state.drain(&mut items_rx, &mut logs_rx);

    assert_eq!(state.stats.news, 2);
    assert_eq!(state.stats.social, 2);
    // PROTEST, INFLATION, CRISIS + SHORTAGE, WARNING
    assert_eq!(state.stats.risk_signals, 5);
    // GROWTH, RECOVERY
    assert_eq!(state.stats.opportunity_signals, 2);

    let protest = state
        .history
        .iter()
        .find(|e| e.raw.url == "http://derana/1")
        .unwrap();
    assert_eq!(protest.category, Category::OperationalEnvironment);
    assert_eq!(protest.raw.source_name, "derana");

    let tweet = state
        .history
        .iter()
        .find(|e| e.raw.text.starts_with("Fuel"))
        .unwrap();
    assert_eq!(tweet.raw.title, "colombo_watch");
    assert_eq!(tweet.raw.source_name, "Twitter");

    assert!(pipeline.shutdown().await);
    assert_eq!(news.lifecycle().state(), WorkerState::Terminated);
    assert_eq!(social.lifecycle().state(), WorkerState::Terminated);

    state.drain(&mut items_rx, &mut logs_rx);
    assert!(state
        .logs
        .iter()
        .any(|l| l.level == LogLevel::Error && l.message.starts_with("Failed to fetch down")));
    assert!(state
        .logs
        .iter()
        .any(|l| l.level == LogLevel::News && l.message == "[derana] Unrest"));
}

#[tokio::test]
async fn test_counters_are_monotonic_across_ticks() {
    let (raw_tx, raw_rx) = mpsc::channel(64);
    let (items_tx, mut items_rx) = mpsc::channel(64);
    let (log, mut logs_rx) = LogSink::channel("Test");

    let news = Arc::new(NewsProducer::new(
        sources(&["a", "b", "c"]),
        Arc::new(StaticFeed),
        Duration::from_secs(60),
        raw_tx,
        log.clone(),
    ));
    let analyzer =
        Analyzer::from_config(&AnalysisConfig::default(), Arc::new(LexiconScorer::new()));
    let worker = Arc::new(AnalysisWorker::new(
        Arc::new(analyzer),
        raw_rx,
        items_tx,
        log.clone(),
        Duration::from_millis(20),
    ));
    let all: Vec<Arc<dyn IngestionSource>> = vec![news];
    let mut pipeline = Pipeline::new(all, worker, log, Duration::from_secs(1));
    pipeline.spawn_workers();

    let mut state = DashboardState::new(&DashboardConfig::default());
    let mut previous = state.stats;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while state.stats.news < 6 {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for items");
        state.drain(&mut items_rx, &mut logs_rx);
        let now = state.stats;
        assert!(now.news >= previous.news);
        assert!(now.risk_signals >= previous.risk_signals);
        assert!(now.opportunity_signals >= previous.opportunity_signals);
        previous = now;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(state.stats.news, 6);

    pipeline.shutdown().await;
}

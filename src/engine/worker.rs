use super::analyzer::{EnrichedItem, Enricher};
use crate::feed::types::RawItem;
use crate::lifecycle::Lifecycle;
use crate::logs::LogSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// The single consumer of raw items. Enrichment is serialized, so output order
/// matches the merged arrival order.
pub struct AnalysisWorker {
    enricher: Arc<dyn Enricher>,
    raw_rx: Mutex<mpsc::Receiver<RawItem>>,
    enriched_tx: mpsc::Sender<EnrichedItem>,
    log: LogSink,
    recv_timeout: Duration,
    lifecycle: Lifecycle,
}

impl AnalysisWorker {
    pub fn new(
        enricher: Arc<dyn Enricher>,
        raw_rx: mpsc::Receiver<RawItem>,
        enriched_tx: mpsc::Sender<EnrichedItem>,
        log: LogSink,
        recv_timeout: Duration,
    ) -> Self {
        Self {
            enricher,
            raw_rx: Mutex::new(raw_rx),
            enriched_tx,
            log,
            recv_timeout,
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Enrich one item off the async threads. A panic inside enrichment drops the item.
    async fn process(&self, raw: RawItem) -> Option<EnrichedItem> {
        let enricher = self.enricher.clone();
        let url = raw.url.clone();
        match tokio::task::spawn_blocking(move || enricher.enrich(raw)).await {
            Ok(item) => Some(item),
            Err(e) => {
                self.log
                    .error(format!("Analysis error, dropping {}: {}", url, e));
                None
            }
        }
    }

    pub async fn run(&self) {
        if !self.lifecycle.begin() {
            self.lifecycle.finish();
            return;
        }
        let mut raw_rx = self.raw_rx.lock().await;

        while !self.lifecycle.is_stop_requested() {
            let raw = match tokio::time::timeout(self.recv_timeout, raw_rx.recv()).await {
                Err(_) => continue,
                Ok(None) => {
                    self.log.debug("raw item channel closed, analyzer exiting");
                    break;
                }
                Ok(Some(raw)) => raw,
            };

            let Some(item) = self.process(raw).await else {
                continue;
            };
            if self.enriched_tx.send(item).await.is_err() {
                self.log.debug("enriched channel closed, analyzer exiting");
                break;
            }
        }

        self.lifecycle.finish();
    }

    pub fn stop(&self) {
        self.lifecycle.request_stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::engine::analyzer::{Analyzer, Category};
    use crate::engine::sentiment::{LexiconScorer, SentimentScorer};
    use crate::feed::types::ItemKind;
    use crate::lifecycle::WorkerState;
    use crate::logs::{LogLevel, LogReceiver};
    use anyhow::Result;

    /// Panics on any text containing "boom", otherwise defers to a lexicon analyzer.
    struct TrippingEnricher(Analyzer);

    impl Enricher for TrippingEnricher {
        fn enrich(&self, raw: RawItem) -> EnrichedItem {
            if raw.text.contains("boom") {
                panic!("enrichment blew up");
            }
            self.0.enrich(raw)
        }
    }

    struct PanickingScorer;

    impl SentimentScorer for PanickingScorer {
        fn polarity(&self, _text: &str) -> Result<f64> {
            panic!("scorer blew up")
        }
    }

    struct FailingScorer;

    impl SentimentScorer for FailingScorer {
        fn polarity(&self, _text: &str) -> Result<f64> {
            anyhow::bail!("model unavailable")
        }
    }

    fn raw(text: &str, url: &str) -> RawItem {
        RawItem {
            kind: ItemKind::Social,
            source_name: "Twitter".to_string(),
            title: "user".to_string(),
            text: text.to_string(),
            url: url.to_string(),
            timestamp: String::new(),
        }
    }

    fn analyzer(scorer: Arc<dyn SentimentScorer>) -> Analyzer {
        Analyzer::from_config(&AnalysisConfig::default(), scorer)
    }

    fn lexicon() -> Arc<dyn Enricher> {
        Arc::new(analyzer(Arc::new(LexiconScorer::new())))
    }

    fn worker(
        enricher: Arc<dyn Enricher>,
    ) -> (
        Arc<AnalysisWorker>,
        mpsc::Sender<RawItem>,
        mpsc::Receiver<EnrichedItem>,
        LogReceiver,
    ) {
        let (raw_tx, raw_rx) = mpsc::channel(16);
        let (enriched_tx, enriched_rx) = mpsc::channel(16);
        let (log, log_rx) = LogSink::channel("Analyzer");
        let w = AnalysisWorker::new(enricher, raw_rx, enriched_tx, log, Duration::from_millis(20));
        (Arc::new(w), raw_tx, enriched_rx, log_rx)
    }

    async fn recv(rx: &mut mpsc::Receiver<EnrichedItem>) -> EnrichedItem {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_enriches_in_arrival_order() {
        let (w, raw_tx, mut enriched_rx, _log_rx) = worker(lexicon());
        let runner = w.clone();
        tokio::spawn(async move { runner.run().await });

        raw_tx.send(raw("Protest erupts amid inflation crisis", "u1")).await.unwrap();
        raw_tx.send(raw("Market growth signals recovery", "u2")).await.unwrap();

        let first = recv(&mut enriched_rx).await;
        let second = recv(&mut enriched_rx).await;
        assert_eq!(first.raw.url, "u1");
        assert_eq!(first.category, Category::OperationalEnvironment);
        assert_eq!(second.raw.url, "u2");
        assert_eq!(second.signals, vec!["OPP:GROWTH", "OPP:RECOVERY"]);
    }

    #[tokio::test]
    async fn test_enrichment_panic_drops_item_and_continues() {
        let tripping = TrippingEnricher(analyzer(Arc::new(LexiconScorer::new())));
        let (w, raw_tx, mut enriched_rx, mut log_rx) = worker(Arc::new(tripping));
        let runner = w.clone();
        tokio::spawn(async move { runner.run().await });

        raw_tx.send(raw("boom goes the scorer", "bad")).await.unwrap();
        raw_tx.send(raw("all fine", "good")).await.unwrap();

        let next = recv(&mut enriched_rx).await;
        assert_eq!(next.raw.url, "good");

        let errors: Vec<_> = std::iter::from_fn(|| log_rx.try_recv().ok())
            .filter(|l| l.level == LogLevel::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("bad"));
    }

    #[tokio::test]
    async fn test_scorer_error_is_absorbed_without_error_log() {
        let (w, raw_tx, mut enriched_rx, mut log_rx) =
            worker(Arc::new(analyzer(Arc::new(FailingScorer))));
        let runner = w.clone();
        tokio::spawn(async move { runner.run().await });

        raw_tx.send(raw("Protest erupts amid inflation crisis", "u1")).await.unwrap();
        let item = recv(&mut enriched_rx).await;
        assert_eq!(item.sentiment, 0.0);

        assert!(std::iter::from_fn(|| log_rx.try_recv().ok())
            .all(|l| l.level != LogLevel::Error));
    }

    #[tokio::test]
    async fn test_scorer_panic_is_absorbed_and_item_kept() {
        let (w, raw_tx, mut enriched_rx, mut log_rx) =
            worker(Arc::new(analyzer(Arc::new(PanickingScorer))));
        let runner = w.clone();
        tokio::spawn(async move { runner.run().await });

        raw_tx.send(raw("Market growth signals recovery", "u1")).await.unwrap();
        let item = recv(&mut enriched_rx).await;
        assert_eq!(item.sentiment, 0.0);
        assert_eq!(item.signals, vec!["OPP:GROWTH", "OPP:RECOVERY"]);

        assert!(std::iter::from_fn(|| log_rx.try_recv().ok()).all(|l| l.level != LogLevel::Error));
    }

    #[tokio::test]
    async fn test_stop_observed_at_receive_timeout() {
        let (w, _raw_tx, _enriched_rx, _log_rx) = worker(lexicon());
        let runner = w.clone();
        let handle = tokio::spawn(async move { runner.run().await });

        tokio::time::sleep(Duration::from_millis(30)).await;
        w.stop();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
        assert_eq!(w.lifecycle().state(), WorkerState::Terminated);
    }

    #[tokio::test]
    async fn test_exits_when_producers_are_gone() {
        let (w, raw_tx, _enriched_rx, _log_rx) = worker(lexicon());
        drop(raw_tx);
        tokio::time::timeout(Duration::from_secs(1), w.run()).await.unwrap();
        assert_eq!(w.lifecycle().state(), WorkerState::Terminated);
    }
}

use crate::config::DashboardConfig;
use crate::engine::analyzer::EnrichedItem;
use crate::feed::types::ItemKind;
use crate::logs::{LogEntry, LogReceiver};
use std::collections::VecDeque;
use tokio::sync::mpsc;

/// Counters over every item ever absorbed. Never decremented, never reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub news: u64,
    pub social: u64,
    pub risk_signals: u64,
    pub opportunity_signals: u64,
}

#[derive(Debug)]
pub struct DashboardState {
    pub title: String,
    pub history: VecDeque<EnrichedItem>,
    pub logs: VecDeque<LogEntry>,
    pub stats: Stats,
    history_capacity: usize,
    log_capacity: usize,
    visible_items: usize,
    visible_logs: usize,
}

impl DashboardState {
    pub fn new(config: &DashboardConfig) -> Self {
        let history_capacity = config.history_capacity.max(config.visible_items).max(1);
        let log_capacity = config.log_capacity.max(config.visible_logs).max(1);
        Self {
            title: config.title.clone(),
            history: VecDeque::with_capacity(history_capacity),
            logs: VecDeque::with_capacity(log_capacity),
            stats: Stats::default(),
            history_capacity,
            log_capacity,
            visible_items: config.visible_items,
            visible_logs: config.visible_logs,
        }
    }

    pub fn record_item(&mut self, item: EnrichedItem) {
        match item.kind() {
            ItemKind::News => self.stats.news += 1,
            ItemKind::Social => self.stats.social += 1,
        }
        self.stats.risk_signals += item.risk_signals() as u64;
        self.stats.opportunity_signals += item.opportunity_signals() as u64;

        if self.history.len() >= self.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(item);
    }

    pub fn record_log(&mut self, entry: LogEntry) {
        if self.logs.len() >= self.log_capacity {
            self.logs.pop_front();
        }
        self.logs.push_back(entry);
    }

    /// Absorb whatever is available right now on both channels without waiting.
    /// Returns true when anything new arrived.
    pub fn drain(
        &mut self,
        items_rx: &mut mpsc::Receiver<EnrichedItem>,
        logs_rx: &mut LogReceiver,
    ) -> bool {
        let mut changed = false;
        while let Ok(item) = items_rx.try_recv() {
            self.record_item(item);
            changed = true;
        }
        while let Ok(entry) = logs_rx.try_recv() {
            self.record_log(entry);
            changed = true;
        }
        changed
    }

    /// Most recent items, oldest first.
    pub fn recent_items(&self) -> impl Iterator<Item = &EnrichedItem> {
        let skip = self.history.len().saturating_sub(self.visible_items);
        self.history.iter().skip(skip)
    }

    /// Most recent log entries, oldest first.
    pub fn recent_logs(&self) -> impl Iterator<Item = &LogEntry> {
        let skip = self.logs.len().saturating_sub(self.visible_logs);
        self.logs.iter().skip(skip)
    }
}

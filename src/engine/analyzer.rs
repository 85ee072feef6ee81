use super::sentiment::SentimentScorer;
use crate::config::AnalysisConfig;
use crate::feed::types::{ItemKind, RawItem};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

pub const RISK_PREFIX: &str = "RISK";
pub const OPPORTUNITY_PREFIX: &str = "OPP";

const OPERATIONAL_TERMS: &[&str] = &["strike", "protest", "riot"];
const NATIONAL_TERMS: &[&str] = &["inflation", "economy", "price", "market"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    OperationalEnvironment,
    NationalActivity,
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::OperationalEnvironment => "Operational Environment",
            Category::NationalActivity => "National Activity",
            Category::General => "General",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw item plus the three fields the analyzer adds. The raw item is carried untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedItem {
    pub raw: RawItem,
    pub sentiment: f64,
    pub signals: Vec<String>,
    pub category: Category,
}

impl EnrichedItem {
    pub fn kind(&self) -> ItemKind {
        self.raw.kind
    }

    pub fn risk_signals(&self) -> usize {
        self.signals.iter().filter(|s| s.starts_with(RISK_PREFIX)).count()
    }

    pub fn opportunity_signals(&self) -> usize {
        self.signals
            .iter()
            .filter(|s| s.starts_with(OPPORTUNITY_PREFIX))
            .count()
    }
}

/// First matching rule wins: operational terms, then national-activity terms.
pub fn categorize(text: &str) -> Category {
    let lower = text.to_lowercase();
    if OPERATIONAL_TERMS.iter().any(|t| lower.contains(t)) {
        Category::OperationalEnvironment
    } else if NATIONAL_TERMS.iter().any(|t| lower.contains(t)) {
        Category::NationalActivity
    } else {
        Category::General
    }
}

/// Turns one raw item into its enriched form. Runs on a blocking thread.
pub trait Enricher: Send + Sync {
    fn enrich(&self, raw: RawItem) -> EnrichedItem;
}

pub struct Analyzer {
    risk_keywords: Vec<String>,
    opportunity_keywords: Vec<String>,
    scorer: Arc<dyn SentimentScorer>,
}

fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

impl Analyzer {
    pub fn new(
        risk_keywords: &[String],
        opportunity_keywords: &[String],
        scorer: Arc<dyn SentimentScorer>,
    ) -> Self {
        Self {
            risk_keywords: normalize_keywords(risk_keywords),
            opportunity_keywords: normalize_keywords(opportunity_keywords),
            scorer,
        }
    }

    pub fn from_config(config: &AnalysisConfig, scorer: Arc<dyn SentimentScorer>) -> Self {
        Self::new(&config.risk_keywords, &config.opportunity_keywords, scorer)
    }

    /// Scorer errors, panics and non-finite results all degrade to neutral.
    pub fn sentiment(&self, text: &str) -> f64 {
        match catch_unwind(AssertUnwindSafe(|| self.scorer.polarity(text))) {
            Ok(Ok(v)) if v.is_finite() => v.clamp(-1.0, 1.0),
            Ok(Ok(_)) => 0.0,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "sentiment scorer failed, using neutral");
                0.0
            }
            Err(_) => {
                tracing::debug!("sentiment scorer panicked, using neutral");
                0.0
            }
        }
    }

    /// One tag per matching keyword, risk tags first, each group in configured order.
    pub fn extract_signals(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        let risks = self
            .risk_keywords
            .iter()
            .filter(|kw| lower.contains(kw.as_str()))
            .map(|kw| format!("{}:{}", RISK_PREFIX, kw.to_uppercase()));
        let opportunities = self
            .opportunity_keywords
            .iter()
            .filter(|kw| lower.contains(kw.as_str()))
            .map(|kw| format!("{}:{}", OPPORTUNITY_PREFIX, kw.to_uppercase()));
        risks.chain(opportunities).collect()
    }

    pub fn enrich(&self, raw: RawItem) -> EnrichedItem {
        let sentiment = self.sentiment(&raw.text);
        let signals = self.extract_signals(&raw.text);
        let category = categorize(&raw.text);
        EnrichedItem {
            raw,
            sentiment,
            signals,
            category,
        }
    }
}

impl Enricher for Analyzer {
    fn enrich(&self, raw: RawItem) -> EnrichedItem {
        Analyzer::enrich(self, raw)
    }
}

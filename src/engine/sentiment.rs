use anyhow::Result;
use std::collections::HashMap;

/// Text -> polarity in [-1.0, 1.0].
pub trait SentimentScorer: Send + Sync {
    fn polarity(&self, text: &str) -> Result<f64>;
}

/// Word polarities in [-1, 1].
#[rustfmt::skip]
const LEXICON: &[(&str, f64)] = &[
    // positive
    ("good", 0.7), ("great", 0.8), ("excellent", 1.0), ("best", 1.0), ("better", 0.5),
    ("positive", 0.23), ("success", 0.3), ("successful", 0.75), ("win", 0.8), ("wins", 0.8),
    ("growth", 0.4), ("grow", 0.3), ("gain", 0.4), ("gains", 0.4), ("rise", 0.2),
    ("rises", 0.2), ("recovery", 0.4), ("recover", 0.4), ("improve", 0.5), ("improved", 0.5),
    ("improvement", 0.5), ("profit", 0.4), ("profits", 0.4), ("strong", 0.43), ("stable", 0.3),
    ("stability", 0.3), ("boost", 0.4), ("happy", 0.8), ("welcome", 0.8), ("hope", 0.4),
    ("peace", 0.5), ("peaceful", 0.5), ("safe", 0.5), ("support", 0.3), ("benefit", 0.4),
    ("opportunity", 0.4), ("investment", 0.2), ("progress", 0.4), ("launch", 0.1), ("new", 0.14),
    ("record", 0.2), ("celebrate", 0.6), ("relief", 0.4), ("agreement", 0.3), ("boom", 0.5),
    // negative
    ("bad", -0.7), ("worse", -0.4), ("worst", -1.0), ("poor", -0.4), ("negative", -0.3),
    ("crisis", -0.6), ("shortage", -0.5), ("shortages", -0.5), ("inflation", -0.3),
    ("strike", -0.3),
    ("protest", -0.3), ("protests", -0.3), ("riot", -0.7), ("riots", -0.7), ("violence", -0.8),
    ("violent", -0.8), ("danger", -0.6), ("dangerous", -0.6), ("warning", -0.3), ("curfew", -0.4),
    ("attack", -0.6), ("killed", -0.8), ("death", -0.7), ("dead", -0.7), ("injured", -0.6),
    ("fail", -0.5), ("failed", -0.5), ("failure", -0.5), ("loss", -0.4), ("losses", -0.4),
    ("fall", -0.2), ("falls", -0.2), ("decline", -0.3), ("collapse", -0.7), ("debt", -0.3),
    ("fear", -0.6), ("fears", -0.6), ("angry", -0.5), ("unrest", -0.6), ("corruption", -0.7),
    ("arrest", -0.3), ("arrested", -0.3), ("flood", -0.5), ("floods", -0.5), ("disaster", -0.8),
    ("terrible", -1.0), ("outage", -0.4), ("blackout", -0.5), ("hike", -0.2), ("struggle", -0.4),
];

#[rustfmt::skip]
const NEGATORS: &[&str] = &[
    "not", "no", "never", "isn't", "wasn't", "weren't", "aren't", "won't", "can't", "cannot",
    "without", "don't", "doesn't", "didn't",
];

const INTENSIFIERS: &[&str] = &[
    "very", "extremely", "highly", "severe", "severely", "deeply", "massive", "major",
];

const INTENSIFIER_SCALE: f64 = 1.3;
const NEGATION_WINDOW: usize = 3;

/// Lexicon-based scorer: mean polarity of matched words, with negation and intensifiers.
#[derive(Debug, Clone)]
pub struct LexiconScorer {
    lexicon: HashMap<&'static str, f64>,
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconScorer {
    pub fn new() -> Self {
        Self {
            lexicon: LEXICON.iter().copied().collect(),
        }
    }

    pub fn score(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        let mut total = 0.0;
        let mut hits = 0usize;

        for (i, tok) in tokens.iter().enumerate() {
            let Some(&base) = self.lexicon.get(tok.as_str()) else {
                continue;
            };
            let window = &tokens[i.saturating_sub(NEGATION_WINDOW)..i];
            let negated = window.iter().any(|t| NEGATORS.contains(&t.as_str()));
            let intensified = i > 0 && INTENSIFIERS.contains(&tokens[i - 1].as_str());

            let mut value = base;
            if intensified {
                value *= INTENSIFIER_SCALE;
            }
            if negated {
                value = -value * 0.5;
            }
            total += value;
            hits += 1;
        }

        if hits == 0 {
            return 0.0;
        }
        (total / hits as f64).clamp(-1.0, 1.0)
    }
}

impl SentimentScorer for LexiconScorer {
    fn polarity(&self, text: &str) -> Result<f64> {
        Ok(self.score(text))
    }
}

/// Lower-case word tokens; apostrophes stay inside words so "isn't" survives.
fn tokenize(s: &str) -> Vec<String> {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

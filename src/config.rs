use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_ENV: &str = "SIGNAL_MONITOR_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub social: SocialConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NewsConfig {
    #[serde(default = "default_news_interval")]
    pub interval_s: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_news_sources")]
    pub sources: Vec<NewsSourceConfig>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct NewsSourceConfig {
    pub name: String,
    pub url: String,
}

fn default_news_interval() -> u64 { 300 }
fn default_request_timeout() -> u64 { 15_000 }

fn default_news_sources() -> Vec<NewsSourceConfig> {
    [
        ("Ada Derana", "http://www.adaderana.lk/rss.php"),
        ("Daily Mirror", "https://www.dailymirror.lk/RSS_Feeds/breaking-news"),
        ("Lanka C News", "https://lankacnews.com/feed/"),
        ("Colombo Page", "http://www.colombopage.com/feed.xml"),
    ]
    .into_iter()
    .map(|(name, url)| NewsSourceConfig {
        name: name.to_string(),
        url: url.to_string(),
    })
    .collect()
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            interval_s: default_news_interval(),
            request_timeout_ms: default_request_timeout(),
            sources: default_news_sources(),
        }
    }
}

impl NewsConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_s)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SocialConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_keyword")]
    pub keyword: String,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default = "default_social_poll")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_s: u64,
    #[serde(default = "default_scraper_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub scraper: ScraperConfig,
}

fn default_true() -> bool { true }
fn default_keyword() -> String { "Sri Lanka".to_string() }
fn default_max_items() -> usize { 100 }
fn default_platform() -> String { "Twitter".to_string() }
fn default_social_poll() -> u64 { 1000 }
fn default_shutdown_timeout() -> u64 { 5 }
fn default_scraper_command() -> String { "tweet-scraper".to_string() }

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keyword: default_keyword(),
            max_items: default_max_items(),
            platform: default_platform(),
            poll_interval_ms: default_social_poll(),
            shutdown_timeout_s: default_shutdown_timeout(),
            command: default_scraper_command(),
            args: Vec::new(),
            scraper: ScraperConfig::default(),
        }
    }
}

impl SocialConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_s)
    }
}

/// Settings handed to the external scraping process.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ScraperConfig {
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default = "default_scroll_delay")]
    pub scroll_delay_s: u64,
    #[serde(default = "default_max_scrolls")]
    pub max_consecutive_scrolls: u32,
}

fn default_scroll_delay() -> u64 { 2 }
fn default_max_scrolls() -> u32 { 20 }

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            headless: true,
            scroll_delay_s: default_scroll_delay(),
            max_consecutive_scrolls: default_max_scrolls(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    #[serde(default = "default_risk_keywords")]
    pub risk_keywords: Vec<String>,
    #[serde(default = "default_opportunity_keywords")]
    pub opportunity_keywords: Vec<String>,
    #[serde(default = "default_recv_timeout")]
    pub recv_timeout_ms: u64,
}

fn default_risk_keywords() -> Vec<String> {
    [
        "strike", "protest", "shortage", "inflation", "crisis", "danger", "warning", "riot",
        "curfew",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_opportunity_keywords() -> Vec<String> {
    [
        "growth", "investment", "development", "opening", "launch", "success", "profit",
        "recovery",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_recv_timeout() -> u64 { 1000 }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            risk_keywords: default_risk_keywords(),
            opportunity_keywords: default_opportunity_keywords(),
            recv_timeout_ms: default_recv_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_tick")]
    pub tick_ms: u64,
    #[serde(default = "default_refresh")]
    pub refresh_per_second: u32,
    #[serde(default = "default_visible_items")]
    pub visible_items: usize,
    #[serde(default = "default_visible_logs")]
    pub visible_logs: usize,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

fn default_title() -> String { "Sri Lanka Socio-Economic Signal Monitor".to_string() }
fn default_tick() -> u64 { 100 }
fn default_refresh() -> u32 { 4 }
fn default_visible_items() -> usize { 15 }
fn default_visible_logs() -> usize { 10 }
fn default_history_capacity() -> usize { 500 }
fn default_log_capacity() -> usize { 200 }

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            tick_ms: default_tick(),
            refresh_per_second: default_refresh(),
            visible_items: default_visible_items(),
            visible_logs: default_visible_logs(),
            history_capacity: default_history_capacity(),
            log_capacity: default_log_capacity(),
        }
    }
}

impl DashboardConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    /// Minimum spacing between two redraws.
    pub fn redraw_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.refresh_per_second.max(1)))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_s: u64,
}

fn default_channel_capacity() -> usize { 1024 }
fn default_shutdown_grace() -> u64 { 6 }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            shutdown_grace_s: default_shutdown_grace(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Optional tracing output file. The terminal belongs to the dashboard.
    pub file: Option<PathBuf>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        // Strip BOM if present (common on Windows-created files)
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let config: Config = toml::from_str(content)
            .with_context(|| "Failed to parse config TOML")?;
        Ok(config)
    }

    /// Load from `path`, falling back to built-in defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Config path from `SIGNAL_MONITOR_CONFIG`, else `config.toml` in the working directory.
    pub fn path_from_env() -> PathBuf {
        match std::env::var(CONFIG_ENV) {
            Ok(p) if !p.trim().is_empty() => PathBuf::from(p.trim()),
            _ => PathBuf::from(DEFAULT_CONFIG_FILE),
        }
    }
}

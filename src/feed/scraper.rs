//! Social scraper backed by an external long-running process.
//!
//! The process receives the keyword and limits as command-line flags and prints one
//! JSON post per line on stdout. Anything it writes to stderr is surfaced in the log.

use super::social::SocialBuffer;
use super::types::SocialPost;
use super::SocialScraper;
use crate::config::ScraperConfig;
use crate::logs::LogSink;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::watch;

pub struct CommandScraper {
    program: String,
    base_args: Vec<String>,
    keyword: String,
    max_items: usize,
    settings: ScraperConfig,
    stop_tx: watch::Sender<bool>,
}

impl CommandScraper {
    pub fn new(
        program: &str,
        base_args: Vec<String>,
        keyword: &str,
        max_items: usize,
        settings: ScraperConfig,
    ) -> Self {
        let (stop_tx, _rx) = watch::channel(false);
        Self {
            program: program.to_string(),
            base_args,
            keyword: keyword.to_string(),
            max_items,
            settings,
            stop_tx,
        }
    }

    /// Full argument list passed to the scraping process.
    pub fn args(&self) -> Vec<String> {
        let mut args = self.base_args.clone();
        args.extend([
            "--keyword".to_string(),
            self.keyword.clone(),
            "--max-items".to_string(),
            self.max_items.to_string(),
            "--scroll-delay".to_string(),
            self.settings.scroll_delay_s.to_string(),
            "--max-consecutive-scrolls".to_string(),
            self.settings.max_consecutive_scrolls.to_string(),
        ]);
        if self.settings.headless {
            args.push("--headless".to_string());
        }
        args
    }

    fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }
}

/// Parse one stdout line. Blank lines yield `Ok(None)`.
pub fn parse_post_line(line: &str) -> Result<Option<SocialPost>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let post: SocialPost =
        serde_json::from_str(line).context("scraper emitted a line that is not a JSON post")?;
    Ok(Some(post))
}

#[async_trait]
impl SocialScraper for CommandScraper {
    async fn run(&self, buffer: SocialBuffer, log: LogSink) -> Result<()> {
        if self.is_stopped() {
            return Ok(());
        }
        if self.max_items == 0 {
            log.info("Scraper limit is 0, nothing to collect");
            return Ok(());
        }
        let mut stop_rx = self.stop_tx.subscribe();

        let mut child = Command::new(&self.program)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to launch scraper '{}'", self.program))?;

        log.info(format!(
            "Scraper launched for '{}' (max {} items)",
            self.keyword, self.max_items
        ));

        let stdout = child
            .stdout
            .take()
            .context("scraper stdout was not captured")?;
        if let Some(stderr) = child.stderr.take() {
            let stderr_log = log.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if !line.trim().is_empty() {
                        stderr_log.info(line);
                    }
                }
            });
        }

        let mut lines = BufReader::new(stdout).lines();
        let mut collected = 0usize;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line.context("failed reading scraper output")? {
                        Some(line) => match parse_post_line(&line) {
                            Ok(Some(post)) => {
                                buffer.push(post);
                                collected += 1;
                                if collected >= self.max_items {
                                    log.info(format!(
                                        "Collected {} posts, stopping scraper",
                                        collected
                                    ));
                                    break;
                                }
                            }
                            Ok(None) => {}
                            Err(e) => log.debug(format!("{:#}: {}", e, line)),
                        },
                        None => break,
                    }
                }
                _ = stop_rx.wait_for(|stopped| *stopped) => {
                    log.info("Scraper stop requested");
                    break;
                }
            }
        }

        // Output closed or we are done reading; make sure the process goes away.
        if child.try_wait().context("failed to poll scraper process")?.is_none() {
            let _ = child.kill().await;
        }
        let status = child.wait().await.context("failed to reap scraper process")?;
        log.info(format!(
            "Scraper exited ({}) after {} posts",
            status, collected
        ));
        Ok(())
    }

    fn stop(&self) {
        self.stop_tx.send_replace(true);
    }
}

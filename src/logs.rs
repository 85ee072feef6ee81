use chrono::{DateTime, Local};
use std::fmt;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Debug,
    News,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::News => "NEWS",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub time: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
    pub origin: String,
}

pub type LogReceiver = mpsc::UnboundedReceiver<LogEntry>;

/// Cloneable handle onto the dashboard log channel, stamped with the emitting component.
///
/// Every entry is mirrored to `tracing`, so an optional log file sees the same stream
/// the dashboard does.
#[derive(Debug, Clone)]
pub struct LogSink {
    tx: mpsc::UnboundedSender<LogEntry>,
    origin: String,
}

impl LogSink {
    pub fn channel(origin: &str) -> (Self, LogReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                origin: origin.to_string(),
            },
            rx,
        )
    }

    /// Same channel, different origin label.
    pub fn for_origin(&self, origin: &str) -> Self {
        Self {
            tx: self.tx.clone(),
            origin: origin.to_string(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn emit(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Error => tracing::error!(origin = %self.origin, "{}", message),
            LogLevel::Warn => tracing::warn!(origin = %self.origin, "{}", message),
            LogLevel::Debug => tracing::debug!(origin = %self.origin, "{}", message),
            LogLevel::Info | LogLevel::News => {
                tracing::info!(origin = %self.origin, level = %level, "{}", message)
            }
        }
        // Receiver gone means the dashboard has shut down; nothing left to show.
        let _ = self.tx.send(LogEntry {
            time: Local::now(),
            level,
            message,
            origin: self.origin.clone(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(LogLevel::Info, message);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.emit(LogLevel::Debug, message);
    }

    pub fn news(&self, message: impl Into<String>) {
        self.emit(LogLevel::News, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(LogLevel::Error, message);
    }
}

/// Send panic messages to `tracing` instead of stderr, where they would land on top of
/// the dashboard. Without a subscriber they are discarded.
pub fn route_panics_to_tracing() {
    std::panic::set_hook(Box::new(|info| {
        tracing::error!("panic: {}", info);
    }));
}

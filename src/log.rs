//! # Transformer Diagnostics
//!
//! Severity-leveled log entries emitted by passes, and the sinks that consume them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a [`LogEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }
}

/// Unknown level names are treated as errors.
impl From<&str> for LogLevel {
    fn from(level: &str) -> Self {
        match level.to_ascii_uppercase().as_str() {
            "WARN" | "WARNING" => Self::Warn,
            "INFO" => Self::Info,
            "DEBUG" => Self::Debug,
            _ => Self::Error,
        }
    }
}

impl From<String> for LogLevel {
    fn from(level: String) -> Self {
        Self::from(level.as_str())
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.as_str().to_string()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One diagnostic produced during a transform run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Consumer of transformer diagnostics.
///
/// The orchestrator calls [`LogSink::drain`] exactly once per run with every
/// entry accumulated so far, in emission order.
pub trait LogSink {
    fn print(&mut self, entry: &LogEntry);

    fn drain(&mut self, entries: &[LogEntry]) {
        for entry in entries {
            self.print(entry);
        }
    }
}

impl<F> LogSink for F
where
    F: FnMut(&LogEntry),
{
    fn print(&mut self, entry: &LogEntry) {
        self(entry)
    }
}

/// Default sink: routes each entry to the matching `tracing` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn print(&mut self, entry: &LogEntry) {
        match entry.level {
            LogLevel::Error => tracing::error!("{}", entry.message),
            LogLevel::Warn => tracing::warn!("{}", entry.message),
            LogLevel::Info => tracing::info!("{}", entry.message),
            LogLevel::Debug => tracing::debug!("{}", entry.message),
        }
    }
}

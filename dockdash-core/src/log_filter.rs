//! Live log tail and filtering
//!
//! Lines streamed from a unit are kept in a bounded buffer; the logs view
//! renders the subset that passes the current [`LogFilter`].

use std::collections::VecDeque;

use crate::model::UnitId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Guess a line's level from common markers in its text
pub fn detect_level(text: &str) -> LogLevel {
    let lower = text.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["error", "fatal", "panic", "exception", "[err]"]) {
        LogLevel::Error
    } else if has(&["warn", "[wrn]", "deprecat"]) {
        LogLevel::Warn
    } else if has(&["debug", "[dbg]", "trace"]) {
        LogLevel::Debug
    } else {
        LogLevel::Info
    }
}

/// Minimum level shown in the logs view
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LevelFilter {
    #[default]
    All,
    WarnAndAbove,
    ErrorOnly,
}

impl LevelFilter {
    pub fn cycle(self) -> Self {
        match self {
            Self::All => Self::WarnAndAbove,
            Self::WarnAndAbove => Self::ErrorOnly,
            Self::ErrorOnly => Self::All,
        }
    }

    pub fn admits(&self, level: LogLevel) -> bool {
        match self {
            Self::All => true,
            Self::WarnAndAbove => level >= LogLevel::Warn,
            Self::ErrorOnly => level == LogLevel::Error,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::WarnAndAbove => "WARN+",
            Self::ErrorOnly => "ERROR",
        }
    }
}

/// Level filter combined with a case-insensitive search term
#[derive(Clone, Debug, Default)]
pub struct LogFilter {
    pub level: LevelFilter,
    search: Option<String>,
}

impl LogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_search(&mut self, term: &str) {
        let term = term.trim();
        self.search = if term.is_empty() {
            None
        } else {
            Some(term.to_lowercase())
        };
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn cycle_level(&mut self) {
        self.level = self.level.cycle();
    }

    pub fn matches(&self, text: &str) -> bool {
        if !self.level.admits(detect_level(text)) {
            return false;
        }
        match &self.search {
            Some(term) => text.to_lowercase().contains(term),
            None => true,
        }
    }

    pub fn label(&self) -> String {
        match &self.search {
            Some(term) => format!("{} /{}/", self.level.label(), term),
            None => self.level.label().to_string(),
        }
    }
}

/// Where the current log session stands
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LogSession {
    #[default]
    Closed,
    Connecting,
    Streaming,
    Ended,
    Failed(String),
}

/// Bounded FIFO of log lines for one unit
#[derive(Clone, Debug)]
pub struct LogBuffer {
    cap: usize,
    unit: Option<UnitId>,
    lines: VecDeque<String>,
    pub session: LogSession,
}

impl LogBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            unit: None,
            lines: VecDeque::new(),
            session: LogSession::Closed,
        }
    }

    /// Start a fresh buffer for `unit`
    pub fn open(&mut self, unit: UnitId) {
        self.unit = Some(unit);
        self.lines.clear();
        self.session = LogSession::Connecting;
    }

    pub fn close(&mut self) {
        self.unit = None;
        self.lines.clear();
        self.session = LogSession::Closed;
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Append a chunk from the stream; multi-line chunks are split
    pub fn push(&mut self, chunk: &str) {
        for line in chunk.lines() {
            if self.lines.len() >= self.cap {
                self.lines.pop_front();
            }
            self.lines.push_back(line.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines passing `filter`, oldest first
    pub fn visible(&self, filter: &LogFilter) -> Vec<&str> {
        self.lines
            .iter()
            .map(String::as_str)
            .filter(|l| filter.matches(l))
            .collect()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(5_000)
    }
}

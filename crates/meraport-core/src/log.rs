// ── Run log ──
//
// The ordered, human-readable record of a backup, restore or migration run.
// Every line is mirrored to `tracing`; sinks decide where the lines go for
// the user (a buffer, a live channel, or nowhere).

use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;
use tokio::sync::mpsc;

/// Outcome class of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LineKind {
    Info,
    Success,
    Skip,
    Warn,
    Fail,
}

impl LineKind {
    /// Fixed prefix identifying the outcome in rendered output.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Info => "•",
            Self::Success => "✅",
            Self::Skip => "⏩",
            Self::Warn => "⚠️",
            Self::Fail => "❌",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub at: DateTime<Utc>,
    pub kind: LineKind,
    pub message: String,
}

impl LogLine {
    pub fn new(kind: LineKind, message: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            kind,
            message: message.into(),
        }
    }

    /// `[HH:MM:SS] ✅ message`
    pub fn timestamped(&self) -> String {
        format!("[{}] {self}", self.at.format("%H:%M:%S"))
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.marker(), self.message)
    }
}

// ── Sinks ───────────────────────────────────────────────────────────

/// Destination for run log lines.
pub trait LogSink: Send + Sync {
    fn emit(&self, line: LogLine);
}

/// Buffers every line; used by tests and for end-of-run summaries.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<LogLine>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<LogLine> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Rendered lines without timestamps.
    pub fn rendered(&self) -> Vec<String> {
        self.lines().iter().map(ToString::to_string).collect()
    }

    pub fn count(&self, kind: LineKind) -> usize {
        self.lines().iter().filter(|l| l.kind == kind).count()
    }
}

impl LogSink for MemorySink {
    fn emit(&self, line: LogLine) {
        match self.lines.lock() {
            Ok(mut lines) => lines.push(line),
            Err(poisoned) => poisoned.into_inner().push(line),
        }
    }
}

/// Forwards lines to a live consumer. Lines emitted after the receiver is
/// dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<LogLine>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LogLine>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl LogSink for ChannelSink {
    fn emit(&self, line: LogLine) {
        let _ = self.tx.send(line);
    }
}

/// Drops every line. `RunLog` still mirrors to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, _line: LogLine) {}
}

// ── RunLog ──────────────────────────────────────────────────────────

/// Cheaply cloneable handle the engines write through.
#[derive(Clone)]
pub struct RunLog {
    sink: Arc<dyn LogSink>,
}

impl fmt::Debug for RunLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLog").finish_non_exhaustive()
    }
}

impl RunLog {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    /// A log that only reaches `tracing`.
    pub fn silent() -> Self {
        Self::new(Arc::new(TracingSink))
    }

    pub fn emit(&self, kind: LineKind, message: impl Into<String>) {
        let line = LogLine::new(kind, message);
        match kind {
            LineKind::Fail => tracing::warn!(kind = %kind, "{}", line.message),
            LineKind::Warn => tracing::info!(kind = %kind, "{}", line.message),
            _ => tracing::debug!(kind = %kind, "{}", line.message),
        }
        self.sink.emit(line);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(LineKind::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(LineKind::Success, message);
    }

    pub fn skip(&self, message: impl Into<String>) {
        self.emit(LineKind::Skip, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(LineKind::Warn, message);
    }

    pub fn fail(&self, message: impl Into<String>) {
        self.emit(LineKind::Fail, message);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn lines_keep_order_and_markers() {
        let sink = Arc::new(MemorySink::new());
        let log = RunLog::new(sink.clone());
        log.success("Success: /organizations/1/admins");
        log.skip("Skipped (no data/not configured): /organizations/1/snmp");
        log.fail("FAILED: /organizations/1/licenses (Meraki API Error: boom)");

        let rendered = sink.rendered();
        assert_eq!(rendered.len(), 3);
        assert!(rendered[0].starts_with("✅ Success"));
        assert!(rendered[1].starts_with("⏩ Skipped"));
        assert!(rendered[2].starts_with("❌ FAILED"));
        assert_eq!(sink.count(LineKind::Fail), 1);
    }

    #[test]
    fn timestamped_rendering() {
        let line = LogLine::new(LineKind::Warn, "careful");
        let text = line.timestamped();
        assert!(text.starts_with('['));
        assert!(text.ends_with("⚠️ careful"));
    }

    #[tokio::test]
    async fn channel_sink_delivers_live() {
        let (sink, mut rx) = ChannelSink::new();
        let log = RunLog::new(Arc::new(sink));
        log.info("starting");
        let line = rx.recv().await.unwrap();
        assert_eq!(line.kind, LineKind::Info);
        assert_eq!(line.message, "starting");
    }
}

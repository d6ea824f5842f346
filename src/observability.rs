//! The core's observability surface: plain-text, line-buffered snapshots.
//!
//! Emitted at engine start/stop, on each daily reset, when a sweep
//! produces at least one trade, at hourly GTD checks, and at the 30-s
//! periodic status tick. The format is a human surface, not a wire
//! format, so a default `tracing`-backed sink is all production code
//! needs; tests substitute [`RecordingSink`] to assert on what was said.

use chrono::Utc;
use parking_lot::Mutex;

/// A line-buffered destination for human-readable engine status lines.
pub trait StatusSink: Send + Sync {
    fn emit(&self, line: &str);
}

/// Default sink: forwards every line to `tracing::info!`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn emit(&self, line: &str) {
        tracing::info!("{}", line);
    }
}

/// Test-friendly sink that retains every emitted line in order.
#[derive(Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl StatusSink for RecordingSink {
    fn emit(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

/// Prefixes `message` with a human-readable timestamp and emits it.
pub fn emit_timestamped(sink: &dyn StatusSink, message: &str) {
    sink.emit(&format!("[{}] {}", Utc::now().format("%Y-%m-%d %H:%M:%S%.3f UTC"), message));
}

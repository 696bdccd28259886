//! Scan progress accounting and throttled emission
//!
//! The reporter is purely observational: the engine pushes deltas into it
//! and nothing it does feeds back into control flow.

use log::info;
use std::time::{Duration, Instant};

/// Point-in-time view of one mailbox's progress
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub mailbox: String,
    pub windows_processed: u32,
    pub deleted: u64,
    pub seen: u64,
    /// Latest known message count, if any
    pub remaining: Option<u32>,
    pub started_at: Instant,
}

impl ProgressSnapshot {
    fn new(mailbox: impl Into<String>, remaining: Option<u32>) -> Self {
        Self {
            mailbox: mailbox.into(),
            windows_processed: 0,
            deleted: 0,
            seen: 0,
            remaining,
            started_at: Instant::now(),
        }
    }

    /// Deletions per minute since the mailbox started
    pub fn rate_per_minute(&self) -> u64 {
        rate_per_minute(self.deleted, self.started_at.elapsed())
    }
}

/// `deleted / elapsed_seconds * 60`, with elapsed floored at 1 ms
pub fn rate_per_minute(deleted: u64, elapsed: Duration) -> u64 {
    let secs = elapsed.as_secs_f64().max(0.001);
    ((deleted as f64 / secs) * 60.0) as u64
}

/// Check whether at least `interval` has passed since the last emission.
///
/// # Returns
/// `true` if nothing was emitted yet or the interval has elapsed
pub fn interval_elapsed(last_emit: Option<Instant>, now: Instant, interval: Duration) -> bool {
    match last_emit {
        Some(last) => now.saturating_duration_since(last) >= interval,
        None => true,
    }
}

/// Destination for progress lines
pub trait ProgressSink: Send {
    fn emit(&mut self, snapshot: &ProgressSnapshot, done: bool);
}

/// Writes one `info` line per emission
#[derive(Debug, Default)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&mut self, snapshot: &ProgressSnapshot, done: bool) {
        let remaining = snapshot
            .remaining
            .map_or_else(|| "?".to_string(), |r| r.to_string());
        info!(
            target: "mail::progress",
            "{} {} | win {} | deleted {} | seen {} | remain {} | {} msg/min",
            if done { "done" } else { ".." },
            snapshot.mailbox,
            snapshot.windows_processed,
            snapshot.deleted,
            snapshot.seen,
            remaining,
            snapshot.rate_per_minute()
        );
    }
}

/// Delta applied by [`ProgressReporter::update`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub deleted: u64,
    pub seen: u64,
    pub window: bool,
    pub remaining: Option<u32>,
}

impl ProgressUpdate {
    pub fn deleted(n: usize) -> Self {
        Self {
            deleted: n as u64,
            ..Default::default()
        }
    }

    /// One window processed with `n` matches
    pub fn window(n: usize) -> Self {
        Self {
            seen: n as u64,
            window: true,
            ..Default::default()
        }
    }

    pub fn remaining(count: u32) -> Self {
        Self {
            remaining: Some(count),
            ..Default::default()
        }
    }
}

/// Accumulates counters for the current mailbox and throttles output
pub struct ProgressReporter {
    enabled: bool,
    interval: Duration,
    last_emit: Option<Instant>,
    snapshot: ProgressSnapshot,
    sink: Box<dyn ProgressSink>,
}

impl ProgressReporter {
    pub fn new(enabled: bool, interval: Duration, sink: Box<dyn ProgressSink>) -> Self {
        Self {
            enabled,
            interval,
            last_emit: None,
            snapshot: ProgressSnapshot::new("", None),
            sink,
        }
    }

    /// Reporter that keeps counters but never emits
    pub fn disabled() -> Self {
        Self::new(false, Duration::ZERO, Box::new(LogProgressSink))
    }

    /// Reset counters for a new mailbox and emit immediately
    pub fn start(&mut self, mailbox: &str, remaining: Option<u32>) {
        self.snapshot = ProgressSnapshot::new(mailbox, remaining);
        self.emit(true, false);
    }

    pub fn update(&mut self, delta: ProgressUpdate, force: bool) {
        self.snapshot.deleted += delta.deleted;
        self.snapshot.seen += delta.seen;
        if delta.window {
            self.snapshot.windows_processed += 1;
        }
        if delta.remaining.is_some() {
            self.snapshot.remaining = delta.remaining;
        }
        self.emit(force, false);
    }

    /// Final emission for the current mailbox
    pub fn end(&mut self) {
        self.emit(true, true);
    }

    pub fn snapshot(&self) -> &ProgressSnapshot {
        &self.snapshot
    }

    fn emit(&mut self, force: bool, done: bool) {
        if !self.enabled {
            return;
        }
        let now = Instant::now();
        if !force && !interval_elapsed(self.last_emit, now, self.interval) {
            return;
        }
        self.last_emit = Some(now);
        self.sink.emit(&self.snapshot, done);
    }
}

//! Batch progress measured in files and seconds of audio.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::pipeline::FileReport;

/// Progress of one batch run, shared between rayon workers and the CLI bar.
#[derive(Clone)]
pub struct BatchProgress {
    shared: Arc<Shared>,
}

struct Shared {
    files_total: usize,
    started: Instant,
    files_done: AtomicUsize,
    files_failed: AtomicUsize,
    audio_micros: AtomicU64,
    finished: AtomicBool,
}

#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub files_total: usize,
    pub files_done: usize,
    pub files_failed: usize,
    /// Seconds of audio written so far
    pub audio_secs: f64,
    pub elapsed: Duration,
    pub finished: bool,
}

impl BatchProgress {
    /// Starts the clock for a batch of `files_total` inputs.
    pub fn new(files_total: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                files_total,
                started: Instant::now(),
                files_done: AtomicUsize::new(0),
                files_failed: AtomicUsize::new(0),
                audio_micros: AtomicU64::new(0),
                finished: AtomicBool::new(false),
            }),
        }
    }

    pub fn record(&self, report: &FileReport) {
        let micros = (report.duration_secs * 1_000_000.0).round() as u64;
        self.shared.audio_micros.fetch_add(micros, Ordering::Relaxed);
        self.shared.files_done.fetch_add(1, Ordering::Release);
    }

    pub fn record_failure(&self) {
        self.shared.files_failed.fetch_add(1, Ordering::Release);
    }

    pub fn finish(&self) {
        self.shared.finished.store(true, Ordering::Release);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            files_total: self.shared.files_total,
            files_done: self.shared.files_done.load(Ordering::Acquire),
            files_failed: self.shared.files_failed.load(Ordering::Acquire),
            audio_secs: self.shared.audio_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0,
            elapsed: self.shared.started.elapsed(),
            finished: self.shared.finished.load(Ordering::Acquire),
        }
    }
}

impl ProgressSnapshot {
    /// Files that are finished either way.
    pub fn files_handled(&self) -> usize {
        self.files_done + self.files_failed
    }

    /// Seconds of audio rendered per second of wall time.
    pub fn realtime_factor(&self) -> Option<f64> {
        let wall = self.elapsed.as_secs_f64();
        (wall > 0.0 && self.audio_secs > 0.0).then(|| self.audio_secs / wall)
    }

    /// Remaining time, extrapolated from the average wall time per handled file.
    pub fn eta(&self) -> Option<Duration> {
        let handled = self.files_handled();
        if self.finished || handled == 0 || handled >= self.files_total {
            return None;
        }
        let per_file = self.elapsed.as_secs_f64() / handled as f64;
        let remaining = (self.files_total - handled) as f64;
        Some(Duration::from_secs_f64(per_file * remaining))
    }

    /// One-line status for the progress bar.
    pub fn status(&self) -> String {
        let mut parts = vec![format!("{:.1}s of audio", self.audio_secs)];
        if let Some(factor) = self.realtime_factor() {
            parts.push(format!("{:.0}x realtime", factor));
        }
        if self.files_failed > 0 {
            parts.push(format!("{} failed", self.files_failed));
        }
        if let Some(eta) = self.eta() {
            parts.push(format!("ETA {}s", eta.as_secs()));
        }
        parts.join(" | ")
    }
}

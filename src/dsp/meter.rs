//! VU-style level metering.

use serde::{Deserialize, Serialize};

/// Number of samples averaged for one meter reading.
pub const METER_WINDOW: usize = 1024;

/// RMS value that drives the meter to full scale.
pub const METER_FULL_SCALE_RMS: f32 = 0.5;

/// Refresh interval of the live meter.
pub const METER_INTERVAL_MS: u32 = 50;

/// Meter reading for the window starting at `position`.
///
/// Returns 0.0 once `position` is past the end of the buffer.
pub fn window_level(samples: &[f32], position: usize) -> f32 {
    let start = position.min(samples.len());
    let end = position.saturating_add(METER_WINDOW).min(samples.len());
    let window = &samples[start..end];
    if window.is_empty() {
        return 0.0;
    }
    let mean_sq = window.iter().map(|&s| s * s).sum::<f32>() / window.len() as f32;
    (mean_sq.sqrt() / METER_FULL_SCALE_RMS).min(1.0)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VuMeter {
    level: f32,
}

impl VuMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn set_level(&mut self, level: f32) {
        self.level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
    }

    /// Draws the meter as a fixed-width text bar.
    pub fn render(&self, width: usize) -> String {
        let filled = ((self.level * width as f32).round() as usize).min(width);
        format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
    }
}

/// Meter readings taken at a fixed interval across a buffer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeterTrack {
    pub interval_ms: u32,
    pub levels: Vec<f32>,
}

impl MeterTrack {
    pub fn from_samples(samples: &[f32], sample_rate: u32, interval_ms: u32) -> Self {
        let step = (u64::from(sample_rate) * u64::from(interval_ms) / 1000).max(1) as usize;
        let levels = (0..samples.len())
            .step_by(step)
            .map(|position| window_level(samples, position))
            .collect();
        Self {
            interval_ms,
            levels,
        }
    }

    pub fn peak(&self) -> f32 {
        self.levels.iter().copied().fold(0.0, f32::max)
    }

    /// One line per reading: timestamp and bar.
    pub fn render(&self, width: usize) -> String {
        let mut meter = VuMeter::new();
        self.levels
            .iter()
            .enumerate()
            .map(|(i, &level)| {
                meter.set_level(level);
                let secs = (i as f64 * f64::from(self.interval_ms)) / 1000.0;
                format!("{:>8.2}s {}\n", secs, meter.render(width))
            })
            .collect()
    }
}

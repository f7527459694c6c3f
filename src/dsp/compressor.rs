//! Feed-forward bus compressor.
//!
//! A peak envelope follower with separate attack and release smoothing drives a
//! hard-knee gain computer. The gain is applied to the dry sample together with
//! the makeup gain.

use serde::{Deserialize, Serialize};

use crate::dsp::stats::GainReductionStats;
use crate::error::{CompressorError, Result};

pub const THRESHOLD_DB_RANGE: (f32, f32) = (-60.0, 0.0);
pub const RATIO_RANGE: (f32, f32) = (1.0, 20.0);
pub const ATTACK_MS_RANGE: (f32, f32) = (1.0, 100.0);
pub const RELEASE_MS_RANGE: (f32, f32) = (10.0, 1000.0);
pub const MAKEUP_GAIN_DB_RANGE: (f32, f32) = (-12.0, 12.0);

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// User-facing compressor controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorParams {
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
    pub makeup_gain_db: f32,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            threshold_db: -10.0,
            ratio: 4.0,
            attack_ms: 10.0,
            release_ms: 300.0,
            makeup_gain_db: 0.0,
        }
    }
}

impl CompressorParams {
    /// Checks every control against its allowed range.
    pub fn validate(&self) -> Result<()> {
        check_range("threshold_db", self.threshold_db, THRESHOLD_DB_RANGE)?;
        check_range("ratio", self.ratio, RATIO_RANGE)?;
        check_range("attack_ms", self.attack_ms, ATTACK_MS_RANGE)?;
        check_range("release_ms", self.release_ms, RELEASE_MS_RANGE)?;
        check_range("makeup_gain_db", self.makeup_gain_db, MAKEUP_GAIN_DB_RANGE)?;
        Ok(())
    }
}

fn check_range(name: &'static str, value: f32, (min, max): (f32, f32)) -> Result<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(CompressorError::InvalidParameter {
            name,
            value,
            min,
            max,
        })
    }
}

/// Converts decibels to a linear amplitude factor.
pub fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Converts a linear amplitude factor to decibels. Zero maps to negative infinity.
pub fn linear_to_db(linear: f32) -> f32 {
    20.0 * linear.log10()
}

/// One-pole smoothing coefficient for a time constant in milliseconds.
fn time_coeff(ms: f32, sample_rate: u32) -> f32 {
    (-1.0 / (0.001 * ms * sample_rate as f32)).exp()
}

#[derive(Debug, Clone)]
pub struct BusCompressor {
    sample_rate: u32,
    params: CompressorParams,
    threshold: f32,
    attack_coeff: f32,
    release_coeff: f32,
    makeup_gain: f32,
    envelope: f32,
    last_gain_reduction_db: f32,
}

impl BusCompressor {
    pub fn new(sample_rate: u32, params: CompressorParams) -> Result<Self> {
        if sample_rate == 0 {
            return Err(CompressorError::InvalidSampleRate(sample_rate));
        }
        params.validate()?;

        let mut compressor = Self {
            sample_rate,
            params,
            threshold: 1.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            makeup_gain: 1.0,
            envelope: 0.0,
            last_gain_reduction_db: 0.0,
        };
        compressor.derive();
        Ok(compressor)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn params(&self) -> &CompressorParams {
        &self.params
    }

    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    /// Gain reduction in dB applied to the most recent sample (0 when below threshold).
    pub fn gain_reduction_db(&self) -> f32 {
        self.last_gain_reduction_db
    }

    /// Replaces the controls and resets the detector.
    pub fn set_params(&mut self, params: CompressorParams) -> Result<()> {
        params.validate()?;
        self.params = params;
        self.derive();
        Ok(())
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) -> Result<()> {
        if sample_rate == 0 {
            return Err(CompressorError::InvalidSampleRate(sample_rate));
        }
        self.sample_rate = sample_rate;
        self.derive();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
        self.last_gain_reduction_db = 0.0;
    }

    fn derive(&mut self) {
        self.threshold = db_to_linear(self.params.threshold_db);
        self.attack_coeff = time_coeff(self.params.attack_ms, self.sample_rate);
        self.release_coeff = time_coeff(self.params.release_ms, self.sample_rate);
        self.makeup_gain = db_to_linear(self.params.makeup_gain_db);
        self.reset();
    }

    /// Advances the detector with a rectified level and returns the gain to apply
    /// (without makeup).
    fn detect(&mut self, level: f32) -> f32 {
        let coeff = if level > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = coeff * (self.envelope - level) + level;

        if self.envelope > self.threshold {
            let reduction_db =
                linear_to_db(self.envelope / self.threshold) * (1.0 - 1.0 / self.params.ratio);
            self.last_gain_reduction_db = reduction_db;
            db_to_linear(-reduction_db)
        } else {
            self.last_gain_reduction_db = 0.0;
            1.0
        }
    }

    pub fn process_sample(&mut self, x: f32) -> f32 {
        let gain = self.detect(x.abs());
        x * gain * self.makeup_gain
    }

    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        input.iter().map(|&x| self.process_sample(x)).collect()
    }

    pub fn process_in_place(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    /// Processes interleaved audio with one detector shared by all channels.
    ///
    /// The detector sees the loudest channel of each frame; every channel of the
    /// frame receives the same gain so the stereo image does not shift. A
    /// trailing partial frame is processed as a frame of its own.
    pub fn process_interleaved(&mut self, samples: &mut [f32], channels: u16) {
        let width = usize::from(channels.max(1));
        for frame in samples.chunks_mut(width) {
            self.process_frame(frame);
        }
    }

    fn process_frame(&mut self, frame: &mut [f32]) {
        let level = frame.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        let gain = self.detect(level) * self.makeup_gain;
        for sample in frame.iter_mut() {
            *sample *= gain;
        }
    }

    /// Processes a buffer while collecting gain reduction statistics.
    pub fn process_with_stats(&mut self, input: &[f32]) -> (Vec<f32>, GainReductionStats) {
        let mut stats = GainReductionStats::accumulator();
        let output = input
            .iter()
            .map(|&x| {
                let y = self.process_sample(x);
                stats.push(self.last_gain_reduction_db);
                y
            })
            .collect();
        (output, stats.finish())
    }

    /// Interleaved variant of [`process_with_stats`](Self::process_with_stats); one
    /// observation per frame.
    pub fn process_interleaved_with_stats(
        &mut self,
        samples: &mut [f32],
        channels: u16,
    ) -> GainReductionStats {
        let mut stats = GainReductionStats::accumulator();
        let width = usize::from(channels.max(1));
        for frame in samples.chunks_mut(width) {
            self.process_frame(frame);
            stats.push(self.last_gain_reduction_db);
        }
        stats.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compressor(params: CompressorParams) -> BusCompressor {
        BusCompressor::new(DEFAULT_SAMPLE_RATE, params).unwrap()
    }

    #[test]
    fn test_default_params_are_valid() {
        assert!(CompressorParams::default().validate().is_ok());
    }

    #[test]
    fn test_out_of_range_params_rejected() {
        let params = CompressorParams {
            ratio: 0.5,
            ..Default::default()
        };
        match params.validate() {
            Err(CompressorError::InvalidParameter { name, .. }) => assert_eq!(name, "ratio"),
            other => panic!("expected ratio error, got {:?}", other),
        }

        let params = CompressorParams {
            threshold_db: f32::NAN,
            ..Default::default()
        };
        assert!(params.validate().is_err());

        let params = CompressorParams {
            release_ms: 5.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        assert!(matches!(
            BusCompressor::new(0, CompressorParams::default()),
            Err(CompressorError::InvalidSampleRate(0))
        ));
        let mut comp = compressor(CompressorParams::default());
        assert!(comp.set_sample_rate(0).is_err());
        assert_eq!(comp.sample_rate(), DEFAULT_SAMPLE_RATE);
    }

    #[test]
    fn test_silence_stays_silent() {
        let mut comp = compressor(CompressorParams::default());
        let out = comp.process(&[0.0; 512]);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(comp.gain_reduction_db(), 0.0);
    }

    #[test]
    fn test_below_threshold_passes_through() {
        let mut comp = compressor(CompressorParams::default());
        // -10 dB threshold is ~0.316; 0.1 never gets there
        let input: Vec<f32> = (0..1000).map(|i| if i % 2 == 0 { 0.1 } else { -0.1 }).collect();
        let out = comp.process(&input);
        assert_eq!(out, input);
    }

    #[test]
    fn test_unity_ratio_applies_only_makeup() {
        let mut comp = compressor(CompressorParams {
            ratio: 1.0,
            makeup_gain_db: 6.0,
            ..Default::default()
        });
        let makeup = db_to_linear(6.0);
        let out = comp.process(&[0.9, -0.9, 0.5]);
        for (y, x) in out.iter().zip([0.9f32, -0.9, 0.5]) {
            assert!((y - x * makeup).abs() < 1e-6);
        }
    }

    #[test]
    fn test_loud_signal_is_reduced() {
        let mut comp = compressor(CompressorParams {
            threshold_db: -20.0,
            ratio: 10.0,
            attack_ms: 1.0,
            ..Default::default()
        });
        let input = vec![1.0f32; 4410];
        let out = comp.process(&input);

        let last = *out.last().unwrap();
        assert!(last < 0.5, "steady loud signal should be attenuated, got {}", last);
        assert!(comp.gain_reduction_db() > 10.0);
        assert!(out.iter().all(|&s| s <= 1.0));
    }

    #[test]
    fn test_steady_state_matches_static_curve() {
        let params = CompressorParams {
            threshold_db: -20.0,
            ratio: 4.0,
            attack_ms: 1.0,
            ..Default::default()
        };
        let mut comp = compressor(params);
        // Constant input converges the envelope to the input level
        let out = comp.process(&vec![0.5f32; 44_100]);
        let input_db = linear_to_db(0.5);
        let expected_db = -20.0 + (input_db + 20.0) / 4.0;
        let actual_db = linear_to_db(*out.last().unwrap());
        assert!((actual_db - expected_db).abs() < 0.05, "{} vs {}", actual_db, expected_db);
    }

    #[test]
    fn test_envelope_follows_attack_then_release() {
        let mut comp = compressor(CompressorParams::default());
        comp.process_sample(1.0);
        let after_attack = comp.envelope();
        assert!(after_attack > 0.0 && after_attack < 1.0);

        comp.process_sample(0.0);
        let after_release = comp.envelope();
        assert!(after_release < after_attack);
        assert!(after_release > 0.0);
    }

    #[test]
    fn test_set_params_resets_envelope() {
        let mut comp = compressor(CompressorParams::default());
        comp.process(&[1.0; 100]);
        assert!(comp.envelope() > 0.0);
        comp.set_params(CompressorParams::default()).unwrap();
        assert_eq!(comp.envelope(), 0.0);
    }

    #[test]
    fn test_invalid_set_params_keeps_previous_state() {
        let mut comp = compressor(CompressorParams::default());
        let bad = CompressorParams {
            attack_ms: 0.0,
            ..Default::default()
        };
        assert!(comp.set_params(bad).is_err());
        assert_eq!(comp.params(), &CompressorParams::default());
    }

    #[test]
    fn test_process_in_place_matches_process() {
        let input: Vec<f32> = (0..2048).map(|i| ((i as f32) * 0.05).sin()).collect();
        let mut a = compressor(CompressorParams::default());
        let mut b = compressor(CompressorParams::default());

        let expected = a.process(&input);
        let mut actual = input.clone();
        b.process_in_place(&mut actual);
        assert_eq!(expected, actual);
    }

    #[test]
    fn test_interleaved_applies_same_gain_per_frame() {
        let mut comp = compressor(CompressorParams {
            threshold_db: -20.0,
            ratio: 8.0,
            ..Default::default()
        });
        let mut samples: Vec<f32> = std::iter::repeat([0.9f32, 0.3]).take(2000).flatten().collect();
        comp.process_interleaved(&mut samples, 2);

        for frame in samples.chunks(2) {
            assert!((frame[0] / 0.9 - frame[1] / 0.3).abs() < 1e-5);
        }
        assert!(samples[samples.len() - 2] < 0.9);
    }

    #[test]
    fn test_interleaved_mono_matches_process() {
        let input: Vec<f32> = (0..1024).map(|i| ((i as f32) * 0.1).sin() * 0.9).collect();
        let mut a = compressor(CompressorParams::default());
        let mut b = compressor(CompressorParams::default());

        let expected = a.process(&input);
        let mut actual = input.clone();
        b.process_interleaved(&mut actual, 1);
        for (x, y) in expected.iter().zip(&actual) {
            assert!((x - y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_set_sample_rate_resets_and_rederives() {
        let params = CompressorParams {
            threshold_db: -20.0,
            ..Default::default()
        };
        let input: Vec<f32> = (0..4800).map(|i| ((i as f32) * 0.07).sin() * 0.8).collect();

        let mut comp = compressor(params);
        comp.process(&input);
        assert!(comp.envelope() > 0.0);
        assert!(comp.gain_reduction_db() > 0.0);

        comp.set_sample_rate(48_000).unwrap();
        assert_eq!(comp.sample_rate(), 48_000);
        assert_eq!(comp.envelope(), 0.0);
        assert_eq!(comp.gain_reduction_db(), 0.0);

        // Behaves exactly like a compressor built at the new rate
        let mut fresh = BusCompressor::new(48_000, params).unwrap();
        assert_eq!(comp.process(&input), fresh.process(&input));

        // Different rate means different time constants
        let mut at_44k = compressor(params);
        let mut at_48k = BusCompressor::new(48_000, params).unwrap();
        assert_ne!(at_44k.process(&input), at_48k.process(&input));
    }

    #[test]
    fn test_interleaved_partial_trailing_frame() {
        let params = CompressorParams {
            threshold_db: -20.0,
            ..Default::default()
        };
        // Two full stereo frames plus one lone sample
        let mut samples = vec![0.9f32; 5];
        let mut comp = compressor(params);
        comp.process_interleaved(&mut samples, 2);

        let mut mono = compressor(params);
        let expected = mono.process(&[0.9, 0.9, 0.9]);

        assert_eq!(samples.len(), 5);
        assert!((samples[0] - expected[0]).abs() < 1e-7);
        assert!((samples[1] - expected[0]).abs() < 1e-7);
        assert!((samples[2] - expected[1]).abs() < 1e-7);
        assert!((samples[3] - expected[1]).abs() < 1e-7);
        assert!((samples[4] - expected[2]).abs() < 1e-7);
    }

    #[test]
    fn test_interleaved_stats_match_plain_interleaved() {
        let input: Vec<f32> = (0..2000).map(|i| ((i as f32) * 0.03).sin() * 0.95).collect();
        let mut a = compressor(CompressorParams::default());
        let mut b = compressor(CompressorParams::default());

        let mut plain = input.clone();
        a.process_interleaved(&mut plain, 2);
        let mut with_stats = input.clone();
        let stats = b.process_interleaved_with_stats(&mut with_stats, 2);

        assert_eq!(plain, with_stats);
        assert!(stats.max_db > 0.0);
    }

    #[test]
    fn test_process_with_stats_reports_reduction() {
        let mut comp = compressor(CompressorParams {
            threshold_db: -30.0,
            ..Default::default()
        });
        let (out, stats) = comp.process_with_stats(&vec![0.8f32; 8000]);
        assert_eq!(out.len(), 8000);
        assert!(stats.max_db > 0.0);
        assert!(stats.mean_db > 0.0 && stats.mean_db <= stats.max_db);
        assert!(stats.compressed_fraction > 0.9);
    }
}

use serde::{Deserialize, Serialize};

use crate::dsp::compressor::{linear_to_db, CompressorParams};
use crate::dsp::meter::MeterTrack;

/// Summary of how hard the compressor worked over a buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GainReductionStats {
    /// Deepest reduction observed, in dB (positive numbers mean attenuation).
    pub max_db: f32,
    /// Mean reduction over the samples that were actually compressed.
    pub mean_db: f32,
    /// Share of samples with any reduction, 0.0 to 1.0.
    pub compressed_fraction: f32,
}

impl GainReductionStats {
    pub(crate) fn accumulator() -> GainReductionAccumulator {
        GainReductionAccumulator::default()
    }
}

#[derive(Debug, Default)]
pub(crate) struct GainReductionAccumulator {
    count: usize,
    compressed: usize,
    sum_db: f64,
    max_db: f32,
}

impl GainReductionAccumulator {
    pub(crate) fn push(&mut self, reduction_db: f32) {
        self.count += 1;
        if reduction_db > 0.0 {
            self.compressed += 1;
            self.sum_db += f64::from(reduction_db);
            self.max_db = self.max_db.max(reduction_db);
        }
    }

    pub(crate) fn finish(self) -> GainReductionStats {
        if self.count == 0 {
            return GainReductionStats::default();
        }
        let mean_db = if self.compressed > 0 {
            (self.sum_db / self.compressed as f64) as f32
        } else {
            0.0
        };
        GainReductionStats {
            max_db: self.max_db,
            mean_db,
            compressed_fraction: self.compressed as f32 / self.count as f32,
        }
    }
}

/// Level statistics of a sample buffer.
///
/// The dBFS fields of a silent buffer are negative infinity; JSON carries them
/// as the string `"-inf"`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalStats {
    pub peak: f32,
    #[serde(with = "dbfs")]
    pub peak_dbfs: f32,
    pub rms: f32,
    #[serde(with = "dbfs")]
    pub rms_dbfs: f32,
}

impl Default for SignalStats {
    fn default() -> Self {
        Self::from_levels(0.0, 0.0)
    }
}

impl SignalStats {
    pub fn from_samples(samples: &[f32]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        let sum_sq: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
        let rms = (sum_sq / samples.len() as f64).sqrt() as f32;
        Self::from_levels(peak, rms)
    }

    fn from_levels(peak: f32, rms: f32) -> Self {
        Self {
            peak,
            peak_dbfs: linear_to_db(peak),
            rms,
            rms_dbfs: linear_to_db(rms),
        }
    }
}

mod dbfs {
    use serde::{Deserialize, Deserializer, Serializer};

    const NEG_INF: &str = "-inf";

    pub fn serialize<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f32(*value)
        } else {
            serializer.serialize_str(NEG_INF)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f32),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) if text == NEG_INF => Ok(f32::NEG_INFINITY),
            Repr::Text(text) => Err(serde::de::Error::custom(format!(
                "expected a dB value or \"{}\", got \"{}\"",
                NEG_INF, text
            ))),
        }
    }
}

/// Formats a dBFS value, spelling out silence.
pub fn format_db(db: f32) -> String {
    if db.is_finite() {
        format!("{:.2} dB", db)
    } else {
        "-inf dB".to_string()
    }
}

/// Everything `analyze` reports about one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub file: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_secs: f64,
    pub params: CompressorParams,
    pub input: SignalStats,
    pub output: SignalStats,
    pub gain_reduction: GainReductionStats,
    pub meter: MeterTrack,
}

impl Analysis {
    /// Human-readable report, as printed by the CLI.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("File: {}\n", self.file));
        out.push_str(&format!(
            "  Sample rate: {} Hz | Channels: {} | Duration: {:.2}s\n",
            self.sample_rate, self.channels, self.duration_secs
        ));
        out.push_str(&format!(
            "  Settings: threshold {} | ratio {:.1}:1 | attack {:.0} ms | release {:.0} ms | makeup {}\n",
            format_db(self.params.threshold_db),
            self.params.ratio,
            self.params.attack_ms,
            self.params.release_ms,
            format_db(self.params.makeup_gain_db)
        ));
        out.push_str(&format!(
            "  Input:  peak {} | rms {}\n",
            format_db(self.input.peak_dbfs),
            format_db(self.input.rms_dbfs)
        ));
        out.push_str(&format!(
            "  Output: peak {} | rms {}\n",
            format_db(self.output.peak_dbfs),
            format_db(self.output.rms_dbfs)
        ));
        out.push_str(&format!(
            "  Gain reduction: max {:.2} dB | mean {:.2} dB | {:.1}% of samples\n",
            self.gain_reduction.max_db,
            self.gain_reduction.mean_db,
            self.gain_reduction.compressed_fraction * 100.0
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_empty() {
        let stats = GainReductionStats::accumulator().finish();
        assert_eq!(stats, GainReductionStats::default());
    }

    #[test]
    fn test_accumulator_mixed() {
        let mut acc = GainReductionStats::accumulator();
        for db in [0.0, 2.0, 4.0, 0.0] {
            acc.push(db);
        }
        let stats = acc.finish();
        assert_eq!(stats.max_db, 4.0);
        assert_eq!(stats.mean_db, 3.0);
        assert_eq!(stats.compressed_fraction, 0.5);
    }

    #[test]
    fn test_signal_stats() {
        let stats = SignalStats::from_samples(&[0.5, -0.5, 0.5, -0.5]);
        assert_eq!(stats.peak, 0.5);
        assert!((stats.rms - 0.5).abs() < 1e-6);
        assert!((stats.peak_dbfs + 6.0206).abs() < 1e-3);
        assert!((stats.rms_dbfs + 6.0206).abs() < 1e-3);
    }

    #[test]
    fn test_silence_is_negative_infinity() {
        let stats = SignalStats::from_samples(&[0.0; 16]);
        assert_eq!(stats.peak_dbfs, f32::NEG_INFINITY);
        assert_eq!(format_db(stats.rms_dbfs), "-inf dB");
        assert_eq!(SignalStats::default(), stats);
    }

    #[test]
    fn test_dbfs_json_fields() {
        let loud = serde_json::to_value(SignalStats::from_samples(&[0.5, -0.5])).unwrap();
        assert!((loud["peak_dbfs"].as_f64().unwrap() + 6.0206).abs() < 1e-3);
        assert!(loud["rms_dbfs"].is_number());

        let silent = serde_json::to_value(SignalStats::from_samples(&[0.0; 4])).unwrap();
        assert_eq!(silent["peak_dbfs"], "-inf");
        assert_eq!(silent["rms_dbfs"], "-inf");

        let back: SignalStats = serde_json::from_value(silent).unwrap();
        assert_eq!(back.peak_dbfs, f32::NEG_INFINITY);
        assert!(serde_json::from_str::<SignalStats>(
            r#"{"peak":0.0,"peak_dbfs":"loud","rms":0.0,"rms_dbfs":0.0}"#
        )
        .is_err());
    }
}

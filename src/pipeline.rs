//! Single-file processing: load, compress, and report.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::audio::{wav, SoundData};
use crate::config::{ChannelMode, Preset};
use crate::dsp::{Analysis, BusCompressor, GainReductionStats, MeterTrack, SignalStats};
use crate::error::Result;

/// Result of compressing one buffer.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub sound: SoundData,
    pub gain_reduction: GainReductionStats,
}

/// Compresses decoded audio according to the preset's channel mode.
pub fn compress_sound(sound: &SoundData, preset: &Preset) -> Result<Rendered> {
    let mut compressor = BusCompressor::new(sound.sample_rate, preset.compressor)?;

    let (sound, gain_reduction) = match preset.channel_mode {
        ChannelMode::Mono => {
            let mono = sound.to_mono();
            let (samples, stats) = compressor.process_with_stats(&mono.samples);
            (SoundData::new(samples, 1, mono.sample_rate), stats)
        }
        ChannelMode::Linked => {
            let mut out = sound.clone();
            let stats = compressor.process_interleaved_with_stats(&mut out.samples, out.channels);
            (out, stats)
        }
    };

    Ok(Rendered {
        sound,
        gain_reduction,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub frames: usize,
    pub duration_secs: f64,
    pub gain_reduction: GainReductionStats,
}

/// Loads `input`, compresses it, and writes the result to `output`.
pub fn process_file(input: &Path, output: &Path, preset: &Preset) -> Result<FileReport> {
    let sound = wav::load(input)?;
    let rendered = compress_sound(&sound, preset)?;
    wav::save(output, &rendered.sound, preset.output.bit_depth)?;

    tracing::info!(
        "Compressed {} -> {} (max reduction {:.2} dB)",
        input.display(),
        output.display(),
        rendered.gain_reduction.max_db
    );

    Ok(FileReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        frames: rendered.sound.frames(),
        duration_secs: rendered.sound.duration_secs(),
        gain_reduction: rendered.gain_reduction,
    })
}

/// Compresses `input` in memory and measures before and after.
pub fn analyze_file(input: &Path, preset: &Preset, meter_interval_ms: u32) -> Result<Analysis> {
    let sound = wav::load(input)?;
    let rendered = compress_sound(&sound, preset)?;
    let source = match preset.channel_mode {
        ChannelMode::Mono => sound.to_mono(),
        ChannelMode::Linked => sound.clone(),
    };

    // The meter follows playback, which is always mono downmixed
    let meter_signal = rendered.sound.to_mono();
    let meter = MeterTrack::from_samples(
        &meter_signal.samples,
        meter_signal.sample_rate,
        meter_interval_ms,
    );

    Ok(Analysis {
        file: input.display().to_string(),
        sample_rate: sound.sample_rate,
        channels: rendered.sound.channels,
        duration_secs: sound.duration_secs(),
        params: preset.compressor,
        input: SignalStats::from_samples(&source.samples),
        output: SignalStats::from_samples(&rendered.sound.samples),
        gain_reduction: rendered.gain_reduction,
        meter,
    })
}

/// Suffix of every file written by a batch run.
pub const OUTPUT_SUFFIX: &str = ".compressed.wav";

/// True for files a batch run produced, so directory walks can skip them.
pub fn is_rendered_output(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase().ends_with(OUTPUT_SUFFIX))
        .unwrap_or(false)
}

fn input_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

/// Default output location for a batch input: `<stem>.compressed.wav`.
pub fn output_path_for(input: &Path, out_dir: Option<&Path>) -> PathBuf {
    let file_name = format!("{}{}", input_stem(input), OUTPUT_SUFFIX);
    match out_dir {
        Some(dir) => dir.join(file_name),
        None => input.with_file_name(file_name),
    }
}

/// Assigns every input a distinct output path.
///
/// Inputs whose default outputs collide (same stem into one `out_dir`) get the
/// parent directory name as a prefix, then a numeric suffix if that still
/// collides: `y_mix.compressed.wav`, `mix-2.compressed.wav`.
pub fn plan_outputs(inputs: &[PathBuf], out_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut taken = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let base = output_path_for(input, out_dir);
            let stem = input_stem(input);
            let mut candidate = base.clone();

            if taken.contains(&candidate) {
                if let Some(parent) = input.parent().and_then(|p| p.file_name()) {
                    candidate = base.with_file_name(format!(
                        "{}_{}{}",
                        parent.to_string_lossy(),
                        stem,
                        OUTPUT_SUFFIX
                    ));
                }
            }
            let mut counter = 2;
            while taken.contains(&candidate) {
                candidate = base.with_file_name(format!("{}-{}{}", stem, counter, OUTPUT_SUFFIX));
                counter += 1;
            }

            if candidate != base {
                tracing::debug!(
                    "Output for {} renamed to {} to avoid a collision",
                    input.display(),
                    candidate.display()
                );
            }
            taken.insert(candidate.clone());
            candidate
        })
        .collect()
}

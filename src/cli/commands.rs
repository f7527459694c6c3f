use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use bus_compressor::audio::{AudioWalker, BitDepth};
use bus_compressor::batch::{process_batch, BatchProgress, BatchReport};
use bus_compressor::config::{ChannelMode, ParamOverrides, Preset};
use bus_compressor::error::{CompressorError, Result};
use bus_compressor::pipeline::{analyze_file, process_file};

#[derive(Parser)]
#[command(name = "bus-compressor")]
#[command(about = "Bus-style dynamic range compressor for WAV audio")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Compress a file with the default settings
    bus-compressor process mix.wav -o mix.glued.wav

    # Heavier compression with makeup gain
    bus-compressor process mix.wav --threshold -20 --ratio 8 --makeup 4

    # Compress every WAV under a directory into out/
    bus-compressor process ./stems --out-dir out

    # Show levels, gain reduction and the VU meter timeline
    bus-compressor analyze mix.wav --format json

    # Write the default preset, edit it, then use it
    bus-compressor preset -o glue.toml
    bus-compressor --preset glue.toml process mix.wav
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Preset file (TOML) with compressor settings
    #[arg(long, global = true)]
    pub preset: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compress one or more WAV files (directories are searched recursively)
    Process {
        /// Input files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file (single input only)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory for outputs; defaults to next to each input
        #[arg(long)]
        out_dir: Option<PathBuf>,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Compress in memory and report levels, gain reduction and meter readings
    Analyze {
        /// Input WAV file
        input: PathBuf,

        /// Output format
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,

        /// Meter refresh interval in milliseconds
        #[arg(long, default_value = "50")]
        meter_interval: u32,

        /// Width of the meter bars in text output
        #[arg(long, default_value = "40")]
        meter_width: usize,

        /// Skip the meter timeline in text output
        #[arg(long)]
        no_meter: bool,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Compress and play through the default output device
    Play {
        /// Input WAV file
        input: PathBuf,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Print the effective preset as TOML
    Preset {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        params: ParamArgs,
    },
}

/// Compressor controls that override the preset.
#[derive(Args, Debug, Clone, Default)]
pub struct ParamArgs {
    /// Threshold in dB (-60 to 0)
    #[arg(long, allow_hyphen_values = true)]
    pub threshold: Option<f32>,

    /// Compression ratio (1 to 20)
    #[arg(long)]
    pub ratio: Option<f32>,

    /// Attack time in milliseconds (1 to 100)
    #[arg(long)]
    pub attack: Option<f32>,

    /// Release time in milliseconds (10 to 1000)
    #[arg(long)]
    pub release: Option<f32>,

    /// Makeup gain in dB (-12 to 12)
    #[arg(long, allow_hyphen_values = true)]
    pub makeup: Option<f32>,

    /// Channel handling: mono (downmix) or linked
    #[arg(long, value_parser = parse_channel_mode)]
    pub channels: Option<ChannelMode>,

    /// Output sample format: 16 or 32 (float)
    #[arg(long, value_parser = parse_bit_depth)]
    pub bit_depth: Option<BitDepth>,
}

impl ParamArgs {
    fn overrides(&self) -> ParamOverrides {
        ParamOverrides {
            threshold_db: self.threshold,
            ratio: self.ratio,
            attack_ms: self.attack,
            release_ms: self.release,
            makeup_gain_db: self.makeup,
            channel_mode: self.channels,
            bit_depth: self.bit_depth,
        }
    }
}

fn parse_channel_mode(s: &str) -> std::result::Result<ChannelMode, String> {
    ChannelMode::from_str(s).ok_or_else(|| format!("unknown channel mode '{}' (mono, linked)", s))
}

fn parse_bit_depth(s: &str) -> std::result::Result<BitDepth, String> {
    BitDepth::from_str(s).ok_or_else(|| format!("unsupported bit depth '{}' (16, 32)", s))
}

/// Merges the preset file (if any) with command-line overrides.
pub fn resolve_preset(preset_path: Option<&Path>, params: &ParamArgs) -> Result<Preset> {
    Preset::load_or_default(preset_path)?.with_overrides(&params.overrides())
}

pub fn process(
    inputs: &[PathBuf],
    output: Option<&Path>,
    out_dir: Option<&Path>,
    preset: &Preset,
) -> Result<BatchReport> {
    let walker = AudioWalker::new();
    let files = walker.collect(inputs)?;

    if let Some(output) = output {
        if files.len() != 1 {
            return Err(CompressorError::InvalidArgument(format!(
                "--output needs exactly one input file, found {}",
                files.len()
            )));
        }
        let report = process_file(&files[0], output, preset)?;
        println!(
            "Wrote {} ({} frames, max reduction {:.2} dB)",
            report.output.display(),
            report.frames,
            report.gain_reduction.max_db
        );
        return Ok(BatchReport {
            processed: vec![report],
            failed: Vec::new(),
        });
    }

    if files.is_empty() {
        println!("No WAV files found");
        return Ok(BatchReport::default());
    }
    println!("Found {} files to process", files.len());

    let progress = BatchProgress::new(files.len());
    let bar = ProgressBar::new(files.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let report = std::thread::scope(|scope| {
        let worker = scope.spawn(|| process_batch(&files, out_dir, preset, &progress));
        while !worker.is_finished() {
            let snap = progress.snapshot();
            bar.set_position(snap.files_handled() as u64);
            bar.set_message(snap.status());
            std::thread::sleep(Duration::from_millis(100));
        }
        worker
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
    });
    bar.finish_and_clear();

    let snap = progress.snapshot();
    println!(
        "Processed {} files ({:.1}s of audio) in {:.2}s",
        report.processed.len(),
        snap.audio_secs,
        snap.elapsed.as_secs_f64()
    );
    for failed in &report.failed {
        eprintln!("Error processing {}: {}", failed.input.display(), failed.error);
    }

    Ok(report)
}

pub fn analyze(
    input: &Path,
    preset: &Preset,
    format: &str,
    meter_interval: u32,
    meter_width: usize,
    show_meter: bool,
) -> Result<()> {
    let analysis = analyze_file(input, preset, meter_interval.max(1))?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&analysis)?),
        _ => {
            print!("{}", analysis.to_text());
            println!(
                "  Meter peak: {:.0}% ({} readings every {} ms)",
                analysis.meter.peak() * 100.0,
                analysis.meter.levels.len(),
                analysis.meter.interval_ms
            );
            if show_meter && !analysis.meter.levels.is_empty() {
                println!();
                print!("{}", analysis.meter.render(meter_width));
            }
        }
    }

    Ok(())
}

#[cfg(feature = "playback")]
pub fn play(input: &Path, preset: &Preset) -> Result<()> {
    use std::sync::Arc;

    use bus_compressor::audio::{playback, wav};
    use bus_compressor::dsp::VuMeter;
    use bus_compressor::pipeline::compress_sound;

    let sound = wav::load(input)?;
    let rendered = compress_sound(&sound, preset)?;
    let mono = rendered.sound.to_mono();
    println!(
        "Loaded: {} | Sample Rate: {} Hz | {:.2}s",
        input.display(),
        mono.sample_rate,
        mono.duration_secs()
    );

    let bar = ProgressBar::new_spinner();
    let mut meter = VuMeter::new();
    playback::play(Arc::new(mono.samples), mono.sample_rate, |level| {
        meter.set_level(level);
        bar.set_message(meter.render(40));
        bar.tick();
    })?;
    bar.finish_and_clear();

    Ok(())
}

#[cfg(not(feature = "playback"))]
pub fn play(_input: &Path, _preset: &Preset) -> Result<()> {
    Err(CompressorError::Playback(
        "this build has no audio output; rebuild with `--features playback`".into(),
    ))
}

pub fn write_preset(preset: &Preset, output: Option<&Path>) -> Result<()> {
    let text = preset.to_toml()?;
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
            println!("Preset written to {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}

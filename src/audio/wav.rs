//! WAV decoding and encoding on top of `hound`.

use std::io::{Read, Seek, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::audio::SoundData;
use crate::error::{CompressorError, Result};

/// Sample encoding used when writing WAV files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitDepth {
    /// 16-bit signed PCM
    Int16,
    /// 32-bit IEEE float
    #[default]
    Float32,
}

impl BitDepth {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "16" | "int16" | "pcm16" => Some(BitDepth::Int16),
            "32" | "float" | "float32" | "f32" => Some(BitDepth::Float32),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BitDepth::Int16 => "int16",
            BitDepth::Float32 => "float32",
        }
    }

    fn spec(&self, channels: u16, sample_rate: u32) -> hound::WavSpec {
        match self {
            BitDepth::Int16 => hound::WavSpec {
                channels,
                sample_rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            },
            BitDepth::Float32 => hound::WavSpec {
                channels,
                sample_rate,
                bits_per_sample: 32,
                sample_format: hound::SampleFormat::Float,
            },
        }
    }
}

pub fn load(path: &Path) -> Result<SoundData> {
    if !path.exists() {
        return Err(CompressorError::FileNotFound(path.display().to_string()));
    }
    let reader = hound::WavReader::open(path)?;
    let sound = read_samples(reader)?;
    tracing::debug!(
        "Loaded {} ({} Hz, {} channels, {} frames)",
        path.display(),
        sound.sample_rate,
        sound.channels,
        sound.frames()
    );
    Ok(sound)
}

pub fn decode<R: Read>(reader: R) -> Result<SoundData> {
    read_samples(hound::WavReader::new(reader)?)
}

fn read_samples<R: Read>(mut reader: hound::WavReader<R>) -> Result<SoundData> {
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(CompressorError::UnsupportedFormat(
            "WAV header declares zero channels".to_string(),
        ));
    }

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(CompressorError::UnsupportedFormat(format!(
                    "{}-bit integer samples",
                    spec.bits_per_sample
                )));
            }
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|s| s as f32 / max_value))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    Ok(SoundData::new(samples, spec.channels, spec.sample_rate))
}

pub fn save(path: &Path, sound: &SoundData, bit_depth: BitDepth) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let writer = hound::WavWriter::create(path, bit_depth.spec(sound.channels, sound.sample_rate))?;
    write_samples(writer, sound, bit_depth)?;
    tracing::debug!("Wrote {} ({})", path.display(), bit_depth.as_str());
    Ok(())
}

pub fn encode<W: Write + Seek>(writer: W, sound: &SoundData, bit_depth: BitDepth) -> Result<()> {
    let writer =
        hound::WavWriter::new(writer, bit_depth.spec(sound.channels, sound.sample_rate))?;
    write_samples(writer, sound, bit_depth)
}

fn write_samples<W: Write + Seek>(
    mut writer: hound::WavWriter<W>,
    sound: &SoundData,
    bit_depth: BitDepth,
) -> Result<()> {
    match bit_depth {
        BitDepth::Int16 => {
            for &sample in &sound.samples {
                writer.write_sample(to_i16(sample))?;
            }
        }
        BitDepth::Float32 => {
            for &sample in &sound.samples {
                writer.write_sample(sample)?;
            }
        }
    }
    writer.finalize()?;
    Ok(())
}

/// Clips to full scale before quantizing.
fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16
}

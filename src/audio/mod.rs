pub mod walker;
pub mod wav;

#[cfg(feature = "playback")]
pub mod playback;

pub use walker::AudioWalker;
pub use wav::BitDepth;

/// Decoded audio, ready for processing.
///
/// Samples are interleaved `f32` in `[-1.0, 1.0]`; for stereo the order is
/// `[L, R, L, R, ...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundData {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl SoundData {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Averages the channels of every frame into a single channel.
    ///
    /// An incomplete trailing frame (a truncated file) is dropped.
    pub fn to_mono(&self) -> SoundData {
        if self.channels <= 1 {
            return self.clone();
        }
        let width = usize::from(self.channels);
        let samples = self
            .samples
            .chunks_exact(width)
            .map(|frame| frame.iter().sum::<f32>() / width as f32)
            .collect();
        SoundData::new(samples, 1, self.sample_rate)
    }
}

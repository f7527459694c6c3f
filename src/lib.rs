pub mod audio;
pub mod batch;
pub mod config;
pub mod dsp;
pub mod error;
pub mod pipeline;

pub use audio::{AudioWalker, BitDepth, SoundData};
pub use batch::{process_batch, BatchProgress, BatchReport, FailedFile, ProgressSnapshot};
pub use config::{ChannelMode, OutputSettings, ParamOverrides, Preset};
pub use dsp::{
    window_level, Analysis, BusCompressor, CompressorParams, GainReductionStats, MeterTrack,
    SignalStats, VuMeter,
};
pub use error::{CompressorError, Result};
pub use pipeline::{analyze_file, compress_sound, output_path_for, process_file, FileReport};

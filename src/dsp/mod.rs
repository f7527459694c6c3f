pub mod compressor;
pub mod meter;
pub mod stats;

pub use compressor::{
    db_to_linear, linear_to_db, BusCompressor, CompressorParams, DEFAULT_SAMPLE_RATE,
};
pub use meter::{window_level, MeterTrack, VuMeter, METER_INTERVAL_MS, METER_WINDOW};
pub use stats::{format_db, Analysis, GainReductionStats, SignalStats};

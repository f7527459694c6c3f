use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompressorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Preset parse error: {0}")]
    PresetParse(#[from] toml::de::Error),

    #[error("Preset serialize error: {0}")]
    PresetSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid parameter {name}: {value} (expected {min}..={max})")]
    InvalidParameter {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Playback error: {0}")]
    Playback(String),
}

pub type Result<T> = std::result::Result<T, CompressorError>;

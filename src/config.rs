//! Compressor presets stored as TOML.
//!
//! ```toml
//! name = "glue"
//! channel_mode = "mono"
//!
//! [compressor]
//! threshold_db = -18.0
//! ratio = 4.0
//! attack_ms = 10.0
//! release_ms = 300.0
//! makeup_gain_db = 3.0
//!
//! [output]
//! bit_depth = "float32"
//! ```
//!
//! Missing keys fall back to their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::audio::BitDepth;
use crate::dsp::CompressorParams;
use crate::error::{CompressorError, Result};

/// How multichannel input is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    /// Average all channels into one before compressing
    #[default]
    Mono,
    /// Keep channels; one detector drives all of them
    Linked,
}

impl ChannelMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mono" => Some(ChannelMode::Mono),
            "linked" | "stereo" => Some(ChannelMode::Linked),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelMode::Mono => "mono",
            ChannelMode::Linked => "linked",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub bit_depth: BitDepth,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub channel_mode: ChannelMode,
    pub compressor: CompressorParams,
    pub output: OutputSettings,
}

/// Per-invocation overrides; `None` keeps the preset value.
#[derive(Debug, Clone, Default)]
pub struct ParamOverrides {
    pub threshold_db: Option<f32>,
    pub ratio: Option<f32>,
    pub attack_ms: Option<f32>,
    pub release_ms: Option<f32>,
    pub makeup_gain_db: Option<f32>,
    pub channel_mode: Option<ChannelMode>,
    pub bit_depth: Option<BitDepth>,
}

impl Preset {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CompressorError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let preset = Self::from_toml(&content)?;
        tracing::debug!(
            "Loaded preset {} from {}",
            preset.name.as_deref().unwrap_or("<unnamed>"),
            path.display()
        );
        Ok(preset)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let preset: Preset = toml::from_str(content)?;
        preset.compressor.validate()?;
        Ok(preset)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Loads `path` when given, otherwise the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Applies CLI overrides and validates the merged controls.
    pub fn with_overrides(mut self, overrides: &ParamOverrides) -> Result<Self> {
        let params = &mut self.compressor;
        if let Some(v) = overrides.threshold_db {
            params.threshold_db = v;
        }
        if let Some(v) = overrides.ratio {
            params.ratio = v;
        }
        if let Some(v) = overrides.attack_ms {
            params.attack_ms = v;
        }
        if let Some(v) = overrides.release_ms {
            params.release_ms = v;
        }
        if let Some(v) = overrides.makeup_gain_db {
            params.makeup_gain_db = v;
        }
        if let Some(mode) = overrides.channel_mode {
            self.channel_mode = mode;
        }
        if let Some(depth) = overrides.bit_depth {
            self.output.bit_depth = depth;
        }
        self.compressor.validate()?;
        Ok(self)
    }
}

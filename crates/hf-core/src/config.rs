//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! sub-configs for external tools, ladder encoding, and playback. Every
//! section defaults sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::media::{default_ladder, RenditionSpec};
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub encode: EncodeConfig,
    pub playback: PlaybackConfig,
}

/// Frame rate assumed when comparing the GOP length against segment length.
const MIN_EXPECTED_FPS: u32 = 24;

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.encode.renditions.is_empty() {
            warnings.push("encode.renditions is empty; the default ladder will be used".into());
        }

        for (i, r) in self.encode.renditions.iter().enumerate() {
            if let Err(e) = r.validate() {
                warnings.push(format!("encode.renditions[{i}]: {e}"));
            }
        }

        if self.encode.segment_duration_secs == 0 {
            warnings.push("encode.segment_duration_secs is 0".into());
        }

        if self.encode.gop_size == 0 {
            warnings.push("encode.gop_size is 0".into());
        } else if self.encode.segment_duration_secs > 0
            && self.encode.gop_size > self.encode.segment_duration_secs * MIN_EXPECTED_FPS
        {
            warnings.push(format!(
                "encode.gop_size ({}) is longer than a {}s segment at {MIN_EXPECTED_FPS} fps",
                self.encode.gop_size, self.encode.segment_duration_secs
            ));
        }

        if self.playback.max_consecutive_fatal == 0 {
            warnings.push(
                "playback.max_consecutive_fatal is 0; every fatal fault will end the session"
                    .into(),
            );
        }

        let buffer = &self.playback.buffer;
        if buffer.max_buffer_secs > buffer.max_max_buffer_secs {
            warnings.push(format!(
                "playback.buffer.max_buffer_secs ({}) exceeds max_max_buffer_secs ({})",
                buffer.max_buffer_secs, buffer.max_max_buffer_secs
            ));
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// Ladder encoding and segmentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    /// Target HLS segment duration in seconds.
    #[serde(default = "default_segment_duration")]
    pub segment_duration_secs: u32,
    /// Fixed group-of-pictures length shared by every rendition.
    #[serde(default = "default_gop_size")]
    pub gop_size: u32,
    /// libx264 preset.
    #[serde(default = "default_video_preset")]
    pub video_preset: String,
    #[serde(default = "default_audio_sample_rate")]
    pub audio_sample_rate: u32,
    #[serde(default = "default_audio_channels")]
    pub audio_channels: u32,
    /// Maximum wall-clock time for one encode.
    #[serde(default = "default_encode_timeout")]
    pub timeout_secs: u64,
    /// Renditions in encoding order.
    #[serde(default = "default_ladder")]
    pub renditions: Vec<RenditionSpec>,
}

fn default_segment_duration() -> u32 {
    6
}
fn default_gop_size() -> u32 {
    48
}
fn default_video_preset() -> String {
    "slow".into()
}
fn default_audio_sample_rate() -> u32 {
    44100
}
fn default_audio_channels() -> u32 {
    2
}
fn default_encode_timeout() -> u64 {
    86400
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            segment_duration_secs: default_segment_duration(),
            gop_size: default_gop_size(),
            video_preset: default_video_preset(),
            audio_sample_rate: default_audio_sample_rate(),
            audio_channels: default_audio_channels(),
            timeout_secs: default_encode_timeout(),
            renditions: default_ladder(),
        }
    }
}

/// Buffering policy handed to the software adaptive engine.
///
/// Defaults favor continuity over memory footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Already-played media retained behind the playhead, in seconds.
    pub back_buffer_secs: u32,
    /// Forward buffer target, in seconds.
    pub max_buffer_secs: u32,
    /// Hard ceiling the forward buffer may grow to, in seconds.
    pub max_max_buffer_secs: u32,
    /// Maximum forward buffer size in bytes.
    pub max_buffer_bytes: u64,
    /// Offload network fetch and segment parsing to a background worker.
    pub enable_worker: bool,
    pub low_latency: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            back_buffer_secs: 90,
            max_buffer_secs: 30,
            max_max_buffer_secs: 600,
            max_buffer_bytes: 60 * 1000 * 1000,
            enable_worker: true,
            low_latency: false,
        }
    }
}

/// Playback session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub buffer: BufferConfig,
    /// Use the software engine even when the host can play HLS itself.
    pub force_software_engine: bool,
    /// Rendition index to start on; `None` lets the engine choose.
    pub start_level: Option<usize>,
    /// Consecutive fatal faults tolerated before the session gives up.
    #[serde(default = "default_max_consecutive_fatal")]
    pub max_consecutive_fatal: u32,
}

fn default_max_consecutive_fatal() -> u32 {
    3
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            buffer: BufferConfig::default(),
            force_software_engine: false,
            start_level: None,
            max_consecutive_fatal: default_max_consecutive_fatal(),
        }
    }
}

impl PlaybackConfig {
    /// Return a copy with every `Some` field of `overrides` applied.
    pub fn with_overrides(&self, overrides: &PlaybackOverrides) -> Self {
        let mut cfg = self.clone();
        if let Some(v) = overrides.back_buffer_secs {
            cfg.buffer.back_buffer_secs = v;
        }
        if let Some(v) = overrides.max_buffer_secs {
            cfg.buffer.max_buffer_secs = v;
        }
        if let Some(v) = overrides.max_max_buffer_secs {
            cfg.buffer.max_max_buffer_secs = v;
        }
        if let Some(v) = overrides.max_buffer_bytes {
            cfg.buffer.max_buffer_bytes = v;
        }
        if let Some(v) = overrides.enable_worker {
            cfg.buffer.enable_worker = v;
        }
        if let Some(v) = overrides.force_software_engine {
            cfg.force_software_engine = v;
        }
        if let Some(v) = overrides.start_level {
            cfg.start_level = Some(v);
        }
        if let Some(v) = overrides.max_consecutive_fatal {
            cfg.max_consecutive_fatal = v;
        }
        cfg
    }
}

/// Partial playback configuration supplied by a caller when opening a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackOverrides {
    pub back_buffer_secs: Option<u32>,
    pub max_buffer_secs: Option<u32>,
    pub max_max_buffer_secs: Option<u32>,
    pub max_buffer_bytes: Option<u64>,
    pub enable_worker: Option<bool>,
    pub force_software_engine: Option<bool>,
    pub start_level: Option<usize>,
    pub max_consecutive_fatal: Option<u32>,
}

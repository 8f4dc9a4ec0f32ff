//! Source probing via `ffprobe`.
//!
//! Only the facts the ladder needs are extracted: duration (for progress),
//! whether an audio stream exists, and the primary video dimensions.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use hf_core::{Error, Result};

use crate::command::ToolCommand;

/// What the pipeline knows about a source before encoding it.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceProbe {
    pub duration_secs: Option<f64>,
    pub has_audio: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl SourceProbe {
    /// Assumptions used when ffprobe is unavailable.
    pub fn assumed() -> Self {
        Self {
            duration_secs: None,
            has_audio: true,
            width: None,
            height: None,
        }
    }
}

/// A prober backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe_path: PathBuf,
}

impl FfprobeProber {
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self { ffprobe_path }
    }

    pub async fn probe(&self, path: &Path) -> Result<SourceProbe> {
        let mut cmd = ToolCommand::new(self.ffprobe_path.clone());
        cmd.timeout(Duration::from_secs(60));
        cmd.args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ]);
        cmd.arg(path.to_string_lossy().as_ref());

        let output = cmd.execute().await?;
        parse_probe_json(&output.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

/// Map ffprobe's JSON output into a [`SourceProbe`].
pub fn parse_probe_json(json: &str) -> Result<SourceProbe> {
    let ff: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| Error::Internal(format!("ffprobe JSON parse error: {e}")))?;

    let video = ff
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| Error::Input("source has no video stream".into()))?;

    let has_audio = ff
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let duration_secs = ff
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0);

    Ok(SourceProbe {
        duration_secs,
        has_audio,
        width: video.width,
        height: video.height,
    })
}

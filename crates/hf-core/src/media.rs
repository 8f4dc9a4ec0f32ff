//! Rendition data model and the default quality ladder.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// One quality tier of an encoded source.
///
/// Bitrates are in kbps. Peak rate and VBV buffer are derived from the
/// video bitrate ceiling so that every tier bounds burstiness the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenditionSpec {
    /// Short label, e.g. "720p".
    pub name: String,
    /// Target width in pixels (bounding box; aspect ratio is preserved).
    pub width: u32,
    /// Target height in pixels (bounding box; aspect ratio is preserved).
    pub height: u32,
    /// Average video bitrate in kbps.
    pub video_bitrate_kbps: u32,
    /// AAC audio bitrate in kbps.
    pub audio_bitrate_kbps: u32,
}

impl RenditionSpec {
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        video_bitrate_kbps: u32,
        audio_bitrate_kbps: u32,
    ) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            video_bitrate_kbps,
            audio_bitrate_kbps,
        }
    }

    /// Peak video rate: 1.07x the average bitrate.
    pub fn maxrate_kbps(&self) -> u32 {
        self.video_bitrate_kbps * 107 / 100
    }

    /// Encoder VBV buffer: 1.5x the average bitrate.
    pub fn bufsize_kbps(&self) -> u32 {
        self.video_bitrate_kbps * 3 / 2
    }

    /// Peak bandwidth in bits per second (video peak plus audio).
    pub fn peak_bandwidth_bps(&self) -> u64 {
        (u64::from(self.maxrate_kbps()) + u64::from(self.audio_bitrate_kbps)) * 1000
    }

    /// Check the encoder constraints on this tier.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Validation(format!(
                "rendition {}: dimensions must be non-zero ({}x{})",
                self.name, self.width, self.height
            )));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(Error::Validation(format!(
                "rendition {}: dimensions must be even ({}x{})",
                self.name, self.width, self.height
            )));
        }
        if self.video_bitrate_kbps == 0 {
            return Err(Error::Validation(format!(
                "rendition {}: video bitrate must be non-zero",
                self.name
            )));
        }
        Ok(())
    }
}

impl fmt::Display for RenditionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}x{} @ {}k video, {}k audio)",
            self.name, self.width, self.height, self.video_bitrate_kbps, self.audio_bitrate_kbps
        )
    }
}

/// The default four-tier ladder, in encoding order (highest first).
pub fn default_ladder() -> Vec<RenditionSpec> {
    vec![
        RenditionSpec::new("1080p", 1920, 1080, 5000, 128),
        RenditionSpec::new("720p", 1280, 720, 2800, 128),
        RenditionSpec::new("480p", 854, 480, 1400, 96),
        RenditionSpec::new("360p", 640, 360, 800, 64),
    ]
}

/// Validate a whole ladder: non-empty and every tier valid.
pub fn validate_ladder(renditions: &[RenditionSpec]) -> Result<()> {
    if renditions.is_empty() {
        return Err(Error::Validation("at least one rendition is required".into()));
    }
    renditions.iter().try_for_each(RenditionSpec::validate)
}

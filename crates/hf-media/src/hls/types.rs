//! HLS playlist types.

use serde::{Deserialize, Serialize};

use hf_core::{Error, Result};

/// One entry of a master playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantStream {
    /// URI of the variant's media playlist, relative to the master.
    pub uri: String,
    /// Peak bandwidth in bits per second.
    pub bandwidth: u64,
    /// Average bandwidth in bits per second, when the encoder recorded it.
    pub average_bandwidth: Option<u64>,
    /// Resolution as (width, height).
    pub resolution: Option<(u32, u32)>,
    /// Codec string (e.g. "avc1.640028,mp4a.40.2"); empty when unknown.
    pub codecs: String,
}

/// A master playlist listing every variant of one source.
///
/// Variant order is a presentation convention only; lookups go through
/// bandwidth or resolution, never position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MasterPlaylist {
    pub variants: Vec<VariantStream>,
    /// Whether `#EXT-X-INDEPENDENT-SEGMENTS` is present.
    pub independent_segments: bool,
}

impl MasterPlaylist {
    /// A master playlist must reference at least one variant.
    pub fn validate(&self) -> Result<()> {
        if self.variants.is_empty() {
            return Err(Error::Playlist("master playlist has no variants".into()));
        }
        Ok(())
    }

    /// The variant with the highest peak bandwidth not exceeding `max_bps`.
    pub fn best_variant_within(&self, max_bps: u64) -> Option<&VariantStream> {
        self.variants
            .iter()
            .filter(|v| v.bandwidth <= max_bps)
            .max_by_key(|v| v.bandwidth)
    }
}

/// The declared type of a media playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistType {
    Vod,
    Event,
}

/// A single segment in a media playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment duration in seconds.
    pub duration: f64,
    /// URI for this segment, relative to its playlist.
    pub uri: String,
    pub title: Option<String>,
}

/// An HLS media playlist describing the segments of one variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPlaylist {
    /// Maximum segment duration in integer seconds (rounded up).
    pub target_duration: u32,
    /// Sequence number of the first segment.
    pub media_sequence: u64,
    pub playlist_type: Option<PlaylistType>,
    pub independent_segments: bool,
    /// Ordered list of segments.
    pub segments: Vec<Segment>,
    /// Whether `#EXT-X-ENDLIST` closes the playlist.
    pub ended: bool,
    /// Optional URI for the initialization segment (`#EXT-X-MAP`).
    pub init_segment_uri: Option<String>,
}

impl MediaPlaylist {
    /// A closed VOD playlist with the given segments.
    pub fn vod(target_duration: u32, segments: Vec<Segment>) -> Self {
        Self {
            target_duration,
            media_sequence: 0,
            playlist_type: Some(PlaylistType::Vod),
            independent_segments: true,
            segments,
            ended: true,
            init_segment_uri: None,
        }
    }

    /// Sum of all segment durations in seconds.
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// Start time of every segment plus the end time of the last one.
    pub fn boundaries(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.segments.len() + 1);
        let mut t = 0.0;
        out.push(t);
        for seg in &self.segments {
            t += seg.duration;
            out.push(t);
        }
        out
    }

    /// Whether the playlist is finite (VOD or explicitly ended).
    pub fn is_closed(&self) -> bool {
        self.ended || self.playlist_type == Some(PlaylistType::Vod)
    }
}

/// Either kind of playlist, as returned by [`super::parse_playlist`].
#[derive(Debug, Clone, PartialEq)]
pub enum Playlist {
    Master(MasterPlaylist),
    Media(MediaPlaylist),
}

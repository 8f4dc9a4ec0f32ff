//! M3U8 serialization.
//!
//! Both playlist types implement [`fmt::Display`]; the `generate_*` functions
//! are the string-returning entry points used by callers and tests.

use std::fmt;

use super::types::{MasterPlaylist, MediaPlaylist, PlaylistType, VariantStream};

const HEADER: &str = "#EXTM3U\n#EXT-X-VERSION:3\n";

/// Render a master playlist: one `#EXT-X-STREAM-INF` per variant, in order.
pub fn generate_master_playlist(playlist: &MasterPlaylist) -> String {
    playlist.to_string()
}

/// Render a media playlist.
///
/// `#EXT-X-PLAYLIST-TYPE`, `#EXT-X-INDEPENDENT-SEGMENTS`, `#EXT-X-MAP` and
/// `#EXT-X-ENDLIST` are only written when the playlist carries them.
pub fn generate_media_playlist(playlist: &MediaPlaylist) -> String {
    playlist.to_string()
}

impl fmt::Display for MasterPlaylist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(HEADER)?;
        if self.independent_segments {
            f.write_str("#EXT-X-INDEPENDENT-SEGMENTS\n")?;
        }
        for variant in &self.variants {
            write_stream_inf(f, variant)?;
        }
        Ok(())
    }
}

fn write_stream_inf(f: &mut fmt::Formatter<'_>, variant: &VariantStream) -> fmt::Result {
    write!(f, "#EXT-X-STREAM-INF:BANDWIDTH={}", variant.bandwidth)?;
    if let Some(avg) = variant.average_bandwidth {
        write!(f, ",AVERAGE-BANDWIDTH={avg}")?;
    }
    if let Some((w, h)) = variant.resolution {
        write!(f, ",RESOLUTION={w}x{h}")?;
    }
    if !variant.codecs.is_empty() {
        write!(f, ",CODECS=\"{}\"", variant.codecs)?;
    }
    writeln!(f)?;
    writeln!(f, "{}", variant.uri)
}

impl fmt::Display for MediaPlaylist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(HEADER)?;
        writeln!(f, "#EXT-X-TARGETDURATION:{}", self.target_duration)?;
        writeln!(f, "#EXT-X-MEDIA-SEQUENCE:{}", self.media_sequence)?;

        let kind = match self.playlist_type {
            Some(PlaylistType::Vod) => Some("VOD"),
            Some(PlaylistType::Event) => Some("EVENT"),
            None => None,
        };
        if let Some(kind) = kind {
            writeln!(f, "#EXT-X-PLAYLIST-TYPE:{kind}")?;
        }
        if self.independent_segments {
            f.write_str("#EXT-X-INDEPENDENT-SEGMENTS\n")?;
        }
        if let Some(init) = &self.init_segment_uri {
            writeln!(f, "#EXT-X-MAP:URI=\"{init}\"")?;
        }

        for segment in &self.segments {
            let title = segment.title.as_deref().unwrap_or("");
            writeln!(f, "#EXTINF:{:.6},{title}", segment.duration)?;
            writeln!(f, "{}", segment.uri)?;
        }

        if self.ended {
            f.write_str("#EXT-X-ENDLIST\n")?;
        }
        Ok(())
    }
}

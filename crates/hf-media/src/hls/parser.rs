//! M3U8 parsing.
//!
//! The parser is line based and tolerant: CRLF line endings, blank lines,
//! and unknown tags are accepted. Attribute lists may contain quoted values
//! with embedded commas (`CODECS="avc1.640028,mp4a.40.2"`).

use std::collections::HashMap;

use hf_core::{Error, Result};

use super::types::{MasterPlaylist, MediaPlaylist, Playlist, PlaylistType, Segment, VariantStream};

/// Parse either kind of playlist, deciding by the presence of
/// `#EXT-X-STREAM-INF`.
pub fn parse_playlist(text: &str) -> Result<Playlist> {
    check_header(text)?;
    if lines(text).any(|l| l.starts_with("#EXT-X-STREAM-INF")) {
        parse_master_playlist(text).map(Playlist::Master)
    } else {
        parse_media_playlist(text).map(Playlist::Media)
    }
}

/// Parse a master playlist. At least one variant is required.
pub fn parse_master_playlist(text: &str) -> Result<MasterPlaylist> {
    check_header(text)?;

    let mut master = MasterPlaylist::default();
    let mut pending: Option<HashMap<String, String>> = None;

    for line in lines(text) {
        if line == "#EXT-X-INDEPENDENT-SEGMENTS" {
            master.independent_segments = true;
        } else if let Some(attrs) = line.strip_prefix("#EXT-X-STREAM-INF:") {
            pending = Some(parse_attributes(attrs));
        } else if line.starts_with('#') {
            continue;
        } else if let Some(attrs) = pending.take() {
            master.variants.push(variant_from_attributes(line, &attrs)?);
        }
    }

    master.validate()?;
    Ok(master)
}

/// Parse a media playlist.
pub fn parse_media_playlist(text: &str) -> Result<MediaPlaylist> {
    check_header(text)?;

    let mut playlist = MediaPlaylist {
        target_duration: 0,
        media_sequence: 0,
        playlist_type: None,
        independent_segments: false,
        segments: Vec::new(),
        ended: false,
        init_segment_uri: None,
    };
    let mut pending: Option<(f64, Option<String>)> = None;

    for line in lines(text) {
        if let Some(v) = line.strip_prefix("#EXT-X-TARGETDURATION:") {
            playlist.target_duration = v
                .trim()
                .parse()
                .map_err(|_| Error::Playlist(format!("invalid target duration: {v}")))?;
        } else if let Some(v) = line.strip_prefix("#EXT-X-MEDIA-SEQUENCE:") {
            playlist.media_sequence = v
                .trim()
                .parse()
                .map_err(|_| Error::Playlist(format!("invalid media sequence: {v}")))?;
        } else if let Some(v) = line.strip_prefix("#EXT-X-PLAYLIST-TYPE:") {
            playlist.playlist_type = match v.trim() {
                "VOD" => Some(PlaylistType::Vod),
                "EVENT" => Some(PlaylistType::Event),
                other => {
                    return Err(Error::Playlist(format!("unknown playlist type: {other}")))
                }
            };
        } else if line == "#EXT-X-INDEPENDENT-SEGMENTS" {
            playlist.independent_segments = true;
        } else if line == "#EXT-X-ENDLIST" {
            playlist.ended = true;
        } else if let Some(attrs) = line.strip_prefix("#EXT-X-MAP:") {
            playlist.init_segment_uri = parse_attributes(attrs).remove("URI");
        } else if let Some(v) = line.strip_prefix("#EXTINF:") {
            let (dur, title) = v.split_once(',').unwrap_or((v, ""));
            let duration: f64 = dur
                .trim()
                .parse()
                .map_err(|_| Error::Playlist(format!("invalid segment duration: {dur}")))?;
            let title = (!title.trim().is_empty()).then(|| title.trim().to_string());
            pending = Some((duration, title));
        } else if line.starts_with('#') {
            continue;
        } else if let Some((duration, title)) = pending.take() {
            playlist.segments.push(Segment {
                duration,
                uri: line.to_string(),
                title,
            });
        } else {
            return Err(Error::Playlist(format!("URI without #EXTINF: {line}")));
        }
    }

    Ok(playlist)
}

/// Every URI a playlist references: URI lines plus `URI="..."` attributes.
pub(crate) fn referenced_uris(text: &str) -> Vec<String> {
    let mut uris = Vec::new();
    for line in lines(text) {
        if let Some(rest) = line.strip_prefix('#') {
            if let Some((_, attrs)) = rest.split_once(':') {
                if attrs.contains("URI=") {
                    if let Some(uri) = parse_attributes(attrs).remove("URI") {
                        uris.push(uri);
                    }
                }
            }
        } else {
            uris.push(line.to_string());
        }
    }
    uris
}

fn check_header(text: &str) -> Result<()> {
    match lines(text).next() {
        Some("#EXTM3U") => Ok(()),
        _ => Err(Error::Playlist("missing #EXTM3U header".into())),
    }
}

/// Trimmed, non-empty lines.
fn lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty())
}

fn variant_from_attributes(uri: &str, attrs: &HashMap<String, String>) -> Result<VariantStream> {
    let bandwidth = attrs
        .get("BANDWIDTH")
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| Error::Playlist(format!("variant {uri} has no valid BANDWIDTH")))?;

    let resolution = attrs.get("RESOLUTION").and_then(|v| {
        let (w, h) = v.split_once('x')?;
        Some((w.parse().ok()?, h.parse().ok()?))
    });

    Ok(VariantStream {
        uri: uri.to_string(),
        bandwidth,
        average_bandwidth: attrs.get("AVERAGE-BANDWIDTH").and_then(|v| v.parse().ok()),
        resolution,
        codecs: attrs.get("CODECS").cloned().unwrap_or_default(),
    })
}

/// Split an attribute list on commas that are not inside quotes.
fn parse_attributes(input: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    let mut key = String::new();
    let mut value = String::new();
    let mut in_value = false;
    let mut in_quotes = false;

    let mut flush = |key: &mut String, value: &mut String| {
        if !key.is_empty() {
            out.insert(key.trim().to_string(), value.trim().to_string());
        }
        key.clear();
        value.clear();
    };

    for c in input.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                flush(&mut key, &mut value);
                in_value = false;
            }
            '=' if !in_value && !in_quotes => in_value = true,
            _ if in_value => value.push(c),
            _ => key.push(c),
        }
    }
    flush(&mut key, &mut value);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const FFMPEG_MASTER: &str = "#EXTM3U\r\n\
#EXT-X-VERSION:3\r\n\
#EXT-X-INDEPENDENT-SEGMENTS\r\n\
#EXT-X-STREAM-INF:BANDWIDTH=5640800,AVERAGE-BANDWIDTH=5280000,RESOLUTION=1920x1080,CODECS=\"avc1.640028,mp4a.40.2\"\r\n\
stream_0.m3u8\r\n\
\r\n\
#EXT-X-STREAM-INF:BANDWIDTH=3221600,RESOLUTION=1280x720,CODECS=\"avc1.64001f,mp4a.40.2\"\r\n\
stream_1.m3u8\r\n";

    const FFMPEG_VARIANT: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-TARGETDURATION:6
#EXT-X-MEDIA-SEQUENCE:0
#EXT-X-PLAYLIST-TYPE:VOD
#EXT-X-INDEPENDENT-SEGMENTS
#EXTINF:6.000000,
segment_000.ts
#EXTINF:6.000000,
segment_001.ts
#EXTINF:3.500000,
segment_002.ts
#EXT-X-ENDLIST
";

    #[test]
    fn parses_ffmpeg_master_with_crlf() {
        let master = parse_master_playlist(FFMPEG_MASTER).unwrap();
        assert!(master.independent_segments);
        assert_eq!(master.variants.len(), 2);

        let top = &master.variants[0];
        assert_eq!(top.uri, "stream_0.m3u8");
        assert_eq!(top.bandwidth, 5_640_800);
        assert_eq!(top.average_bandwidth, Some(5_280_000));
        assert_eq!(top.resolution, Some((1920, 1080)));
        assert_eq!(top.codecs, "avc1.640028,mp4a.40.2");

        assert_eq!(master.variants[1].average_bandwidth, None);
    }

    #[test]
    fn parses_ffmpeg_variant() {
        let playlist = parse_media_playlist(FFMPEG_VARIANT).unwrap();
        assert_eq!(playlist.target_duration, 6);
        assert_eq!(playlist.playlist_type, Some(PlaylistType::Vod));
        assert!(playlist.ended);
        assert_eq!(playlist.segments.len(), 3);
        assert_eq!(playlist.segments[2].uri, "segment_002.ts");
        assert!((playlist.segments[2].duration - 3.5).abs() < 1e-9);
    }

    #[test]
    fn detects_playlist_kind() {
        assert!(matches!(parse_playlist(FFMPEG_MASTER).unwrap(), Playlist::Master(_)));
        assert!(matches!(parse_playlist(FFMPEG_VARIANT).unwrap(), Playlist::Media(_)));
    }

    #[test]
    fn master_without_variants_is_rejected() {
        let err = parse_master_playlist("#EXTM3U\n#EXT-X-VERSION:3\n").unwrap_err();
        assert!(err.to_string().contains("no variants"));
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(parse_playlist("segment_000.ts\n").is_err());
    }

    #[test]
    fn variant_without_bandwidth_is_rejected() {
        let text = "#EXTM3U\n#EXT-X-STREAM-INF:RESOLUTION=640x360\nstream_3.m3u8\n";
        assert!(parse_master_playlist(text).is_err());
    }

    #[test]
    fn dangling_uri_is_rejected() {
        let text = "#EXTM3U\n#EXT-X-TARGETDURATION:6\nsegment_000.ts\n";
        assert!(parse_media_playlist(text).is_err());
    }

    #[test]
    fn referenced_uris_include_map_attribute() {
        let text = "#EXTM3U\n#EXT-X-MAP:URI=\"init.mp4\"\n#EXTINF:6.0,\nseg0.m4s\n#EXT-X-ENDLIST\n";
        assert_eq!(referenced_uris(text), vec!["init.mp4", "seg0.m4s"]);
    }

    #[test]
    fn attribute_list_keeps_quoted_commas() {
        let attrs = parse_attributes("BANDWIDTH=1,CODECS=\"a,b\",RESOLUTION=2x2");
        assert_eq!(attrs["CODECS"], "a,b");
        assert_eq!(attrs["RESOLUTION"], "2x2");
    }
}

//! Multi-rendition H.264/AAC HLS encoding in a single ffmpeg invocation.
//!
//! All renditions come out of one decode: the video is split, each branch
//! scaled into its bounding box, and every encoder shares the same GOP and
//! forced keyframe schedule. That is what keeps segment boundaries identical
//! across the ladder.

use std::path::Path;

use hf_core::config::EncodeConfig;
use hf_core::RenditionSpec;
use hf_media::OutputLayout;

/// Build the `-filter_complex` graph: split the first video stream into one
/// scaled branch per rendition, labelled `[v<n>out]`.
pub fn build_filter_graph(renditions: &[RenditionSpec]) -> String {
    let n = renditions.len();
    let mut graph = format!("[0:v]split={n}");
    for i in 0..n {
        graph.push_str(&format!("[v{i}]"));
    }
    for (i, r) in renditions.iter().enumerate() {
        graph.push_str(&format!(
            ";[v{i}]scale=w={}:h={}:force_original_aspect_ratio=decrease:force_divisible_by=2[v{i}out]",
            r.width, r.height
        ));
    }
    graph
}

/// `-var_stream_map` value pairing video `n` with audio `n`.
pub fn build_var_stream_map(renditions: usize, has_audio: bool) -> String {
    (0..renditions)
        .map(|i| {
            if has_audio {
                format!("v:{i},a:{i}")
            } else {
                format!("v:{i}")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Full ffmpeg argument list for encoding `input` into `layout`.
///
/// Progress is written to stderr in `-progress` key=value form.
pub fn build_ladder_args(
    input: &Path,
    layout: &OutputLayout,
    renditions: &[RenditionSpec],
    config: &EncodeConfig,
    has_audio: bool,
) -> Vec<String> {
    let seg = config.segment_duration_secs;
    let gop = config.gop_size.to_string();
    let mut args: Vec<String> = Vec::new();
    let mut push = |items: &[&str]| args.extend(items.iter().map(|s| s.to_string()));

    push(&["-y", "-hide_banner", "-nostats", "-progress", "pipe:2"]);
    push(&["-i", &input.to_string_lossy()]);
    push(&["-filter_complex", &build_filter_graph(renditions)]);

    for (i, r) in renditions.iter().enumerate() {
        push(&["-map", &format!("[v{i}out]")]);
        push(&[&format!("-c:v:{i}"), "libx264"]);
        push(&[&format!("-b:v:{i}"), &format!("{}k", r.video_bitrate_kbps)]);
        push(&[&format!("-maxrate:v:{i}"), &format!("{}k", r.maxrate_kbps())]);
        push(&[&format!("-bufsize:v:{i}"), &format!("{}k", r.bufsize_kbps())]);
        if has_audio {
            push(&["-map", "0:a:0"]);
            push(&[&format!("-c:a:{i}"), "aac"]);
            push(&[&format!("-b:a:{i}"), &format!("{}k", r.audio_bitrate_kbps)]);
        }
    }

    push(&["-preset", &config.video_preset, "-pix_fmt", "yuv420p"]);
    push(&["-g", &gop, "-keyint_min", &gop, "-sc_threshold", "0"]);
    push(&["-force_key_frames", &format!("expr:gte(t,n_forced*{seg})")]);
    if has_audio {
        push(&[
            "-ac",
            &config.audio_channels.to_string(),
            "-ar",
            &config.audio_sample_rate.to_string(),
        ]);
    }

    push(&["-f", "hls"]);
    push(&["-hls_time", &seg.to_string()]);
    push(&["-hls_playlist_type", "vod"]);
    push(&["-hls_flags", "independent_segments"]);
    push(&["-hls_segment_type", "mpegts"]);
    push(&["-hls_list_size", "0"]);
    push(&[
        "-hls_segment_filename",
        &layout.encoder_segment_pattern().to_string_lossy(),
    ]);
    push(&["-master_pl_name", &layout.master_file_name()]);
    push(&[
        "-var_stream_map",
        &build_var_stream_map(renditions.len(), has_audio),
    ]);
    push(&[&layout.encoder_variant_pattern().to_string_lossy()]);

    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use hf_core::default_ladder;

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn filter_graph_splits_and_scales_each_rendition() {
        let graph = build_filter_graph(&default_ladder());
        assert!(graph.starts_with("[0:v]split=4[v0][v1][v2][v3];"));
        assert!(graph.contains(
            "[v2]scale=w=854:h=480:force_original_aspect_ratio=decrease:force_divisible_by=2[v2out]"
        ));
        assert_eq!(graph.matches("scale=").count(), 4);
    }

    #[test]
    fn var_stream_map_pairs_audio() {
        assert_eq!(build_var_stream_map(3, true), "v:0,a:0 v:1,a:1 v:2,a:2");
        assert_eq!(build_var_stream_map(2, false), "v:0 v:1");
    }

    #[test]
    fn ladder_args_share_keyframe_schedule() {
        let layout = OutputLayout::new("/out", "clip");
        let args = build_ladder_args(
            Path::new("/src/clip.mp4"),
            &layout,
            &default_ladder(),
            &EncodeConfig::default(),
            true,
        );

        assert_eq!(value_after(&args, "-i"), Some("/src/clip.mp4"));
        assert_eq!(value_after(&args, "-g"), Some("48"));
        assert_eq!(value_after(&args, "-keyint_min"), Some("48"));
        assert_eq!(value_after(&args, "-sc_threshold"), Some("0"));
        assert_eq!(value_after(&args, "-force_key_frames"), Some("expr:gte(t,n_forced*6)"));
        assert_eq!(value_after(&args, "-hls_time"), Some("6"));
        assert_eq!(value_after(&args, "-hls_playlist_type"), Some("vod"));
        assert_eq!(value_after(&args, "-hls_flags"), Some("independent_segments"));
        assert_eq!(value_after(&args, "-master_pl_name"), Some("clip.m3u8"));
        assert_eq!(
            value_after(&args, "-hls_segment_filename"),
            Some("/out/clip/stream_%v/segment_%03d.ts")
        );
        assert_eq!(args.last().map(String::as_str), Some("/out/clip/stream_%v.m3u8"));
    }

    #[test]
    fn ladder_args_carry_rate_control_per_rendition() {
        let layout = OutputLayout::new("out", "clip");
        let args = build_ladder_args(
            Path::new("clip.mp4"),
            &layout,
            &default_ladder(),
            &EncodeConfig::default(),
            true,
        );

        assert_eq!(value_after(&args, "-b:v:0"), Some("5000k"));
        assert_eq!(value_after(&args, "-maxrate:v:1"), Some("2996k"));
        assert_eq!(value_after(&args, "-bufsize:v:3"), Some("1200k"));
        assert_eq!(value_after(&args, "-b:a:2"), Some("96k"));
        assert_eq!(value_after(&args, "-ar"), Some("44100"));
        assert_eq!(args.iter().filter(|a| *a == "0:a:0").count(), 4);
    }

    #[test]
    fn silent_source_omits_audio() {
        let layout = OutputLayout::new("out", "clip");
        let args = build_ladder_args(
            Path::new("clip.mp4"),
            &layout,
            &default_ladder(),
            &EncodeConfig::default(),
            false,
        );
        assert!(!args.iter().any(|a| a == "0:a:0" || a == "-ac"));
        assert_eq!(value_after(&args, "-var_stream_map"), Some("v:0 v:1 v:2 v:3"));
    }
}

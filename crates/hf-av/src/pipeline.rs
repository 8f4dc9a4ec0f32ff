//! End-to-end segmentation of one source into a deployable HLS ladder.
//!
//! The pipeline encodes every rendition in one ffmpeg run, publishes the
//! master playlist next to the stream directory, rewrites playlist URIs so
//! they resolve relative to their own file, and refuses to report success
//! until every reference resolves and all renditions share boundaries.
//! Partial output of a failed run is left on disk for inspection.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use hf_core::config::EncodeConfig;
use hf_core::{validate_ladder, Error, Result};
use hf_media::{
    normalize_layout, verify_master, AlignmentReport, NormalizeReport, OutputLayout,
    DEFAULT_BOUNDARY_TOLERANCE,
};

use crate::actions::{build_ladder_args, EncodeProgress, ProgressParser};
use crate::command::ToolCommand;
use crate::probe::{FfprobeProber, SourceProbe};
use crate::tools::ToolRegistry;

/// What to segment and how.
#[derive(Debug, Clone)]
pub struct LadderRequest {
    pub input: PathBuf,
    /// Output root; defaults to the input's directory.
    pub output_dir: Option<PathBuf>,
    pub encode: EncodeConfig,
}

impl LadderRequest {
    pub fn new(input: impl Into<PathBuf>, output_dir: Option<PathBuf>, encode: EncodeConfig) -> Self {
        Self {
            input: input.into(),
            output_dir,
            encode,
        }
    }
}

/// A verified, deployable ladder.
#[derive(Debug, Clone)]
pub struct LadderOutput {
    pub layout: OutputLayout,
    pub master_path: PathBuf,
    pub probe: SourceProbe,
    /// Segment count per rendition, in encoding order.
    pub segment_counts: Vec<usize>,
    pub normalize: NormalizeReport,
    pub alignment: AlignmentReport,
}

/// Segment `request.input` into every rendition of `request.encode`.
///
/// `progress` receives throttled encode updates; `cancel` aborts the encode
/// and kills ffmpeg.
pub async fn segment_source(
    tools: &ToolRegistry,
    request: &LadderRequest,
    mut progress: impl FnMut(&EncodeProgress),
    cancel: Option<CancellationToken>,
) -> Result<LadderOutput> {
    let input = request.input.as_path();
    let config = &request.encode;
    check_input(input)?;
    validate_ladder(&config.renditions)?;
    if config.segment_duration_secs == 0 {
        return Err(Error::Validation("segment duration must be non-zero".into()));
    }

    let ffmpeg = tools.require("ffmpeg")?;
    let probe = probe_source(tools, input).await?;

    let layout = OutputLayout::for_source(input, request.output_dir.as_deref())?;
    layout.create_dirs(config.renditions.len())?;

    tracing::info!(
        input = %input.display(),
        output = %layout.stream_dir().display(),
        renditions = config.renditions.len(),
        segment_secs = config.segment_duration_secs,
        has_audio = probe.has_audio,
        "Encoding HLS ladder"
    );
    for r in &config.renditions {
        tracing::debug!(rendition = %r, "Rendition");
    }

    let mut cmd = ToolCommand::new(ffmpeg.path.clone());
    cmd.timeout(Duration::from_secs(config.timeout_secs));
    cmd.args(build_ladder_args(
        input,
        &layout,
        &config.renditions,
        config,
        probe.has_audio,
    ));

    let mut parser = ProgressParser::new(probe.duration_secs);
    cmd.execute_with_stderr_callback(
        |line| {
            if let Some(update) = parser.feed(line) {
                progress(&update);
            }
        },
        cancel,
    )
    .await?;

    let master_path = publish_master(&layout)?;
    let normalize = normalize_layout(&layout)?;

    let report = verify_master(&master_path, DEFAULT_BOUNDARY_TOLERANCE)?;
    for bad in &report.unresolved {
        tracing::error!(playlist = %bad.playlist.display(), uri = %bad.uri, "Unresolved reference");
    }
    let report = report.into_result()?;

    if report.variants.len() != config.renditions.len() {
        return Err(Error::encode(
            "ffmpeg",
            format!(
                "expected {} variant playlists, found {}",
                config.renditions.len(),
                report.variants.len()
            ),
        ));
    }

    let segment_counts: Vec<usize> = report.variants.iter().map(|v| v.segments.len()).collect();
    let alignment = report
        .alignment
        .map_err(Error::Alignment)?;

    tracing::info!(
        master = %master_path.display(),
        segments = ?segment_counts,
        fixed = normalize.fixed.len(),
        "HLS ladder ready"
    );

    Ok(LadderOutput {
        layout,
        master_path,
        probe,
        segment_counts,
        normalize,
        alignment,
    })
}

fn check_input(input: &Path) -> Result<()> {
    if !input.exists() {
        return Err(Error::Input(format!("input file not found: {}", input.display())));
    }
    if !input.is_file() {
        return Err(Error::Input(format!("input is not a file: {}", input.display())));
    }
    Ok(())
}

/// Probe with ffprobe when available. A probe that runs but finds no video
/// stream is an input error; any other probe failure falls back to
/// [`SourceProbe::assumed`].
async fn probe_source(tools: &ToolRegistry, input: &Path) -> Result<SourceProbe> {
    let Some(ffprobe) = tools.get("ffprobe") else {
        tracing::warn!("ffprobe not found; assuming the source has audio");
        return Ok(SourceProbe::assumed());
    };

    match FfprobeProber::new(ffprobe.path.clone()).probe(input).await {
        Ok(probe) => {
            tracing::debug!(?probe, "Probed source");
            Ok(probe)
        }
        Err(e @ Error::Input(_)) => Err(e),
        Err(e) => {
            tracing::warn!(error = %e, "Probe failed; assuming the source has audio");
            Ok(SourceProbe::assumed())
        }
    }
}

/// Move the encoder's master from `<name>/<name>.m3u8` to `<name>.m3u8`.
pub fn publish_master(layout: &OutputLayout) -> Result<PathBuf> {
    let staged = layout.unpublished_master_path();
    let published = layout.master_path();

    if staged.is_file() {
        std::fs::rename(&staged, &published)?;
        tracing::debug!(from = %staged.display(), to = %published.display(), "Published master playlist");
    } else if !published.is_file() {
        return Err(Error::encode(
            "ffmpeg",
            format!("encoder produced no master playlist at {}", staged.display()),
        ));
    }

    Ok(published)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hf_core::RenditionSpec;

    fn request(input: &Path) -> LadderRequest {
        LadderRequest::new(input, None, EncodeConfig::default())
    }

    #[tokio::test]
    async fn missing_input_is_input_error() {
        let tools = ToolRegistry::default();
        let err = segment_source(&tools, &request(Path::new("/nonexistent/clip.mp4")), |_| {}, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }

    #[tokio::test]
    async fn directory_input_is_input_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = segment_source(&ToolRegistry::default(), &request(tmp.path()), |_| {}, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a file"));
    }

    #[tokio::test]
    async fn odd_rendition_is_rejected_before_encoding() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("clip.mp4");
        std::fs::write(&input, b"not really video").unwrap();

        let mut req = request(&input);
        req.encode.renditions = vec![RenditionSpec::new("odd", 853, 480, 1400, 96)];
        let err = segment_source(&ToolRegistry::default(), &req, |_| {}, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        // Nothing is created before validation passes.
        assert!(!tmp.path().join("clip").exists());
    }

    #[tokio::test]
    async fn missing_ffmpeg_is_toolchain_error() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("clip.mp4");
        std::fs::write(&input, b"x").unwrap();

        let err = segment_source(&ToolRegistry::default(), &request(&input), |_| {}, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolchainUnavailable { .. }));
    }

    /// Registry whose ffprobe is a shell script printing `stdout`.
    #[cfg(unix)]
    fn stub_ffprobe(dir: &Path, stdout: &str) -> ToolRegistry {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("ffprobe");
        std::fs::write(&script, format!("#!/bin/sh\ncat <<'EOF'\n{stdout}\nEOF\n")).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        ToolRegistry::default().with_tool("ffprobe", script)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unparseable_ffprobe_output_falls_back_to_assumed() {
        let tmp = tempfile::tempdir().unwrap();
        let tools = stub_ffprobe(tmp.path(), "this is not json");
        let probe = probe_source(&tools, &tmp.path().join("clip.mp4")).await.unwrap();
        assert_eq!(probe, SourceProbe::assumed());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn ffprobe_without_video_stream_is_input_error() {
        let tmp = tempfile::tempdir().unwrap();
        let tools = stub_ffprobe(
            tmp.path(),
            r#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "3.0"}}"#,
        );
        let err = probe_source(&tools, &tmp.path().join("clip.mp4")).await.unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }

    #[test]
    fn publish_moves_master_out_of_stream_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(tmp.path(), "clip");
        layout.create_dirs(1).unwrap();
        std::fs::write(layout.unpublished_master_path(), "#EXTM3U\n").unwrap();

        let published = publish_master(&layout).unwrap();
        assert_eq!(published, layout.master_path());
        assert!(published.is_file());
        assert!(!layout.unpublished_master_path().exists());
    }

    #[test]
    fn publish_without_master_is_encode_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(tmp.path(), "clip");
        layout.create_dirs(1).unwrap();
        assert!(matches!(publish_master(&layout), Err(Error::EncodeFailure { .. })));
    }
}

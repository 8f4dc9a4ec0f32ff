//! Relative-path normalization and reference validation.
//!
//! The encoder records segment and variant URIs as bare file names, relative
//! to wherever it was told to write them. After publishing, every URI must
//! instead resolve relative to the playlist that contains it:
//!
//! - master `<name>.m3u8`: `stream_<n>.m3u8` becomes `<name>/stream_<n>.m3u8`
//! - variant `<name>/stream_<n>.m3u8`: `segment_<nnn>.ts` becomes
//!   `stream_<n>/segment_<nnn>.ts`
//!
//! Rewriting only touches bare names, so running the pass over output that is
//! already correct changes nothing and writes nothing.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use hf_core::{Error, Result};

use crate::hls::parser::referenced_uris;
use crate::layout::OutputLayout;

fn bare_variant_uri() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^stream_\d+\.m3u8$").expect("valid regex"))
}

fn bare_segment_uri() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^segment_\d+\.ts$").expect("valid regex"))
}

/// Outcome of [`normalize_layout`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Playlists that were rewritten.
    pub fixed: Vec<PathBuf>,
    /// Playlists that needed no change.
    pub already_correct: Vec<PathBuf>,
}

impl NormalizeReport {
    pub fn changed(&self) -> bool {
        !self.fixed.is_empty()
    }
}

/// A URI that does not resolve relative to its playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    pub playlist: PathBuf,
    pub uri: String,
}

impl From<UnresolvedReference> for Error {
    fn from(r: UnresolvedReference) -> Self {
        Error::unresolved(r.playlist, r.uri)
    }
}

/// Prefix every bare URI line matching `pattern` with `prefix`.
///
/// Tag lines, blank lines and line endings are preserved. Returns the new
/// text and the number of rewritten lines.
pub fn prefix_bare_uris(content: &str, prefix: &str, pattern: &Regex) -> (String, usize) {
    let mut out = String::with_capacity(content.len() + 64);
    let mut rewritten = 0;

    for line in content.split_inclusive('\n') {
        let body = line.trim_end_matches(['\r', '\n']);
        let ending = &line[body.len()..];
        let uri = body.trim();

        if !uri.is_empty() && !uri.starts_with('#') && pattern.is_match(uri) {
            out.push_str(prefix);
            out.push_str(uri);
            out.push_str(ending);
            rewritten += 1;
        } else {
            out.push_str(line);
        }
    }

    (out, rewritten)
}

/// Rewrite the master and every variant playlist of `layout` so all URIs
/// resolve relative to the file that contains them.
pub fn normalize_layout(layout: &OutputLayout) -> Result<NormalizeReport> {
    let mut report = NormalizeReport::default();

    let master = layout.master_path();
    if !master.is_file() {
        return Err(Error::Input(format!(
            "master playlist not found: {}",
            master.display()
        )));
    }
    let prefix = format!("{}/", layout.name());
    rewrite_file(&master, &prefix, bare_variant_uri(), &mut report)?;
    warn_missing_variants(layout)?;

    for index in layout.existing_variants()? {
        let prefix = format!("{}/", OutputLayout::segment_dir_name(index));
        rewrite_file(&layout.variant_path(index), &prefix, bare_segment_uri(), &mut report)?;
    }

    Ok(report)
}

fn rewrite_file(
    path: &Path,
    prefix: &str,
    pattern: &Regex,
    report: &mut NormalizeReport,
) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    let (updated, rewritten) = prefix_bare_uris(&content, prefix, pattern);

    if rewritten > 0 {
        std::fs::write(path, updated)?;
        tracing::info!(playlist = %path.display(), rewritten, "Fixed playlist paths");
        report.fixed.push(path.to_path_buf());
    } else {
        tracing::debug!(playlist = %path.display(), "Playlist paths already correct");
        report.already_correct.push(path.to_path_buf());
    }
    Ok(())
}

fn warn_missing_variants(layout: &OutputLayout) -> Result<()> {
    let master = layout.master_path();
    let text = std::fs::read_to_string(&master)?;
    for uri in referenced_uris(&text) {
        let file = uri.rsplit('/').next().unwrap_or(&uri);
        if bare_variant_uri().is_match(file) && !layout.stream_dir().join(file).is_file() {
            tracing::warn!(master = %master.display(), %uri, "Variant playlist missing, skipped");
        }
    }
    Ok(())
}

/// Collect every URI reachable from `playlist` that does not resolve
/// relative to the playlist containing it.
///
/// For a master playlist each resolvable variant is checked as well. Remote
/// URLs are skipped; absolute filesystem paths are reported as unresolved.
pub fn check_references(playlist: &Path) -> Result<Vec<UnresolvedReference>> {
    let mut unresolved = Vec::new();
    visit(playlist, true, &mut unresolved)?;
    Ok(unresolved)
}

/// Like [`check_references`], but fails on the first unresolved URI.
pub fn ensure_resolved(playlist: &Path) -> Result<()> {
    match check_references(playlist)?.into_iter().next() {
        Some(bad) => Err(bad.into()),
        None => Ok(()),
    }
}

fn visit(playlist: &Path, descend: bool, unresolved: &mut Vec<UnresolvedReference>) -> Result<()> {
    let text = std::fs::read_to_string(playlist)?;
    let dir = playlist.parent().unwrap_or_else(|| Path::new("."));
    let is_master = text.contains("#EXT-X-STREAM-INF");

    for uri in referenced_uris(&text) {
        if is_remote(&uri) {
            continue;
        }
        let local = strip_query(&uri);
        if Path::new(local).is_absolute() {
            unresolved.push(UnresolvedReference {
                playlist: playlist.to_path_buf(),
                uri,
            });
            continue;
        }

        let target = dir.join(local);
        if !target.is_file() {
            unresolved.push(UnresolvedReference {
                playlist: playlist.to_path_buf(),
                uri,
            });
        } else if is_master && descend && local.ends_with(".m3u8") {
            visit(&target, false, unresolved)?;
        }
    }

    Ok(())
}

fn is_remote(uri: &str) -> bool {
    uri.contains("://") || uri.starts_with("data:")
}

fn strip_query(uri: &str) -> &str {
    uri.split(['?', '#']).next().unwrap_or(uri)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hls::{generate_master_playlist, generate_media_playlist};
    use crate::hls::{MasterPlaylist, MediaPlaylist, Segment, VariantStream};

    /// Write a layout the way the encoder leaves it: bare URIs everywhere.
    fn write_encoder_output(root: &Path, name: &str, variants: usize, segments: usize) -> OutputLayout {
        let layout = OutputLayout::new(root, name);
        layout.create_dirs(variants).unwrap();

        let master = MasterPlaylist {
            variants: (0..variants)
                .map(|i| VariantStream {
                    uri: OutputLayout::variant_file_name(i),
                    bandwidth: 1_000_000 * (variants - i) as u64,
                    average_bandwidth: None,
                    resolution: None,
                    codecs: String::new(),
                })
                .collect(),
            independent_segments: true,
        };
        std::fs::write(layout.master_path(), generate_master_playlist(&master)).unwrap();

        for i in 0..variants {
            let segs = (0..segments)
                .map(|n| {
                    let file = OutputLayout::segment_file_name(n);
                    std::fs::write(layout.segment_dir(i).join(&file), b"ts").unwrap();
                    Segment { duration: 6.0, uri: file, title: None }
                })
                .collect();
            let playlist = MediaPlaylist::vod(6, segs);
            std::fs::write(layout.variant_path(i), generate_media_playlist(&playlist)).unwrap();
        }
        layout
    }

    #[test]
    fn prefix_only_touches_matching_uri_lines() {
        let text = "#EXTM3U\r\n#EXTINF:6.0,\r\nsegment_000.ts\r\n#EXTINF:6.0,\r\nstream_0/segment_001.ts\r\n";
        let (out, n) = prefix_bare_uris(text, "stream_0/", bare_segment_uri());
        assert_eq!(n, 1);
        assert_eq!(
            out,
            "#EXTM3U\r\n#EXTINF:6.0,\r\nstream_0/segment_000.ts\r\n#EXTINF:6.0,\r\nstream_0/segment_001.ts\r\n"
        );
    }

    #[test]
    fn prefix_handles_missing_trailing_newline() {
        let (out, n) = prefix_bare_uris("#EXTM3U\nstream_2.m3u8", "clip/", bare_variant_uri());
        assert_eq!(n, 1);
        assert_eq!(out, "#EXTM3U\nclip/stream_2.m3u8");
    }

    #[test]
    fn encoder_output_has_unresolved_references() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = write_encoder_output(tmp.path(), "clip", 2, 3);
        let bad = check_references(&layout.master_path()).unwrap();
        // Both variant URIs are bare, so the master cannot reach them.
        assert_eq!(bad.len(), 2);
        assert_eq!(bad[0].uri, "stream_0.m3u8");
    }

    #[test]
    fn normalize_resolves_everything() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = write_encoder_output(tmp.path(), "clip", 4, 5);

        let report = normalize_layout(&layout).unwrap();
        assert_eq!(report.fixed.len(), 5);
        assert!(check_references(&layout.master_path()).unwrap().is_empty());

        let variant = std::fs::read_to_string(layout.variant_path(3)).unwrap();
        assert!(variant.contains("\nstream_3/segment_004.ts\n"));
        let master = std::fs::read_to_string(layout.master_path()).unwrap();
        assert!(master.contains("\nclip/stream_0.m3u8\n"));
    }

    #[test]
    fn normalize_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = write_encoder_output(tmp.path(), "clip", 2, 2);

        normalize_layout(&layout).unwrap();
        let master_before = std::fs::read_to_string(layout.master_path()).unwrap();
        let variant_before = std::fs::read_to_string(layout.variant_path(1)).unwrap();

        let second = normalize_layout(&layout).unwrap();
        assert!(!second.changed());
        assert_eq!(second.already_correct.len(), 3);
        assert_eq!(std::fs::read_to_string(layout.master_path()).unwrap(), master_before);
        assert_eq!(std::fs::read_to_string(layout.variant_path(1)).unwrap(), variant_before);
    }

    #[test]
    fn missing_segment_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = write_encoder_output(tmp.path(), "clip", 1, 3);
        normalize_layout(&layout).unwrap();
        std::fs::remove_file(layout.segment_dir(0).join("segment_001.ts")).unwrap();

        let bad = check_references(&layout.master_path()).unwrap();
        assert_eq!(
            bad,
            vec![UnresolvedReference {
                playlist: layout.variant_path(0),
                uri: "stream_0/segment_001.ts".into(),
            }]
        );
        assert!(matches!(
            ensure_resolved(&layout.master_path()),
            Err(Error::PathResolution { .. })
        ));
    }

    #[test]
    fn remote_uris_are_skipped_and_absolute_paths_flagged() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("mixed.m3u8");
        std::fs::write(
            &path,
            "#EXTM3U\n#EXTINF:6.0,\nhttps://cdn.example.com/a.ts\n#EXTINF:6.0,\n/var/www/b.ts\n#EXT-X-ENDLIST\n",
        )
        .unwrap();

        let bad = check_references(&path).unwrap();
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0].uri, "/var/www/b.ts");
    }

    #[test]
    fn normalize_requires_master() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(tmp.path(), "absent");
        assert!(matches!(normalize_layout(&layout), Err(Error::Input(_))));
    }
}

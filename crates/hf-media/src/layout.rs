//! Naming of the deployed artifact tree.
//!
//! For a source named `<name>` and an output root `<out>`:
//!
//! ```text
//! <out>/<name>.m3u8                          master playlist
//! <out>/<name>/stream_<n>.m3u8               variant playlist, n in encoding order
//! <out>/<name>/stream_<n>/segment_<nnn>.ts   segments
//! ```
//!
//! Every URI recorded in a playlist is relative to the playlist itself, so
//! the whole tree can be moved or served from any prefix.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use hf_core::{Error, Result};

/// Paths of one segmented source inside an output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
    name: String,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
        }
    }

    /// Layout for `input`, rooted at `output_dir` or, when absent, next to
    /// the input file. The name is the input's file stem.
    pub fn for_source(input: &Path, output_dir: Option<&Path>) -> Result<Self> {
        let name = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Input(format!("cannot derive a name from {}", input.display())))?;

        let root = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => input
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };

        Ok(Self::new(root, name))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The published master playlist: `<out>/<name>.m3u8`.
    pub fn master_path(&self) -> PathBuf {
        self.root.join(self.master_file_name())
    }

    pub fn master_file_name(&self) -> String {
        format!("{}.m3u8", self.name)
    }

    /// Directory holding variant playlists and segment directories.
    pub fn stream_dir(&self) -> PathBuf {
        self.root.join(&self.name)
    }

    /// Where the encoder writes the master before it is published.
    pub fn unpublished_master_path(&self) -> PathBuf {
        self.stream_dir().join(self.master_file_name())
    }

    pub fn variant_file_name(index: usize) -> String {
        format!("stream_{index}.m3u8")
    }

    pub fn variant_path(&self, index: usize) -> PathBuf {
        self.stream_dir().join(Self::variant_file_name(index))
    }

    /// Variant URI as recorded in the published master.
    pub fn master_variant_uri(&self, index: usize) -> String {
        format!("{}/{}", self.name, Self::variant_file_name(index))
    }

    pub fn segment_dir_name(index: usize) -> String {
        format!("stream_{index}")
    }

    pub fn segment_dir(&self, index: usize) -> PathBuf {
        self.stream_dir().join(Self::segment_dir_name(index))
    }

    pub fn segment_file_name(sequence: usize) -> String {
        format!("segment_{sequence:03}.ts")
    }

    /// Segment filename pattern in ffmpeg `%v`/`%03d` syntax.
    pub fn encoder_segment_pattern(&self) -> PathBuf {
        self.stream_dir().join("stream_%v").join("segment_%03d.ts")
    }

    /// Variant playlist pattern in ffmpeg `%v` syntax.
    pub fn encoder_variant_pattern(&self) -> PathBuf {
        self.stream_dir().join("stream_%v.m3u8")
    }

    /// Create `<name>/` and one segment directory per rendition.
    pub fn create_dirs(&self, renditions: usize) -> Result<()> {
        for i in 0..renditions {
            let dir = self.segment_dir(i);
            std::fs::create_dir_all(&dir).map_err(|e| {
                Error::Internal(format!("failed to create {}: {e}", dir.display()))
            })?;
        }
        Ok(())
    }

    /// Indices of the variant playlists present on disk, ascending.
    pub fn existing_variants(&self) -> Result<Vec<usize>> {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(self.stream_dir())? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(idx) = name
                .strip_prefix("stream_")
                .and_then(|rest| rest.strip_suffix(".m3u8"))
                .and_then(|n| n.parse::<usize>().ok())
            {
                found.push(idx);
            }
        }
        found.sort_unstable();
        Ok(found)
    }
}

fn is_variant_stem(stem: &str) -> bool {
    stem.strip_prefix("stream_")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Find every layout under `root`: a `<name>.m3u8` file with a sibling
/// `<name>/` directory.
pub fn discover_layouts(root: &Path) -> Result<Vec<OutputLayout>> {
    if !root.is_dir() {
        return Err(Error::Input(format!("not a directory: {}", root.display())));
    }

    let mut layouts = Vec::new();
    for entry in walkdir::WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| Error::Internal(format!("walk failed: {e}")))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension() != Some(OsStr::new("m3u8")) {
            continue;
        }
        let (Some(parent), Some(stem)) = (path.parent(), path.file_stem()) else {
            continue;
        };
        let stem = stem.to_string_lossy().into_owned();
        // Variant playlists sit next to their segment directory too.
        if is_variant_stem(&stem) {
            continue;
        }
        if parent.join(&stem).is_dir() {
            layouts.push(OutputLayout::new(parent, stem));
        }
    }

    layouts.sort_by(|a, b| a.master_path().cmp(&b.master_path()));
    Ok(layouts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let layout = OutputLayout::new("/srv/public", "hero");
        assert_eq!(layout.master_path(), PathBuf::from("/srv/public/hero.m3u8"));
        assert_eq!(layout.stream_dir(), PathBuf::from("/srv/public/hero"));
        assert_eq!(layout.variant_path(2), PathBuf::from("/srv/public/hero/stream_2.m3u8"));
        assert_eq!(layout.segment_dir(0), PathBuf::from("/srv/public/hero/stream_0"));
        assert_eq!(layout.master_variant_uri(3), "hero/stream_3.m3u8");
        assert_eq!(OutputLayout::segment_file_name(7), "segment_007.ts");
        assert_eq!(
            layout.unpublished_master_path(),
            PathBuf::from("/srv/public/hero/hero.m3u8")
        );
    }

    #[test]
    fn for_source_defaults_to_input_dir() {
        let layout = OutputLayout::for_source(Path::new("public/clip.mp4"), None).unwrap();
        assert_eq!(layout.root(), Path::new("public"));
        assert_eq!(layout.name(), "clip");

        let layout =
            OutputLayout::for_source(Path::new("public/clip.mp4"), Some(Path::new("out"))).unwrap();
        assert_eq!(layout.master_path(), PathBuf::from("out/clip.m3u8"));
    }

    #[test]
    fn encoder_patterns() {
        let layout = OutputLayout::new("out", "clip");
        assert_eq!(
            layout.encoder_segment_pattern(),
            PathBuf::from("out/clip/stream_%v/segment_%03d.ts")
        );
        assert_eq!(layout.encoder_variant_pattern(), PathBuf::from("out/clip/stream_%v.m3u8"));
    }

    #[test]
    fn create_dirs_and_list_variants() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(tmp.path(), "clip");
        layout.create_dirs(3).unwrap();
        assert!(layout.segment_dir(2).is_dir());

        std::fs::write(layout.variant_path(1), "#EXTM3U\n").unwrap();
        std::fs::write(layout.variant_path(0), "#EXTM3U\n").unwrap();
        std::fs::write(layout.stream_dir().join("notes.txt"), "x").unwrap();
        assert_eq!(layout.existing_variants().unwrap(), vec![0, 1]);
    }

    #[test]
    fn discover_finds_master_with_sibling_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let a = OutputLayout::new(tmp.path(), "a");
        a.create_dirs(1).unwrap();
        std::fs::write(a.master_path(), "#EXTM3U\n").unwrap();
        std::fs::write(a.variant_path(0), "#EXTM3U\n").unwrap();
        // A playlist with no sibling directory is not a layout.
        std::fs::write(tmp.path().join("lonely.m3u8"), "#EXTM3U\n").unwrap();

        let found = discover_layouts(tmp.path()).unwrap();
        assert_eq!(found, vec![a]);
    }
}

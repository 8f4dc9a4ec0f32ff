//! Source references handed to a playback session.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a source must be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A single file the surface plays directly.
    Progressive,
    /// An HLS manifest.
    Adaptive,
}

/// An opaque URI or path identifying what to play.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRef(String);

impl SourceRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Any reference mentioning `.m3u8` (in any case) is adaptive.
    pub fn kind(&self) -> SourceKind {
        if self.0.to_ascii_lowercase().contains(".m3u8") {
            SourceKind::Adaptive
        } else {
            SourceKind::Progressive
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SourceRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_manifest_extension() {
        assert_eq!(SourceRef::new("/videos/hero.m3u8").kind(), SourceKind::Adaptive);
        assert_eq!(SourceRef::new("https://cdn/x/HERO.M3U8?token=1").kind(), SourceKind::Adaptive);
        assert_eq!(SourceRef::new("/videos/hero.mp4").kind(), SourceKind::Progressive);
        assert_eq!(SourceRef::new("").kind(), SourceKind::Progressive);
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&SourceRef::new("a.m3u8")).unwrap();
        assert_eq!(json, "\"a.m3u8\"");
    }
}

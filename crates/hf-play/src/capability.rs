//! Choosing how a source gets played on a given host.
//!
//! [`negotiate`] is a pure function of the source kind and what the host
//! offers; [`HostCapabilities::probe`] is the only part that asks the host.

use serde::{Deserialize, Serialize};

use crate::engine::{EngineFactory, Surface, HLS_MIME};
use crate::source::SourceKind;

/// What the host can do for adaptive sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HostCapabilities {
    /// The surface plays HLS manifests itself.
    pub native_hls: bool,
    /// A software adaptive engine can run here.
    pub software_engine: bool,
}

impl HostCapabilities {
    pub fn probe<S: Surface + ?Sized>(surface: &S, factory: &dyn EngineFactory) -> Self {
        Self {
            native_hls: surface.can_play_native(HLS_MIME),
            software_engine: factory.is_supported(),
        }
    }
}

/// The delivery path chosen for one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackPath {
    /// Bind the URI to the surface directly.
    NativeSupport,
    /// Drive the surface through the software engine.
    LibrarySupport,
    /// Nothing on this host can play the source.
    Unsupported,
}

/// Pick the playback path for `kind`.
///
/// Progressive files always bind directly. For manifests the surface's own
/// support wins unless `force_software` is set and an engine exists; a
/// forced request with no engine falls back to native playback.
pub fn negotiate(kind: SourceKind, caps: HostCapabilities, force_software: bool) -> PlaybackPath {
    match kind {
        SourceKind::Progressive => PlaybackPath::NativeSupport,
        SourceKind::Adaptive => {
            let prefer_native = caps.native_hls && !(force_software && caps.software_engine);
            if prefer_native {
                PlaybackPath::NativeSupport
            } else if caps.software_engine {
                PlaybackPath::LibrarySupport
            } else {
                PlaybackPath::Unsupported
            }
        }
    }
}

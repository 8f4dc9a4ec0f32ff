//! Seams between a session and the host: the playback surface and the
//! software adaptive engine.
//!
//! Engines never call back into the session. They report through an
//! [`EngineSink`], which tags every event with the engine's generation and
//! stops accepting events once the engine has been torn down.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use hf_core::config::PlaybackConfig;
use hf_core::{Error, Result};

/// MIME type a surface is asked about for intrinsic HLS support.
pub const HLS_MIME: &str = "application/vnd.apple.mpegurl";

/// A media element owned by one session.
pub trait Surface: Send + 'static {
    /// Whether the surface can play `mime` without a software engine.
    fn can_play_native(&self, mime: &str) -> bool;
    /// Point the surface at a URI.
    fn bind_source(&mut self, uri: &str);
    /// Detach whatever the surface is playing.
    fn clear_source(&mut self);
}

/// Manual rendition control exposed to callers.
pub trait EngineControl: Send + Sync {
    /// Active rendition index, if one has been selected.
    fn current_level(&self) -> Option<usize>;
    /// Pin a rendition, or `None` to return to automatic selection.
    fn set_level(&self, level: Option<usize>);
}

/// A software adaptive streaming engine bound to one surface.
///
/// Commands are non-blocking; outcomes arrive later as [`EngineEvent`]s.
pub trait Engine: Send {
    fn attach(&mut self, surface: &mut dyn Surface);
    fn load_source(&mut self, uri: &str);
    /// Restart loading from the current position after a network fault.
    fn start_load(&mut self);
    /// Flush and resume decoding after a media fault, keeping network state.
    fn recover_media_error(&mut self);
    /// Release every resource. Called at most once.
    fn destroy(&mut self);
    fn control(&self) -> Arc<dyn EngineControl>;
}

/// Creates engines for sessions.
pub trait EngineFactory: Send + Sync {
    /// Whether the host can run the software engine at all.
    fn is_supported(&self) -> bool;
    fn create(&self, config: &PlaybackConfig, sink: EngineSink) -> Result<Box<dyn Engine>>;
}

/// Fault classes an engine reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Fetch failure or timeout.
    Network,
    /// Malformed segment or decoder desync.
    Decode,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Network => write!(f, "network"),
            ErrorKind::Decode => write!(f, "decode"),
            ErrorKind::Other => write!(f, "other"),
        }
    }
}

/// A fault reported by an engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub kind: ErrorKind,
    pub fatal: bool,
    pub details: String,
}

impl ErrorEvent {
    pub fn new(kind: ErrorKind, fatal: bool, details: impl Into<String>) -> Self {
        Self {
            kind,
            fatal,
            details: details.into(),
        }
    }

    pub fn fatal(kind: ErrorKind, details: impl Into<String>) -> Self {
        Self::new(kind, true, details)
    }

    /// The matching [`Error`] value.
    pub fn to_error(&self) -> Error {
        match self.kind {
            ErrorKind::Network => Error::Network(self.details.clone()),
            ErrorKind::Decode => Error::Decode(self.details.clone()),
            ErrorKind::Other => Error::FatalSession(self.details.clone()),
        }
    }
}

/// Everything an engine reports.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Master playlist loaded; `levels` renditions discovered.
    ManifestParsed { levels: usize },
    /// A segment was fetched and buffered.
    FragmentLoaded { level: usize, sequence: u64 },
    LevelSwitched { level: usize },
    Error(ErrorEvent),
}

impl EngineEvent {
    /// Whether the event shows the engine making forward progress.
    pub fn is_progress(&self) -> bool {
        matches!(self, EngineEvent::ManifestParsed { .. } | EngineEvent::FragmentLoaded { .. })
    }
}

/// An event tagged with the generation of the engine that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedEvent {
    pub generation: u64,
    pub event: EngineEvent,
}

/// The channel end handed to one engine instance.
#[derive(Debug, Clone)]
pub struct EngineSink {
    generation: u64,
    tx: mpsc::UnboundedSender<TaggedEvent>,
    cancel: CancellationToken,
}

impl EngineSink {
    pub fn new(
        generation: u64,
        tx: mpsc::UnboundedSender<TaggedEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            generation,
            tx,
            cancel,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Queue an event for the session. Returns `false` once the engine has
    /// been torn down or the session is gone.
    pub fn emit(&self, event: EngineEvent) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.tx
            .send(TaggedEvent {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_tags_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EngineSink::new(7, tx, CancellationToken::new());
        assert!(sink.emit(EngineEvent::LevelSwitched { level: 2 }));
        let tagged = rx.try_recv().unwrap();
        assert_eq!(tagged.generation, 7);
        assert_eq!(tagged.event, EngineEvent::LevelSwitched { level: 2 });
    }

    #[test]
    fn sink_refuses_after_cancel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let sink = EngineSink::new(1, tx, token.clone());
        token.cancel();
        assert!(sink.is_cancelled());
        assert!(!sink.emit(EngineEvent::ManifestParsed { levels: 4 }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn error_event_maps_to_error() {
        let net = ErrorEvent::fatal(ErrorKind::Network, "fragLoadTimeOut");
        assert!(net.to_error().is_recoverable());
        let other = ErrorEvent::fatal(ErrorKind::Other, "internal");
        assert!(matches!(other.to_error(), Error::FatalSession(_)));
    }

    #[test]
    fn progress_events() {
        assert!(EngineEvent::FragmentLoaded { level: 0, sequence: 3 }.is_progress());
        assert!(!EngineEvent::LevelSwitched { level: 0 }.is_progress());
        assert!(!EngineEvent::Error(ErrorEvent::fatal(ErrorKind::Decode, "x")).is_progress());
    }
}

//! hf-play: playback sessions for segmented HLS output.
//!
//! A caller opens a session on a surface with a source reference. The
//! session decides once per source whether the surface plays it natively or
//! through a software engine, and keeps an attached engine alive across
//! network and decode faults.
//!
//! # Modules
//!
//! - [`source`] - Source references and progressive/adaptive classification
//! - [`capability`] - Host capability probing and path negotiation
//! - [`engine`] - Surface and engine traits, engine events
//! - [`supervisor`] - Fault classification and recovery policy
//! - [`session`] - Single-surface session state machine
//! - [`manager`] - Registry of open sessions
//! - [`pool`] - Preloaded surfaces

pub mod capability;
pub mod engine;
pub mod manager;
pub mod pool;
pub mod session;
pub mod source;
pub mod supervisor;

#[cfg(test)]
mod mock;

pub use capability::{negotiate, HostCapabilities, PlaybackPath};
pub use engine::{
    Engine, EngineControl, EngineEvent, EngineFactory, EngineSink, ErrorEvent, ErrorKind, Surface,
    TaggedEvent, HLS_MIME,
};
pub use manager::{OpenRequest, SessionHandle, SessionManager};
pub use pool::PreloadPool;
pub use session::{ErrorObserver, EventOutcome, PlaybackSession, SessionState};
pub use source::{SourceKind, SourceRef};
pub use supervisor::{recovery_for, Recovery, Supervisor};

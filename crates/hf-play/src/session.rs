//! One playback surface and the engine driving it.
//!
//! A session resolves each distinct source once, binds it natively or
//! through a software engine, and applies the supervisor's recovery policy
//! to engine faults. Teardown always runs in the same order: cancel the
//! engine's token, destroy the engine, clear the surface.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use hf_core::config::PlaybackConfig;
use hf_core::{Error, Result, SessionId};

use crate::capability::{negotiate, HostCapabilities, PlaybackPath};
use crate::engine::{
    Engine, EngineControl, EngineEvent, EngineFactory, EngineSink, ErrorEvent, ErrorKind,
    Surface, TaggedEvent,
};
use crate::source::{SourceKind, SourceRef};
use crate::supervisor::{Recovery, Supervisor};

/// Callback receiving every engine fault, recovered or not.
pub type ErrorObserver = Arc<dyn Fn(&ErrorEvent) + Send + Sync>;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// No source bound yet.
    Idle,
    /// Manifest bound to the surface's own HLS support.
    Native,
    /// Single file bound to the surface.
    Progressive,
    /// Software engine attached.
    Adaptive,
    /// Nothing on this host can play the source.
    Unsupported { reason: String },
    /// The engine hit an unrecoverable fault and was torn down.
    Failed { message: String },
    Closed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Failed { .. } | SessionState::Closed)
    }
}

/// What [`PlaybackSession::handle_event`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// From a torn-down engine, or the session is closed.
    Stale,
    /// Forward progress; the fault count was reset.
    Progress,
    /// Informational only.
    Noted,
    /// A fault and the recovery applied to it.
    Fault(Recovery),
}

struct ActiveEngine {
    engine: Box<dyn Engine>,
    generation: u64,
    cancel: CancellationToken,
}

pub struct PlaybackSession<S: Surface> {
    id: SessionId,
    surface: S,
    factory: Arc<dyn EngineFactory>,
    config: PlaybackConfig,
    observer: Option<ErrorObserver>,
    source: Option<SourceRef>,
    path: Option<PlaybackPath>,
    bound: bool,
    engine: Option<ActiveEngine>,
    generation: u64,
    supervisor: Supervisor,
    state: SessionState,
    tx: mpsc::UnboundedSender<TaggedEvent>,
    rx: Option<mpsc::UnboundedReceiver<TaggedEvent>>,
    token: CancellationToken,
}

impl<S: Surface> PlaybackSession<S> {
    pub fn new(
        surface: S,
        factory: Arc<dyn EngineFactory>,
        config: PlaybackConfig,
        observer: Option<ErrorObserver>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let supervisor = Supervisor::new(config.max_consecutive_fatal);
        Self {
            id: SessionId::new(),
            surface,
            factory,
            config,
            observer,
            source: None,
            path: None,
            bound: false,
            engine: None,
            generation: 0,
            supervisor,
            state: SessionState::Idle,
            tx,
            rx: Some(rx),
            token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn source(&self) -> Option<&SourceRef> {
        self.source.as_ref()
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Consecutive fatal faults since the engine last made progress.
    pub fn fault_count(&self) -> u32 {
        self.supervisor.consecutive_fatal()
    }

    /// Cancelled when the session closes.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Manual rendition control, while a software engine is attached.
    pub fn engine_control(&self) -> Option<Arc<dyn EngineControl>> {
        self.engine.as_ref().map(|active| active.engine.control())
    }

    /// Hand the event stream to an external pump. After this,
    /// [`drain_events`](Self::drain_events) has nothing to drain.
    pub fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<TaggedEvent>> {
        self.rx.take()
    }

    /// Resolve and bind `source`.
    ///
    /// Setting the source the session already plays is a no-op returning
    /// the previous outcome, unless the session failed. Any other source
    /// tears the current binding down first.
    pub fn set_source(&mut self, source: impl Into<SourceRef>) -> Result<PlaybackPath> {
        let source = source.into();
        if self.state == SessionState::Closed {
            return Err(Error::FatalSession(format!("session {} is closed", self.id)));
        }

        if self.source.as_ref() == Some(&source) && !matches!(self.state, SessionState::Failed { .. }) {
            return match self.path {
                Some(PlaybackPath::Unsupported) | None => Err(Error::UnsupportedFormat(source.to_string())),
                Some(path) => Ok(path),
            };
        }

        self.teardown();

        let kind = source.kind();
        let caps = HostCapabilities::probe(&self.surface, self.factory.as_ref());
        let path = negotiate(kind, caps, self.config.force_software_engine);
        tracing::info!(
            session_id = %self.id,
            source = %source,
            ?kind,
            ?path,
            native_hls = caps.native_hls,
            software_engine = caps.software_engine,
            "Resolved playback path"
        );

        self.source = Some(source.clone());
        self.path = Some(path);

        match path {
            PlaybackPath::NativeSupport => {
                self.surface.bind_source(source.as_str());
                self.bound = true;
                self.state = match kind {
                    SourceKind::Adaptive => SessionState::Native,
                    SourceKind::Progressive => SessionState::Progressive,
                };
            }
            PlaybackPath::LibrarySupport => {
                if let Err(e) = self.attach_engine(&source) {
                    self.state = SessionState::Failed {
                        message: e.to_string(),
                    };
                    return Err(e);
                }
                self.state = SessionState::Adaptive;
            }
            PlaybackPath::Unsupported => {
                let reason = format!("no native or software HLS support for {source}");
                tracing::warn!(session_id = %self.id, %reason, "Source unsupported");
                self.state = SessionState::Unsupported {
                    reason: reason.clone(),
                };
                return Err(Error::UnsupportedFormat(reason));
            }
        }

        Ok(path)
    }

    fn attach_engine(&mut self, source: &SourceRef) -> Result<()> {
        self.generation += 1;
        let cancel = self.token.child_token();
        let sink = EngineSink::new(self.generation, self.tx.clone(), cancel.clone());

        let mut engine = self.factory.create(&self.config, sink)?;
        engine.attach(&mut self.surface);
        engine.load_source(source.as_str());
        self.bound = true;
        if let Some(level) = self.config.start_level {
            engine.control().set_level(Some(level));
        }

        self.supervisor.reset();
        tracing::debug!(
            session_id = %self.id,
            generation = self.generation,
            worker = self.config.buffer.enable_worker,
            "Attached software engine"
        );
        self.engine = Some(ActiveEngine {
            engine,
            generation: self.generation,
            cancel,
        });
        Ok(())
    }

    /// The fault observer, for callers that report faults outside a lock.
    pub fn observer(&self) -> Option<ErrorObserver> {
        self.observer.clone()
    }

    /// Apply one engine event and report a fault to the observer.
    pub fn handle_event(&mut self, tagged: TaggedEvent) -> EventOutcome {
        let (outcome, fault) = self.apply_event(tagged);
        if let (Some(observer), Some(fault)) = (&self.observer, fault) {
            observer(&fault);
        }
        outcome
    }

    /// Apply one engine event without calling the observer. A fault that
    /// still has to be reported is handed back.
    pub fn apply_event(&mut self, tagged: TaggedEvent) -> (EventOutcome, Option<ErrorEvent>) {
        let current = self.engine.as_ref().map(|active| active.generation);
        if current != Some(tagged.generation) || self.state.is_terminal() {
            tracing::trace!(
                session_id = %self.id,
                generation = tagged.generation,
                "Ignoring stale engine event"
            );
            return (EventOutcome::Stale, None);
        }

        match tagged.event {
            event @ (EngineEvent::ManifestParsed { .. } | EngineEvent::FragmentLoaded { .. }) => {
                tracing::trace!(session_id = %self.id, ?event, "Engine progress");
                self.supervisor.on_progress();
                (EventOutcome::Progress, None)
            }
            EngineEvent::LevelSwitched { level } => {
                tracing::debug!(session_id = %self.id, level, "Rendition switched");
                (EventOutcome::Noted, None)
            }
            EngineEvent::Error(event) => {
                let recovery = self.handle_fault(&event);
                (EventOutcome::Fault(recovery), Some(event))
            }
        }
    }

    fn handle_fault(&mut self, event: &ErrorEvent) -> Recovery {
        let recovery = self.supervisor.on_error(event);
        tracing::warn!(
            session_id = %self.id,
            generation = self.generation,
            kind = %event.kind,
            fatal = event.fatal,
            consecutive = self.supervisor.consecutive_fatal(),
            ?recovery,
            details = %event.details,
            "Engine fault"
        );

        let Some(active) = self.engine.as_mut() else {
            return recovery;
        };
        match recovery {
            Recovery::Report => {}
            Recovery::RestartLoad => active.engine.start_load(),
            Recovery::RecoverMedia => active.engine.recover_media_error(),
            Recovery::Teardown => {
                let message = if self.supervisor.exhausted() && event.kind != ErrorKind::Other {
                    format!(
                        "{} consecutive fatal faults, last {}: {}",
                        self.supervisor.consecutive_fatal(),
                        event.kind,
                        event.details
                    )
                } else {
                    format!("fatal {} error: {}", event.kind, event.details)
                };
                self.teardown();
                tracing::error!(session_id = %self.id, %message, "Session failed");
                self.state = SessionState::Failed { message };
            }
        }
        recovery
    }

    /// Apply every queued event. Returns how many were handled.
    pub fn drain_events(&mut self) -> usize {
        let (n, faults) = self.drain_deferred();
        if let Some(observer) = &self.observer {
            for fault in &faults {
                observer(fault);
            }
        }
        n
    }

    /// Like [`drain_events`](Self::drain_events), but returns the faults
    /// for the caller to report once it has released the session.
    pub fn drain_deferred(&mut self) -> (usize, Vec<ErrorEvent>) {
        let mut events = Vec::new();
        if let Some(rx) = self.rx.as_mut() {
            while let Ok(ev) = rx.try_recv() {
                events.push(ev);
            }
        }
        let n = events.len();
        let faults = events
            .into_iter()
            .filter_map(|ev| self.apply_event(ev).1)
            .collect();
        (n, faults)
    }

    /// The terminal error, if the session failed.
    pub fn failure(&self) -> Option<Error> {
        match &self.state {
            SessionState::Failed { message } => Some(Error::FatalSession(message.clone())),
            _ => None,
        }
    }

    fn teardown(&mut self) {
        if let Some(mut active) = self.engine.take() {
            active.cancel.cancel();
            active.engine.destroy();
            tracing::debug!(session_id = %self.id, generation = active.generation, "Destroyed engine");
        }
        if self.bound {
            self.surface.clear_source();
            self.bound = false;
        }
    }

    /// Release the engine and the surface binding. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.teardown();
        self.token.cancel();
        self.source = None;
        self.path = None;
        self.state = SessionState::Closed;
        tracing::info!(session_id = %self.id, "Closed playback session");
    }
}

impl<S: Surface> Drop for PlaybackSession<S> {
    fn drop(&mut self) {
        self.close();
    }
}

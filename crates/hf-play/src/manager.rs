//! Thread-safe registry of open playback sessions.
//!
//! Each session sits behind its own mutex so only one transition per session
//! is in flight, while different sessions proceed independently.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use hf_core::config::{PlaybackConfig, PlaybackOverrides};
use hf_core::{Error, Result, SessionId};

use crate::capability::PlaybackPath;
use crate::engine::{EngineFactory, Surface};
use crate::session::{ErrorObserver, PlaybackSession, SessionState};
use crate::source::SourceRef;

/// Everything needed to start playing on a surface.
#[derive(Clone)]
pub struct OpenRequest {
    pub source: SourceRef,
    pub observer: Option<ErrorObserver>,
    pub overrides: PlaybackOverrides,
}

impl OpenRequest {
    pub fn new(source: impl Into<SourceRef>) -> Self {
        Self {
            source: source.into(),
            observer: None,
            overrides: PlaybackOverrides::default(),
        }
    }

    pub fn with_observer(mut self, observer: ErrorObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_overrides(mut self, overrides: PlaybackOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Opaque reference to an open session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    id: SessionId,
    path: PlaybackPath,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Path chosen when the session was opened.
    pub fn path(&self) -> PlaybackPath {
        self.path
    }
}

type SharedSession<S> = Arc<Mutex<PlaybackSession<S>>>;

/// Owns every open [`PlaybackSession`].
pub struct SessionManager<S: Surface> {
    sessions: Arc<DashMap<SessionId, SharedSession<S>>>,
    factory: Arc<dyn EngineFactory>,
    config: PlaybackConfig,
}

impl<S: Surface> Clone for SessionManager<S> {
    fn clone(&self) -> Self {
        Self {
            sessions: self.sessions.clone(),
            factory: self.factory.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: Surface> SessionManager<S> {
    pub fn new(factory: Arc<dyn EngineFactory>, config: PlaybackConfig) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            factory,
            config,
        }
    }

    /// Open a session on `surface` and bind `request.source`.
    ///
    /// An unsupported source returns [`Error::UnsupportedFormat`]; the
    /// session is closed and the surface released without ever being bound.
    /// Inside a Tokio runtime an event pump is spawned for the session.
    pub fn open(&self, surface: S, request: OpenRequest) -> Result<SessionHandle> {
        let config = self.config.with_overrides(&request.overrides);
        let mut session = PlaybackSession::new(surface, self.factory.clone(), config, request.observer);
        let path = session.set_source(request.source)?;

        let id = session.id();
        let rx = match tokio::runtime::Handle::try_current() {
            Ok(_) => session.take_event_receiver(),
            Err(_) => None,
        };
        let token = session.cancellation_token();
        let shared = Arc::new(Mutex::new(session));
        self.sessions.insert(id, shared.clone());

        if let Some(mut rx) = rx {
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        event = rx.recv() => match event {
                            Some(event) => {
                                let (fault, observer) = {
                                    let mut session = shared.lock();
                                    let (_, fault) = session.apply_event(event);
                                    (fault, session.observer())
                                };
                                // The observer may call back into the manager.
                                if let (Some(fault), Some(observer)) = (fault, observer) {
                                    observer(&fault);
                                }
                            }
                            None => break,
                        },
                    }
                }
                tracing::trace!(session_id = %id, "Event pump stopped");
            });
        }

        tracing::info!(session_id = %id, ?path, sessions = self.sessions.len(), "Opened playback session");
        Ok(SessionHandle { id, path })
    }

    /// Close and forget a session. Returns `false` if it was unknown or
    /// already closed.
    pub fn close(&self, handle: &SessionHandle) -> bool {
        match self.sessions.remove(&handle.id) {
            Some((_, session)) => {
                session.lock().close();
                true
            }
            None => {
                tracing::debug!(session_id = %handle.id, "Close on unknown session");
                false
            }
        }
    }

    /// Point an open session at a different source.
    pub fn change_source(
        &self,
        handle: &SessionHandle,
        source: impl Into<SourceRef>,
    ) -> Result<PlaybackPath> {
        let session = self.get(handle)?;
        let result = session.lock().set_source(source);
        result
    }

    /// Apply the session's queued events, reporting faults to its observer
    /// after the session lock is released. `None` for an unknown handle.
    pub fn drain_events(&self, handle: &SessionHandle) -> Option<usize> {
        let session = self.sessions.get(&handle.id).map(|entry| entry.value().clone())?;
        let (handled, faults, observer) = {
            let mut guard = session.lock();
            let (handled, faults) = guard.drain_deferred();
            (handled, faults, guard.observer())
        };
        if let Some(observer) = observer {
            for fault in &faults {
                observer(fault);
            }
        }
        Some(handled)
    }

    /// Run `f` with exclusive access to the session.
    ///
    /// `f` runs under the session lock and must not call back into the
    /// manager for the same session.
    pub fn with_session<R>(
        &self,
        handle: &SessionHandle,
        f: impl FnOnce(&mut PlaybackSession<S>) -> R,
    ) -> Option<R> {
        let session = self.sessions.get(&handle.id).map(|entry| entry.value().clone())?;
        let mut guard = session.lock();
        Some(f(&mut guard))
    }

    pub fn state(&self, handle: &SessionHandle) -> Option<SessionState> {
        self.with_session(handle, |s| s.state().clone())
    }

    fn get(&self, handle: &SessionHandle) -> Result<SharedSession<S>> {
        self.sessions
            .get(&handle.id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::Validation(format!("unknown session {}", handle.id)))
    }

    /// Close every session.
    pub fn close_all(&self) -> usize {
        let ids: Vec<SessionId> = self.sessions.iter().map(|e| *e.key()).collect();
        let mut closed = 0;
        for id in ids {
            if let Some((_, session)) = self.sessions.remove(&id) {
                session.lock().close();
                closed += 1;
            }
        }
        closed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

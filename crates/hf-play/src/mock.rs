//! Recording test doubles for surfaces and engines.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use hf_core::config::PlaybackConfig;
use hf_core::Result;

use crate::engine::{Engine, EngineControl, EngineFactory, EngineSink, Surface};

/// Ordered record of every call made on the doubles.
#[derive(Debug, Default)]
pub struct CallLog {
    calls: Mutex<Vec<String>>,
}

impl CallLog {
    pub fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    pub fn position(&self, call: &str) -> Option<usize> {
        self.calls.lock().iter().position(|c| c == call)
    }
}

pub struct MockSurface {
    native_hls: bool,
    log: Arc<CallLog>,
    pub bound: Option<String>,
}

impl MockSurface {
    pub fn new(native_hls: bool, log: Arc<CallLog>) -> Self {
        Self {
            native_hls,
            log,
            bound: None,
        }
    }
}

impl Surface for MockSurface {
    fn can_play_native(&self, mime: &str) -> bool {
        self.native_hls && mime == crate::engine::HLS_MIME
    }

    fn bind_source(&mut self, uri: &str) {
        self.log.record(format!("surface.bind:{uri}"));
        self.bound = Some(uri.to_string());
    }

    fn clear_source(&mut self) {
        self.log.record("surface.clear");
        self.bound = None;
    }
}

#[derive(Default)]
pub struct MockControl {
    level: Mutex<Option<usize>>,
}

impl EngineControl for MockControl {
    fn current_level(&self) -> Option<usize> {
        *self.level.lock()
    }

    fn set_level(&self, level: Option<usize>) {
        *self.level.lock() = level;
    }
}

pub struct MockEngine {
    id: usize,
    log: Arc<CallLog>,
    control: Arc<MockControl>,
}

impl MockEngine {
    fn record(&self, call: &str) {
        self.log.record(format!("engine{}.{call}", self.id));
    }
}

impl Engine for MockEngine {
    fn attach(&mut self, _surface: &mut dyn Surface) {
        self.record("attach");
    }

    fn load_source(&mut self, uri: &str) {
        self.record(&format!("load:{uri}"));
    }

    fn start_load(&mut self) {
        self.record("start_load");
    }

    fn recover_media_error(&mut self) {
        self.record("recover_media_error");
    }

    fn destroy(&mut self) {
        self.record("destroy");
    }

    fn control(&self) -> Arc<dyn EngineControl> {
        self.control.clone()
    }
}

/// Creates [`MockEngine`]s and keeps each engine's sink so tests can emit
/// events as that engine.
pub struct MockFactory {
    supported: bool,
    log: Arc<CallLog>,
    created: AtomicUsize,
    sinks: Mutex<Vec<EngineSink>>,
}

impl MockFactory {
    pub fn new(supported: bool, log: Arc<CallLog>) -> Self {
        Self {
            supported,
            log,
            created: AtomicUsize::new(0),
            sinks: Mutex::new(Vec::new()),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Sink of the `n`th engine created.
    pub fn sink(&self, n: usize) -> EngineSink {
        self.sinks.lock()[n].clone()
    }
}

impl EngineFactory for MockFactory {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(&self, _config: &PlaybackConfig, sink: EngineSink) -> Result<Box<dyn Engine>> {
        let id = self.created.fetch_add(1, Ordering::SeqCst);
        self.log.record(format!("factory.create:{id}"));
        self.sinks.lock().push(sink);
        Ok(Box::new(MockEngine {
            id,
            log: self.log.clone(),
            control: Arc::new(MockControl::default()),
        }))
    }
}

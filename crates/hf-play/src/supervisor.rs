//! Error-recovery policy for software engine faults.
//!
//! | fault              | action                             |
//! |--------------------|------------------------------------|
//! | network, fatal     | restart loading at current position |
//! | decode, fatal      | recover the media pipeline in place |
//! | other, fatal       | tear the engine down               |
//! | anything non-fatal | report only                        |
//!
//! Fatal faults are counted until the engine makes progress again. Once the
//! count reaches the configured budget the next action is always teardown.

use serde::{Deserialize, Serialize};

use crate::engine::{ErrorEvent, ErrorKind};

/// What the session does in response to a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recovery {
    Report,
    RestartLoad,
    RecoverMedia,
    Teardown,
}

/// The per-class recovery for a single fault, ignoring fault history.
pub fn recovery_for(event: &ErrorEvent) -> Recovery {
    if !event.fatal {
        return Recovery::Report;
    }
    match event.kind {
        ErrorKind::Network => Recovery::RestartLoad,
        ErrorKind::Decode => Recovery::RecoverMedia,
        ErrorKind::Other => Recovery::Teardown,
    }
}

/// Consecutive-fault accounting for one engine.
#[derive(Debug, Clone)]
pub struct Supervisor {
    max_consecutive_fatal: u32,
    consecutive_fatal: u32,
    total_faults: u64,
}

impl Supervisor {
    /// A budget of zero is treated as one.
    pub fn new(max_consecutive_fatal: u32) -> Self {
        Self {
            max_consecutive_fatal: max_consecutive_fatal.max(1),
            consecutive_fatal: 0,
            total_faults: 0,
        }
    }

    pub fn on_progress(&mut self) {
        if self.consecutive_fatal > 0 {
            tracing::debug!(cleared = self.consecutive_fatal, "Engine progressed, fault count reset");
        }
        self.consecutive_fatal = 0;
    }

    /// Classify `event` and update the counters.
    pub fn on_error(&mut self, event: &ErrorEvent) -> Recovery {
        self.total_faults += 1;
        let recovery = recovery_for(event);
        if !event.fatal {
            return recovery;
        }

        self.consecutive_fatal += 1;
        if self.consecutive_fatal >= self.max_consecutive_fatal {
            Recovery::Teardown
        } else {
            recovery
        }
    }

    /// Whether the budget is spent.
    pub fn exhausted(&self) -> bool {
        self.consecutive_fatal >= self.max_consecutive_fatal
    }

    pub fn consecutive_fatal(&self) -> u32 {
        self.consecutive_fatal
    }

    pub fn total_faults(&self) -> u64 {
        self.total_faults
    }

    /// Start over for a new engine.
    pub fn reset(&mut self) {
        self.consecutive_fatal = 0;
        self.total_faults = 0;
    }
}

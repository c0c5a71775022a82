//! Install event emitter port.
//!
//! This port abstracts event emission, allowing the session coordinator to
//! publish events without coupling to how presentation consumes them.

use crate::events::InstallEvent;

/// Port for emitting install events.
///
/// Implementations handle the actual event delivery (queues, terminals, IPC).
pub trait InstallEventEmitterPort: Send + Sync {
    /// Emit an install event.
    ///
    /// This method must not block; workers call it between chunks.
    fn emit(&self, event: InstallEvent);

    /// Clone this emitter into a boxed trait object.
    ///
    /// This enables cloning of `Arc<dyn InstallEventEmitterPort>` without
    /// requiring the underlying type to implement Clone.
    fn clone_box(&self) -> Box<dyn InstallEventEmitterPort>;
}

/// A no-op emitter for tests and headless contexts.
#[derive(Debug, Clone, Default)]
pub struct NoopInstallEmitter;

impl NoopInstallEmitter {
    /// Create a new no-op emitter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl InstallEventEmitterPort for NoopInstallEmitter {
    fn emit(&self, _event: InstallEvent) {}

    fn clone_box(&self) -> Box<dyn InstallEventEmitterPort> {
        Box::new(self.clone())
    }
}

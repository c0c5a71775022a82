//! Mirror download engine and session coordination.
//!
//! - `coordinator` - per-package admission, cancellation and event fan-out
//! - `engine` - ordered mirror fallback with per-attempt timeouts
//! - `progress` - throttling and sliding-window speed
//! - `transport` - the mirror transport port and its reqwest implementation

pub mod coordinator;
pub mod engine;
pub mod progress;
pub mod transport;

pub use coordinator::{EventHub, EventSubscription, SessionCoordinator, SessionHandle};
pub use engine::{
    EngineConfig, FetchOutcome, FetchReporter, MirrorDownloadEngine, NoopReporter, ProgressSample,
};
pub use progress::{ProgressThrottle, SpeedWindow};
pub use transport::{MirrorTransport, ReqwestTransport, TransferStream};


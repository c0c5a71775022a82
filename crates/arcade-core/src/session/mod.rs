//! Download session types and the session state machine.
//!
//! ```text
//! Idle -> Started -> InProgress* -> Extracting -> Completed
//!   any state -> Failed
//!   Started | InProgress | Extracting -> Idle   (cancellation)
//! ```
//!
//! `Completed` and `Failed` are terminal. Returning to `Idle` also ends the
//! session; the coordinator then admits a new one for the same package.

mod state;

pub use state::{DownloadSession, SessionKind, SessionState};

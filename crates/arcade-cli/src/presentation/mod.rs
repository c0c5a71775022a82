//! Shared CLI presentation utilities.
//!
//! - Keep this module format-only: no launcher logic
//! - `progress` renders session events while an operation runs

pub mod progress;
pub mod tables;

pub use progress::{EventRenderer, follow};
pub use tables::{format_optional, print_separator, truncate_string};

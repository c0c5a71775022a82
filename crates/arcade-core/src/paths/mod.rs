//! Path utilities for arcade data directories and the install root.
//!
//! This module provides the canonical path resolution for all components:
//! - Data root (registry, settings, manifest cache, backups)
//! - Install root (one directory per package, plus a staging area)
//!
//! # Design
//!
//! - Returns `PathBuf` and `PathError` for clear error handling
//! - No interactive/terminal I/O - adapters handle user prompts separately
//! - OS-specific logic is kept private in `platform`

mod error;
mod platform;
mod resolver;

pub use error::PathError;
pub use platform::{data_root, ensure_directory, resolve_install_root};
pub use resolver::ResolvedPaths;

//! Catalog domain types.
//!
//! The catalog is the manifest's view of the world: which packages exist,
//! which version is current, and where the bytes can be fetched from.
//! Entries are read-only to the orchestrator except for status annotation.

mod entry;
mod manifest;
mod size;

pub use entry::{CatalogEntry, EntryStatus, Mirror, PackageId, prioritize_mirrors};
pub use manifest::parse_manifest;
pub use size::parse_size;

//! Version ordering for catalog and installed versions.
//!
//! Manifests are written by hand, so versions are parsed leniently: a leading
//! `v` is ignored and missing minor/patch components are padded with zero
//! before semver parsing. Strings that still are not semver fall back to a
//! numeric comparison of dot-separated segments, then to plain string order.

use std::cmp::Ordering;

use semver::Version;

/// Parse a version string into a semver `Version`, padding short forms.
pub fn parse_lenient(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    if let Ok(version) = Version::parse(trimmed) {
        return Some(version);
    }

    // Split off pre-release/build metadata so "2.2-beta" pads to "2.2.0-beta".
    let split = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(split);
    let parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }

    let mut padded = parts.join(".");
    for _ in parts.len()..3 {
        padded.push_str(".0");
    }
    padded.push_str(suffix);
    Version::parse(&padded).ok()
}

/// Compare two version strings.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (parse_lenient(a), parse_lenient(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => compare_segments(a, b),
    }
}

/// Whether `candidate` is strictly newer than `current`.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    compare_versions(candidate, current) == Ordering::Greater
}

fn compare_segments(a: &str, b: &str) -> Ordering {
    let left: Vec<&str> = a.trim().split(['.', '-', '_']).collect();
    let right: Vec<&str> = b.trim().split(['.', '-', '_']).collect();

    for i in 0..left.len().max(right.len()) {
        let l = left.get(i).copied().unwrap_or("0");
        let r = right.get(i).copied().unwrap_or("0");
        let ord = match (l.parse::<u64>(), r.parse::<u64>()) {
            (Ok(l), Ok(r)) => l.cmp(&r),
            _ => l.cmp(r),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

//! Deterministic name allocation from tree position.
//!
//! A name is the sanitized, hyphen-joined chart-relative path of the node,
//! followed by a fixed-length blake3 suffix of the unsanitized path. The
//! suffix keeps names unique when sanitization or truncation collapses two
//! distinct paths onto the same prefix, and is a pure function of the path:
//! identical tree shapes produce identical names in any process.

use crate::types::ResourceName;

/// Longest allowed allocated name, matching common naming-rule limits.
pub const MAX_NAME_LEN: usize = 63;

const HASH_SUFFIX_LEN: usize = 8;

/// Allocate a name from chart-relative path segments.
pub fn allocate_name(segments: &[String]) -> ResourceName {
    let digest = blake3::hash(segments.join("/").as_bytes())
        .to_hex()
        .to_string();
    let suffix = &digest[..HASH_SUFFIX_LEN];

    let parts: Vec<String> = segments
        .iter()
        .map(|s| sanitize_segment(s))
        .filter(|s| !s.is_empty())
        .collect();
    let mut prefix = parts.join("-");

    let budget = MAX_NAME_LEN - HASH_SUFFIX_LEN - 1;
    if prefix.len() > budget {
        prefix.truncate(budget);
        prefix = prefix.trim_end_matches('-').to_owned();
    }
    // Every segment can sanitize away (e.g. a path of punctuation); the
    // suffix still distinguishes, but the name needs a readable head.
    if prefix.is_empty() {
        prefix = "c".to_owned();
    }

    ResourceName::new(format!("{prefix}-{suffix}"))
}

/// Lowercase a path segment and replace anything outside `[a-z0-9]` with a
/// single hyphen, trimming leading/trailing hyphens.
fn sanitize_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_hyphen = true;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            out.push('-');
            last_hyphen = true;
        }
    }
    out.trim_end_matches('-').to_owned()
}

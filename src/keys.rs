//! Cache Keys
//!
//! Canonical key construction. Requests that differ only in letter case or
//! whitespace map to the same key.

/// Prefix shared by every key this crate writes.
pub const KEY_PREFIX: &str = "cache";

// == Normalize ==
/// Lowercases, trims, and collapses each whitespace run into a single `_`.
///
/// All other characters are left as they are.
pub fn normalize(raw: &str) -> String {
    raw.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

// == Build Key ==
/// Builds `cache:<namespace>:<part>[:<part>...]`, normalizing every part.
///
/// The namespace is a fixed literal and is used verbatim.
pub fn build_key(namespace: &str, parts: &[&str]) -> String {
    let mut key = format!("{}:{}", KEY_PREFIX, namespace);
    for part in parts {
        key.push(':');
        key.push_str(&normalize(part));
    }
    key
}

/// Pattern-free prefix matching every key under [`KEY_PREFIX`].
pub fn all_keys_prefix() -> String {
    format!("{}:", KEY_PREFIX)
}

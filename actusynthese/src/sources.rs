// Citation deduplication
use std::collections::HashSet;

use crate::llm::Source;

/// Append `incoming` to `existing` and keep only the first occurrence of each uri,
/// preserving relative order.
pub fn normalize(existing: &[Source], incoming: &[Source]) -> Vec<Source> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(existing.len() + incoming.len());
    existing
        .iter()
        .chain(incoming)
        .filter(|s| seen.insert(s.uri.as_str()))
        .cloned()
        .collect()
}

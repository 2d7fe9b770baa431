//! Column index: per-page `(min, max)` bounds for pruning. Bloom filters
//! and the on-disk page-index layout are the external collaborator's
//! concern; this module only owns the in-memory entries and the search
//! predicate over them.

use crate::types::compare_bytes;
use std::cmp::Ordering;

#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub min: Vec<u8>,
    pub max: Vec<u8>,
    pub null_count: usize,
}

/// Per-page bounds for one byte-array-backed column, built incrementally as
/// row groups are written.
#[derive(Debug, Clone, Default)]
pub struct ColumnIndex {
    pub pages: Vec<IndexEntry>,
}

impl ColumnIndex {
    pub fn new() -> Self {
        ColumnIndex::default()
    }

    /// Records one page's bounds, truncated to `size_limit` bytes (0 means
    /// unlimited). Truncation rounds outward — the min down, the max up —
    /// so pruning on truncated bounds never excludes a page that actually
    /// holds the target.
    pub fn push(&mut self, min: &[u8], max: &[u8], null_count: usize, size_limit: usize) {
        self.pages.push(IndexEntry { min: truncate_min(min, size_limit), max: truncate_max(max, size_limit), null_count });
    }

    /// First page whose bounds could contain `target`, or `None` if every
    /// page's range excludes it.
    pub fn search(&self, target: &[u8]) -> Option<usize> {
        self.pages
            .iter()
            .position(|e| compare_bytes(&e.min, target) != Ordering::Greater && compare_bytes(&e.max, target) != Ordering::Less)
    }
}

pub fn truncate_min(bytes: &[u8], size_limit: usize) -> Vec<u8> {
    if size_limit == 0 || bytes.len() <= size_limit {
        bytes.to_vec()
    } else {
        bytes[..size_limit].to_vec()
    }
}

/// Rounds the truncated prefix up so it stays `>= bytes` under byte-array
/// ordering: increment the last non-0xFF byte and drop everything after it.
/// If the whole prefix is 0xFF, no truncation can stay sound, so the
/// untruncated value is kept.
pub fn truncate_max(bytes: &[u8], size_limit: usize) -> Vec<u8> {
    if size_limit == 0 || bytes.len() <= size_limit {
        return bytes.to_vec();
    }
    let mut truncated = bytes[..size_limit].to_vec();
    for i in (0..truncated.len()).rev() {
        if truncated[i] < 0xFF {
            truncated[i] += 1;
            truncated.truncate(i + 1);
            return truncated;
        }
    }
    bytes.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_max_still_dominates_the_untruncated_value() {
        let max = b"value_super_big_9999";
        let truncated = truncate_max(max, 5);
        assert_eq!(compare_bytes(&truncated, max), Ordering::Greater);
    }

    #[test]
    fn search_finds_the_page_despite_truncated_overlap() {
        let mut index = ColumnIndex::new();
        index.push(b"value_aaa_0", b"value_mmm_9", 0, 5);
        index.push(b"value_mmm_9", b"value_zzz_9", 0, 5);
        let target = b"value_super_big_0";
        let page = index.search(target).expect("a page must claim this target");
        // both truncated ranges start with "value" and could plausibly
        // overlap; what matters is we found one, not which.
        assert!(page == 0 || page == 1);
    }

    #[test]
    fn out_of_range_target_finds_nothing() {
        let mut index = ColumnIndex::new();
        index.push(b"a", b"m", 0, 0);
        assert!(index.search(b"z").is_none());
    }
}

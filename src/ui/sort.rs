//! Projection ordering and the title author heuristic

use crate::download::record::DownloadRecord;
use rand::seq::SliceRandom;
use regex::Regex;
use std::sync::LazyLock;

// Optional leading "(event)", then "[artist]" or "[artist (circle)]".
// Only ASCII whitespace may separate the two.
static AUTHOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\([^\[\]()]*\))?(?-u:\s)*\[([^\[\]()]*)(?:\(([^\[\]()]*)\))?\]")
        .expect("author pattern is valid")
});

/// Author derived from a gallery title
///
/// Returns the parenthesised name inside the leading brackets when present,
/// else the bracketed text verbatim, else an empty string. Nested brackets
/// never match, and a leading "(event)" must be followed by ASCII whitespace
/// or the bracket itself. The author sort then compares these strings by
/// Unicode code point.
///
/// ```
/// use shelf::ui::sort::extract_author;
/// assert_eq!(extract_author("[ArtistA (CircleB)] Work"), "CircleB");
/// assert_eq!(extract_author("[ArtistA] Work"), "ArtistA");
/// assert_eq!(extract_author("Plain title"), "");
/// ```
pub fn extract_author(title: &str) -> String {
    AUTHOR_PATTERN
        .captures(title)
        .and_then(|caps| caps.get(2).or_else(|| caps.get(1)))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Total page count, largest first
    Pages,
    /// Title by Unicode code point
    Title,
    /// Derived author, then title
    Author,
    Category,
    Shuffle,
}

/// Reorder `records` in place; all orderings except shuffle are stable
pub fn sort_records(records: &mut [DownloadRecord], key: SortKey) {
    match key {
        SortKey::Pages => records.sort_by(|a, b| b.total.cmp(&a.total)),
        SortKey::Title => records.sort_by(|a, b| a.title.cmp(&b.title)),
        SortKey::Author => {
            records.sort_by_cached_key(|r| (extract_author(&r.title), r.title.clone()))
        }
        SortKey::Category => records.sort_by_key(|r| r.category),
        SortKey::Shuffle => records.shuffle(&mut rand::thread_rng()),
    }
}

//! Lexical memory search.
//!
//! Case-insensitive substring matching.  Callers pass candidates in recency
//! order (most recent first) and get the matches back in the same order,
//! truncated to the requested limit.  There is no ranking.

/// `true` when `haystack` contains `needle_lower`, ignoring case.
///
/// `needle_lower` must already be lowercased.
pub fn contains_folded(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Filter `candidates` down to those containing `query`, keeping their order.
///
/// An empty or whitespace-only query matches nothing.
pub fn lexical_search<I, S>(candidates: I, query: &str, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if query.trim().is_empty() || limit == 0 {
        return Vec::new();
    }
    let needle = query.to_lowercase();
    candidates
        .into_iter()
        .filter(|c| contains_folded(c.as_ref(), &needle))
        .take(limit)
        .map(|c| c.as_ref().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_case_insensitively_in_order() {
        let entries = ["MILK run", "call mom", "buy milk"];
        let hits = lexical_search(entries, "milk", 5);
        assert_eq!(hits, vec!["MILK run", "buy milk"]);
    }

    #[test]
    fn limit_truncates() {
        let entries = ["a1", "a2", "a3"];
        assert_eq!(lexical_search(entries, "A", 2), vec!["a1", "a2"]);
    }

    #[test]
    fn empty_query_matches_nothing() {
        assert!(lexical_search(["anything"], "", 5).is_empty());
        assert!(lexical_search(["anything"], "   ", 5).is_empty());
    }

    #[test]
    fn no_match_is_empty_not_error() {
        assert!(lexical_search(["call mom"], "milk", 5).is_empty());
    }

    #[test]
    fn non_ascii_case_folding() {
        assert!(contains_folded("Straße ÄPFEL", "äpfel"));
    }
}

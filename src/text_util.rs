/// Maximum number of characters in a snippet before truncation.
pub const DEFAULT_SNIPPET_MAX_CHARS: usize = 160;

/// Number of whitespace-delimited tokens in `text`.
pub fn token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Lowercase and trim a raw query. Returns `None` for blank input.
pub fn normalize_query(query: &str) -> Option<String> {
    let normalized = query.trim().to_lowercase();
    (!normalized.is_empty()).then_some(normalized)
}

/// Count non-overlapping occurrences of `needle` in `haystack`.
pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

/// Words of `query` that individually occur in `text`, first-seen order,
/// without duplicates.
pub fn matched_terms(query: &str, text: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for word in query.split_whitespace() {
        if text.contains(word) && !terms.iter().any(|t| t == word) {
            terms.push(word.to_string());
        }
    }
    terms
}

/// Extract a short window of `text` around the first occurrence of `query`
/// (case-insensitive). Falls back to the head of the text.
///
/// Returns `None` if the text is empty.
pub fn extract_snippet(text: &str, query: &str) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }

    let lower = text.to_lowercase();
    let query_lower = query.trim().to_lowercase();

    // Lowercasing can change byte lengths for some scripts; only use the
    // match position when the two strings still line up.
    let start = if lower.len() == text.len() && !query_lower.is_empty() {
        lower
            .find(&query_lower)
            .map(|pos| pos.saturating_sub(DEFAULT_SNIPPET_MAX_CHARS / 4))
            .unwrap_or(0)
    } else {
        0
    };
    let start = floor_char_boundary(text, start);

    let rest = &text[start..];
    let mut snippet: String =
        rest.chars().take(DEFAULT_SNIPPET_MAX_CHARS).collect();
    if snippet.len() < rest.len() {
        snippet.push_str("...");
    }
    if start > 0 {
        snippet.insert_str(0, "...");
    }

    Some(snippet)
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_count_splits_on_any_whitespace() {
        assert_eq!(token_count("alpha beta"), 2);
        assert_eq!(token_count("  alpha\tbeta\n gamma "), 3);
        assert_eq!(token_count(""), 0);
        assert_eq!(token_count("   "), 0);
    }

    #[test]
    fn normalize_query_trims_and_lowercases() {
        assert_eq!(normalize_query("  Customer "), Some("customer".into()));
        assert_eq!(normalize_query(""), None);
        assert_eq!(normalize_query("   "), None);
    }

    #[test]
    fn occurrences_do_not_overlap() {
        assert_eq!(count_occurrences("aaaa", "aa"), 2);
        assert_eq!(count_occurrences("customer customers", "customer"), 2);
        assert_eq!(count_occurrences("alpha", "beta"), 0);
        assert_eq!(count_occurrences("alpha", ""), 0);
    }

    #[test]
    fn matched_terms_keeps_order_and_dedupes() {
        let text = "customer model holds customer pii";
        assert_eq!(
            matched_terms("pii customer pii missing", text),
            vec!["pii".to_string(), "customer".to_string()]
        );
    }

    #[test]
    fn matched_terms_match_substrings() {
        assert_eq!(matched_terms("cust", "customer"), vec!["cust"]);
    }

    #[test]
    fn snippet_centres_on_match() {
        let text = format!("{} needle {}", "x".repeat(300), "y".repeat(300));
        let snippet = extract_snippet(&text, "Needle").unwrap();
        assert!(snippet.contains("needle"));
        assert!(snippet.starts_with("..."));
        assert!(snippet.ends_with("..."));
    }

    #[test]
    fn snippet_short_text_is_verbatim() {
        assert_eq!(
            extract_snippet("Holds customer PII", "zzz").unwrap(),
            "Holds customer PII"
        );
    }

    #[test]
    fn snippet_empty_text() {
        assert!(extract_snippet("", "query").is_none());
        assert!(extract_snippet("  ", "query").is_none());
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        let text = format!("{}needle", "é".repeat(200));
        // Must not panic on a multi-byte boundary.
        assert!(extract_snippet(&text, "needle").is_some());
    }
}

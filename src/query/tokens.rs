use aho_corasick::AhoCorasick;
use indexmap::IndexMap;
use tracing::debug;

use crate::error::SaveError;

/// Which of `tokens` occur anywhere in `haystack`, from one automaton and
/// one pass. The scan stops as soon as every token has been seen.
pub fn contains_tokens(haystack: &[u8], tokens: &[String], case_insensitive: bool) -> Result<IndexMap<String, bool>, SaveError> {
    if tokens.iter().any(String::is_empty) {
        return Err(SaveError::InvalidRequest {
            message: "tokens must not contain an empty string".into(),
            hint: Some("An empty token would match everywhere".into()),
        });
    }

    let mut matches: IndexMap<String, bool> = tokens.iter().map(|t| (t.clone(), false)).collect();
    if matches.is_empty() {
        return Ok(matches);
    }

    // Patterns are the deduplicated keys so pattern ids index `matches`.
    let patterns: Vec<&str> = matches.keys().map(String::as_str).collect();
    let ac = AhoCorasick::builder()
        .ascii_case_insensitive(case_insensitive)
        .build(&patterns)
        .map_err(|e| SaveError::internal(format!("Failed to build token matcher: {}", e)))?;

    let mut remaining = patterns.len();
    // Overlapping so "ab" cannot hide "abc"
    for mat in ac.find_overlapping_iter(haystack) {
        if let Some((_, seen)) = matches.get_index_mut(mat.pattern().as_usize()) {
            if !*seen {
                *seen = true;
                remaining -= 1;
                if remaining == 0 {
                    break;
                }
            }
        }
    }

    debug!(tokens = matches.len(), found = matches.len() - remaining, "token scan finished");
    Ok(matches)
}

//! Keyword heuristic that flags likely-duplicate issue titles.
//!
//! # Responsibility
//! - Derive keywords from a candidate title.
//! - Select existing issues whose titles contain any keyword.
//!
//! # Invariants
//! - Keywords are lowercase whitespace-separated tokens longer than
//!   `MAX_NOISE_TOKEN_CHARS` characters.
//! - Matching is substring containment, not token equality.
//! - Output preserves the input order and is advisory only.

use crate::model::issue::Issue;

/// Tokens this short or shorter are treated as noise words.
pub const MAX_NOISE_TOKEN_CHARS: usize = 2;

/// Number of matches a presentation layer is expected to surface.
pub const DUPLICATE_PREVIEW_LIMIT: usize = 3;

/// Returns existing issues whose titles share a keyword with `candidate_title`.
///
/// Blank and noise-only titles yield no matches, even against an identical
/// existing title.
pub fn find_similar<'a>(candidate_title: &str, existing: &'a [Issue]) -> Vec<&'a Issue> {
    let keywords = title_keywords(candidate_title);
    if keywords.is_empty() {
        return Vec::new();
    }

    existing
        .iter()
        .filter(|issue| {
            let title = issue.title.to_lowercase();
            keywords.iter().any(|keyword| title.contains(keyword.as_str()))
        })
        .collect()
}

/// Lowercased keywords of a title with noise tokens removed.
pub fn title_keywords(title: &str) -> Vec<String> {
    title
        .to_lowercase()
        .split_whitespace()
        .filter(|token| token.chars().count() > MAX_NOISE_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}

/// Owned duplicate signal handed back to callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateSignal {
    /// Every match, in the order of the known issue set.
    pub matches: Vec<Issue>,
}

impl DuplicateSignal {
    pub fn detect(candidate_title: &str, existing: &[Issue]) -> Self {
        Self {
            matches: find_similar(candidate_title, existing)
                .into_iter()
                .cloned()
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// First `DUPLICATE_PREVIEW_LIMIT` matches.
    pub fn preview(&self) -> &[Issue] {
        let end = self.matches.len().min(DUPLICATE_PREVIEW_LIMIT);
        &self.matches[..end]
    }
}

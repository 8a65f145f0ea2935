/*!
 * Glossary parsing and retrieval.
 *
 * User-supplied terminology is parsed once per run and matched against each
 * batch's merged text so only the relevant terms are injected into the
 * system prompt.
 */

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A single term mapping supplied by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryItem {
    /// Source-language term
    pub term: String,
    /// Required translation for the term
    pub translation: String,
    /// Optional usage note shown alongside the term
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl GlossaryItem {
    /// Create a term mapping without a usage note.
    pub fn new(term: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            translation: translation.into(),
            context: None,
        }
    }
}

#[derive(Deserialize)]
struct RawGlossaryEntry {
    #[serde(default, alias = "key")]
    term: String,
    #[serde(default, alias = "value")]
    translation: String,
    #[serde(default)]
    context: Option<String>,
}

/// Parse user glossary input.
///
/// Accepts a JSON array of `{term, translation, context?}` objects (with
/// `key`/`value` aliases), or line-based text where each line is
/// `Term=Translation` using `=`, `:`, tab, or `,` as the separator. Blank
/// lines and `#` comments are skipped. Entries missing either side are
/// dropped.
pub fn parse_glossary(input: &str) -> Vec<GlossaryItem> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if trimmed.starts_with('[') {
        if let Ok(entries) = serde_json::from_str::<Vec<RawGlossaryEntry>>(trimmed) {
            return entries
                .into_iter()
                .filter(|e| !e.term.is_empty() && !e.translation.is_empty())
                .map(|e| GlossaryItem {
                    term: e.term,
                    translation: e.translation,
                    context: e.context,
                })
                .collect();
        }
        // Fall through to text parsing on malformed JSON
    }

    const SEPARATORS: [char; 4] = ['=', ':', '\t', ','];

    trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let sep = SEPARATORS.iter().find(|&&s| line.contains(s))?;
            let (term, translation) = line.split_once(*sep)?;
            let term = term.trim();
            let translation = translation.trim();
            if term.is_empty() || translation.is_empty() {
                return None;
            }
            Some(GlossaryItem::new(term, translation))
        })
        .collect()
}

/// Retrieve the glossary items whose term occurs in `text`.
///
/// Matching is a case-insensitive substring check. Duplicate terms are
/// deduplicated by lowercased key with the first occurrence winning.
pub fn retrieve_glossary_matches(text: &str, glossary: &[GlossaryItem]) -> Vec<GlossaryItem> {
    if text.is_empty() || glossary.is_empty() {
        return Vec::new();
    }

    let lower_text = text.to_lowercase();
    let mut seen: HashSet<String> = HashSet::new();
    let mut matches = Vec::new();

    for item in glossary {
        let key = item.term.to_lowercase();
        if key.is_empty() || !lower_text.contains(&key) {
            continue;
        }
        if seen.insert(key) {
            matches.push(item.clone());
        }
    }

    matches
}

/*!
 * ISO language code helpers built on isolang.
 */

use anyhow::{Result, anyhow};
use isolang::Language;

/// Pseudo-code accepted for "detect the source language".
pub const AUTO: &str = "auto";

/// Resolve a user-supplied code to an isolang [`Language`].
fn resolve(code: &str) -> Option<Language> {
    Language::from_639_1(code)
        .or_else(|| Language::from_639_3(code))
        .or_else(|| Language::from_name(code))
}

/// Validate a language code, returning it lowercased.
///
/// Accepts ISO 639-1, ISO 639-3, full English names, and the special value
/// `auto` (source side only).
pub fn normalize_language_code(code: &str) -> Result<String> {
    let code = code.trim();
    if code.eq_ignore_ascii_case(AUTO) {
        return Ok(AUTO.to_string());
    }
    resolve(code)
        .map(|_| code.to_lowercase())
        .ok_or_else(|| anyhow!("Unrecognized language code: {}", code))
}

/// English display name for a language code, used in prompts and progress
/// output. Falls back to the raw code when it cannot be resolved.
pub fn language_display_name(code: &str) -> String {
    if code.eq_ignore_ascii_case(AUTO) {
        return "the source language".to_string();
    }
    resolve(code)
        .map(|lang| lang.to_name().to_string())
        .unwrap_or_else(|| code.to_string())
}

/// Whether two codes refer to the same language.
pub fn language_codes_match(a: &str, b: &str) -> bool {
    if a.eq_ignore_ascii_case(b) {
        return true;
    }
    match (resolve(a), resolve(b)) {
        (Some(la), Some(lb)) => la == lb,
        _ => false,
    }
}

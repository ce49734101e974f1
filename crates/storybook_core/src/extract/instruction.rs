//! Image instruction extractor.
//!
//! # Responsibility
//! - Find setting, character and action phrases in free text.
//! - Join them as `setting, characters..., action` and bound the result.
//!
//! # Invariants
//! - Pieces appear in the fixed order setting -> characters -> action.
//! - Empty pieces are skipped; the separator is always `", "`.
//! - Output length (in chars) never exceeds the requested maximum.
//! - Output never ends mid-word when a space exists before the cutoff.

use once_cell::sync::Lazy;
use regex::Regex;

/// Default character budget for an image instruction.
pub const DEFAULT_INSTRUCTION_MAX_LEN: usize = 500;

const PIECE_SEPARATOR: &str = ", ";

static SETTING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:in a|on a|at the)\s[^.,;:!?\n]+").expect("valid setting regex")
});
static CHARACTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\ba\s+(?:[\w'-]+\s+){1,3}?(?:man|woman|person|creature)\b")
        .expect("valid character regex")
});
// Ranked: the first alternative found anywhere in the text wins.
static ACTION_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bholding a\s[^.,;:!?\n]+",
        r"(?i)\bstanding\s[^.,;:!?\n]+",
        r"(?i)\bsitting\s[^.,;:!?\n]+",
        r"(?i)\blying\s[^.,;:!?\n]+",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid action regex"))
    .collect()
});
static PHRASE_BREAK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s(?:in a|on a|at the|holding|standing|sitting|lying)\s")
        .expect("valid phrase break regex")
});

/// Extracted phrase groups before joining.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionParts {
    /// First setting phrase, e.g. `in a dark forest`.
    pub setting: Option<String>,
    /// Every character phrase in text order, e.g. `a tall woman`.
    pub characters: Vec<String>,
    /// Highest-ranked action phrase, e.g. `holding a lantern`.
    pub action: Option<String>,
}

impl InstructionParts {
    /// Joins non-empty pieces with `", "` in setting/characters/action order.
    pub fn join(&self) -> String {
        self.setting
            .iter()
            .chain(self.characters.iter())
            .chain(self.action.iter())
            .filter(|piece| !piece.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(PIECE_SEPARATOR)
    }

    /// Returns whether no phrase was recognized.
    pub fn is_empty(&self) -> bool {
        self.setting.is_none() && self.characters.is_empty() && self.action.is_none()
    }
}

/// Finds setting, character and action phrases in `text`.
pub fn extract_parts(text: &str) -> InstructionParts {
    let setting = SETTING_RE
        .find(text)
        .map(|found| normalize_phrase(found.as_str()))
        .filter(|phrase| !phrase.is_empty());

    let characters = CHARACTER_RE
        .find_iter(text)
        .map(|found| normalize_phrase(found.as_str()))
        .filter(|phrase| !phrase.is_empty())
        .collect();

    let action = ACTION_RES
        .iter()
        .find_map(|re| re.find(text))
        .map(|found| normalize_phrase(found.as_str()))
        .filter(|phrase| !phrase.is_empty());

    InstructionParts {
        setting,
        characters,
        action,
    }
}

/// Condenses `text` into an image instruction of at most `max_len` chars.
///
/// Absent or unmatched input yields an empty string.
pub fn extract_image_instructions(text: Option<&str>, max_len: usize) -> String {
    let Some(text) = text else {
        return String::new();
    };
    let joined = extract_parts(text).join();
    truncate_at_word_boundary(&joined, max_len).to_string()
}

/// Cuts `text` to at most `max_len` chars, backing off to the last space.
///
/// # Contract
/// - Input within budget is returned unchanged.
/// - When the cut lands exactly before whitespace, the last word is kept.
/// - Trailing spaces and commas left by the cut are trimmed.
/// - When no space precedes the cut, the raw truncated prefix is returned.
pub fn truncate_at_word_boundary(text: &str, max_len: usize) -> &str {
    let Some((cut, next)) = text.char_indices().nth(max_len) else {
        return text;
    };
    let prefix = &text[..cut];

    let bounded = if next.is_whitespace() {
        prefix
    } else {
        match prefix.rfind(' ') {
            Some(space_idx) => &prefix[..space_idx],
            None => return prefix,
        }
    };

    bounded.trim_end_matches([' ', ','])
}

fn normalize_phrase(raw: &str) -> String {
    let clipped = match PHRASE_BREAK_RE.find(raw) {
        Some(found) if found.start() > 0 => &raw[..found.start()],
        _ => raw,
    };
    let collapsed = clipped.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut chars = collapsed.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{extract_parts, normalize_phrase, truncate_at_word_boundary};

    #[test]
    fn normalize_phrase_clips_at_next_introducer() {
        assert_eq!(
            normalize_phrase("in a dark forest holding a lantern"),
            "in a dark forest"
        );
        assert_eq!(
            normalize_phrase("standing near a castle in a dark forest"),
            "standing near a castle"
        );
    }

    #[test]
    fn normalize_phrase_lowercases_leading_article_only() {
        assert_eq!(normalize_phrase("A brave Viking man"), "a brave Viking man");
    }

    #[test]
    fn setting_requires_word_boundary() {
        let parts = extract_parts("The kitten was standing quietly.");
        assert_eq!(parts.setting, None);
        assert_eq!(parts.action.as_deref(), Some("standing quietly"));
    }

    #[test]
    fn truncate_returns_short_input_unchanged() {
        assert_eq!(truncate_at_word_boundary("in a forest", 11), "in a forest");
        assert_eq!(truncate_at_word_boundary("", 0), "");
    }

    #[test]
    fn truncate_keeps_word_when_cut_lands_on_space() {
        assert_eq!(truncate_at_word_boundary("in a forest now", 11), "in a forest");
    }

    #[test]
    fn truncate_without_space_returns_raw_prefix() {
        assert_eq!(truncate_at_word_boundary("abcdefghij", 4), "abcd");
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        let text = "über café façade";
        let truncated = truncate_at_word_boundary(text, 8);
        assert_eq!(truncated, "über");
        assert!(truncated.chars().count() <= 8);
    }
}

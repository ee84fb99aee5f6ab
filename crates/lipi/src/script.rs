//! Script-range detection.
//!
//! Transliteration output is recognized by the presence of characters from
//! the target script's Unicode block, not by DOM structure. The range is
//! explicit configuration so the harness is not welded to one language.

use serde::{Deserialize, Serialize};

/// An inclusive Unicode code-point range identifying a script block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptRange {
    /// First code point of the block
    pub start: u32,
    /// Last code point of the block (inclusive)
    pub end: u32,
}

impl ScriptRange {
    /// Sinhala Unicode block (U+0D80..=U+0DFF)
    pub const SINHALA: Self = Self {
        start: 0x0D80,
        end: 0x0DFF,
    };

    /// Create a new range
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Check whether a character falls inside the range
    #[must_use]
    pub fn contains(&self, ch: char) -> bool {
        let cp = u32::from(ch);
        cp >= self.start && cp <= self.end
    }

    /// Check whether any character of `text` falls inside the range
    #[must_use]
    pub fn in_text(&self, text: &str) -> bool {
        text.chars().any(|ch| self.contains(ch))
    }

    /// Count characters of `text` inside the range
    #[must_use]
    pub fn count_in(&self, text: &str) -> usize {
        text.chars().filter(|ch| self.contains(*ch)).count()
    }

    /// Mixed content: target-script characters alongside source-script
    /// letters or digits. The hallmark of a genuine transliteration result
    /// embedded among labels.
    #[must_use]
    pub fn is_mixed(&self, text: &str) -> bool {
        self.in_text(text) && text.chars().any(|ch| ch.is_ascii_alphanumeric())
    }

    /// Regex character class for this range, e.g. `[\x{0D80}-\x{0DFF}]`
    #[must_use]
    pub fn char_class(&self) -> String {
        format!(r"[\x{{{:04X}}}-\x{{{:04X}}}]", self.start, self.end)
    }
}

impl Default for ScriptRange {
    fn default() -> Self {
        Self::SINHALA
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sinhala_block_bounds() {
        let range = ScriptRange::SINHALA;
        assert!(range.contains('ස'));
        assert!(range.contains('්'));
        assert!(!range.contains('a'));
        assert!(!range.contains('9'));
    }

    #[test]
    fn test_in_text() {
        let range = ScriptRange::SINHALA;
        assert!(range.in_text("Result: සුබ"));
        assert!(!range.in_text("Result: none"));
        assert!(!range.in_text(""));
    }

    #[test]
    fn test_count_in() {
        let range = ScriptRange::SINHALA;
        assert_eq!(range.count_in("සුබ abc"), 3);
        assert_eq!(range.count_in("abc"), 0);
    }

    #[test]
    fn test_mixed_content() {
        let range = ScriptRange::SINHALA;
        assert!(range.is_mixed("සුබ 123"));
        assert!(range.is_mixed("word1 සුබ"));
        assert!(!range.is_mixed("සුබ උදෑසනක්"));
        assert!(!range.is_mixed("plain ascii"));
    }

    #[test]
    fn test_char_class_is_valid_regex() {
        let range = ScriptRange::SINHALA;
        let re = regex::Regex::new(&range.char_class()).unwrap();
        assert!(re.is_match("සුබ"));
        assert!(!re.is_match("suba"));
    }
}

//! Substring-based chat filter.

use super::words::DisallowedTokenSet;

/// Flags text containing any disallowed token.
///
/// Matching is case-insensitive substring containment, not word matching:
/// a token inside a longer, harmless word still matches, and spellings not
/// on the list do not.
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    tokens: DisallowedTokenSet,
}

impl ContentFilter {
    pub fn new(tokens: DisallowedTokenSet) -> Self {
        Self { tokens }
    }

    /// A filter over the built-in English list.
    pub fn builtin() -> Self {
        Self::new(DisallowedTokenSet::builtin())
    }

    pub fn tokens(&self) -> &DisallowedTokenSet {
        &self.tokens
    }

    /// Whether `text` contains any disallowed token.
    pub fn has_bad_words(&self, text: &str) -> bool {
        self.first_match(text).is_some()
    }

    /// The first listed token that occurs in `text`.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        if text.is_empty() {
            return None;
        }
        let lowered = text.to_lowercase();
        self.tokens.iter().find(|token| lowered.contains(token))
    }

    /// Replace every character covered by a disallowed token with `*`.
    pub fn censor(&self, text: &str) -> String {
        // Search the same lowered text as `first_match`. Context-sensitive
        // mappings (final sigma) keep each character's lowered byte length,
        // so per-character lengths locate the original character of every
        // lowered byte.
        let lowered = text.to_lowercase();
        let mut origin = Vec::with_capacity(lowered.len());
        let mut char_count = 0;
        for (index, ch) in text.chars().enumerate() {
            let width: usize = ch.to_lowercase().map(char::len_utf8).sum();
            origin.resize(origin.len() + width, index);
            char_count += 1;
        }

        let mut masked = vec![false; char_count];
        for token in self.tokens.iter() {
            for (start, matched) in lowered.match_indices(token) {
                for byte in start..start + matched.len() {
                    if let Some(&index) = origin.get(byte) {
                        masked[index] = true;
                    }
                }
            }
        }

        text.chars()
            .zip(masked)
            .map(|(ch, masked)| if masked { '*' } else { ch })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(tokens: &[&str]) -> ContentFilter {
        ContentFilter::new(DisallowedTokenSet::new(tokens))
    }

    #[test]
    fn test_matches_regardless_of_case() {
        let filter = filter(&["badword"]);
        assert!(filter.has_bad_words("this is a BADWORD here"));
        assert!(filter.has_bad_words("badword"));
        assert!(filter.has_bad_words("BaDwOrD"));
        assert!(!filter.has_bad_words("clean text"));
    }

    #[test]
    fn test_matches_inside_longer_words() {
        let filter = filter(&["ass"]);
        assert!(filter.has_bad_words("classic"));
    }

    #[test]
    fn test_unlisted_spelling_passes() {
        let filter = filter(&["badword"]);
        assert!(!filter.has_bad_words("b4dword"));
        assert!(!filter.has_bad_words("bad word"));
    }

    #[test]
    fn test_empty_text_is_clean() {
        assert!(!ContentFilter::builtin().has_bad_words(""));
    }

    #[test]
    fn test_empty_list_matches_nothing() {
        let filter = filter(&[]);
        assert!(!filter.has_bad_words("anything at all"));
    }

    #[test]
    fn test_first_match_follows_list_order() {
        let filter = filter(&["second", "first"]);
        assert_eq!(filter.first_match("first then second"), Some("second"));
        assert_eq!(filter.first_match("only first"), Some("first"));
        assert_eq!(filter.first_match("neither"), None);
    }

    #[test]
    fn test_censor_masks_matches() {
        let filter = filter(&["badword", "foo"]);
        assert_eq!(
            filter.censor("a BadWord and some Food"),
            "a ******* and some ***d"
        );
    }

    #[test]
    fn test_censor_leaves_clean_text_untouched() {
        let filter = filter(&["badword"]);
        assert_eq!(filter.censor("clean text"), "clean text");
    }

    #[test]
    fn test_censor_handles_multibyte_lowercase() {
        // 'İ' lower-cases to two characters
        let filter = filter(&["i\u{307}x"]);
        assert_eq!(filter.censor("aİxb"), "a**b");
    }

    #[test]
    fn test_censor_masks_whatever_first_match_flags() {
        // Word-final capital sigma lowers to 'ς' only in whole-string lowering
        let filter = filter(&["ΚΑΚΟΣ"]);

        assert!(filter.has_bad_words("you ΚΑΚΟΣ"));
        assert_eq!(filter.censor("you ΚΑΚΟΣ"), "you *****");
        assert_eq!(filter.censor("ΚΑΚΟΣ."), "*****.");
    }
}

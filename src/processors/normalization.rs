//! Text normalization for OCR transcriptions.
//!
//! OCR engines disagree on unicode composition and frequently emit invisible
//! separators. Both transcription candidates are normalized with
//! [`TextNormalizer`] before they are compared, so the arbiter never prefers one
//! candidate over the other because of encoding artifacts.

use unicode_normalization::UnicodeNormalization;

/// Characters that OCR engines emit as separators but that render as nothing
/// or as a plain space. Each is replaced by an ASCII space before whitespace
/// runs are collapsed.
const SPACE_ARTIFACTS: [char; 3] = [
    '\u{200B}', // zero-width space
    '\u{FEFF}', // zero-width no-break space
    '\u{00A0}', // no-break space
];

/// Canonicalizes transcribed text.
///
/// Normalization composes the text (NFC), turns separator artifacts into
/// spaces, collapses every whitespace run to a single space and trims both ends.
/// The operation is idempotent: `normalize(normalize(x)) == normalize(x)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextNormalizer;

impl TextNormalizer {
    /// Creates a new normalizer.
    pub fn new() -> Self {
        Self
    }

    /// Normalizes `text`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use layout_fusion::processors::TextNormalizer;
    ///
    /// let normalizer = TextNormalizer::new();
    /// assert_eq!(normalizer.normalize("a\u{200b}b\u{a0}c"), "a b c");
    /// assert_eq!(
    ///     normalizer.normalize("  Tie\u{0302}\u{0301}ng  Vie\u{0323}\u{0302}t "),
    ///     "Ti\u{1ebf}ng Vi\u{1ec7}t"
    /// );
    /// ```
    pub fn normalize(&self, text: &str) -> String {
        let composed: String = text
            .nfc()
            .map(|c| if SPACE_ARTIFACTS.contains(&c) { ' ' } else { c })
            .collect();

        let mut out = String::with_capacity(composed.len());
        for word in composed.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifacts_become_single_spaces() {
        let n = TextNormalizer::new();
        assert_eq!(n.normalize("a\u{200b}b\u{a0}c"), "a b c");
        assert_eq!(n.normalize("a\u{feff}\u{200b} b"), "a b");
    }

    #[test]
    fn test_whitespace_runs_collapse_and_trim() {
        let n = TextNormalizer::new();
        assert_eq!(n.normalize("\t hello \n\n  world \r\n"), "hello world");
        assert_eq!(n.normalize("   "), "");
        assert_eq!(n.normalize(""), "");
    }

    #[test]
    fn test_composes_to_nfc() {
        let n = TextNormalizer::new();
        // "e" + combining acute accent composes to U+00E9
        assert_eq!(n.normalize("cafe\u{0301}"), "caf\u{00e9}");
        // Vietnamese stacked diacritics: a + breve + dot below
        assert_eq!(n.normalize("a\u{0306}\u{0323}"), "\u{1eb7}");
    }

    #[test]
    fn test_idempotent() {
        let n = TextNormalizer::new();
        let inputs = [
            "a\u{200b}b\u{a0}c",
            "  Nguye\u{0302}\u{0303}n  \u{feff}Va\u{0306}n ",
            "line one\nline two",
            "",
        ];
        for input in inputs {
            let once = n.normalize(input);
            assert_eq!(n.normalize(&once), once, "input: {:?}", input);
        }
    }
}

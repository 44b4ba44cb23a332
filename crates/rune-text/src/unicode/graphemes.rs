use unicode_segmentation::UnicodeSegmentation;

/// Extended grapheme clusters of `text` in order. Layout places one glyph
/// per cluster.
pub fn graphemes(text: &str) -> Vec<&str> {
    text.graphemes(true).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_ascii_graphemes() {
        assert_eq!(graphemes("abc"), vec!["a", "b", "c"]);
    }

    #[test]
    fn combining_mark_stays_with_base() {
        let text = "a\u{0301}b";
        assert_eq!(graphemes(text), vec!["a\u{0301}", "b"]);
    }

    #[test]
    fn emoji_zwj_sequence_is_single_cluster() {
        let text = "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}";
        assert_eq!(graphemes(text).len(), 1);
    }
}

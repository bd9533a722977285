//! Raw review text to cleaned, lowercase, single-spaced text.
//!
//! Rewrites run in a fixed order: lowercase, HTML-like tags, URLs,
//! email-like tokens, punctuation, digit runs, whitespace. Punctuation and
//! digits become spaces so removing them never fuses neighbouring words,
//! which also keeps [`clean`] idempotent.

use std::sync::LazyLock;

use regex::Regex;

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<.*?>").expect("HTML_TAG: invalid pattern"));
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"http\S+|www\.\S+").expect("URL: invalid pattern"));
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+").expect("EMAIL: invalid pattern"));
static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("PUNCTUATION: invalid pattern"));
static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("DIGITS: invalid pattern"));

/// Normalize one review. Pure and deterministic.
pub fn clean(text: &str) -> String {
    let text = text.to_lowercase();
    let text = HTML_TAG.replace_all(&text, "");
    let text = URL.replace_all(&text, "");
    let text = EMAIL.replace_all(&text, "");
    let text = PUNCTUATION.replace_all(&text, " ");
    let text = DIGITS.replace_all(&text, " ");
    collapse_whitespace(&text)
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_markup_links_and_numbers() {
        let raw = "<b>GREAT</b> product!!! Bought 2 at http://shop.example/x?id=9 \
                   (mail me: joe@example.com)   www.example.org";
        assert_eq!(clean(raw), "great product bought at mail me");
    }

    #[test]
    fn punctuation_never_fuses_words() {
        assert_eq!(clean("well-made,cheap;sturdy"), "well made cheap sturdy");
        assert_eq!(clean("don't"), "don t");
    }

    #[test]
    fn digits_become_separators() {
        assert_eq!(clean("ht1tpx mp3 player"), "ht tpx mp player");
    }

    #[test]
    fn keeps_non_ascii_letters() {
        assert_eq!(clean("Crème BRÛLÉE — délicieux"), "crème brûlée délicieux");
    }

    #[test]
    fn empty_and_blank_inputs() {
        assert_eq!(clean(""), "");
        assert_eq!(clean(" \n\t "), "");
        assert_eq!(clean("<p></p> 123 !!!"), "");
    }

    proptest! {
        #[test]
        fn clean_is_idempotent(raw in r"[a-zA-Z0-9 <>/.@:!?,'_\-\n\téÉß]{0,80}") {
            let once = clean(&raw);
            prop_assert_eq!(clean(&once), once);
        }

        #[test]
        fn output_has_no_markup_digits_or_double_spaces(raw in r"[a-zA-Z0-9 <>/.@:!?,'\-]{0,80}") {
            let out = clean(&raw);
            prop_assert!(!out.contains("  "));
            prop_assert!(!out.starts_with(' ') && !out.ends_with(' '));
            prop_assert!(!out.chars().any(|c| c.is_ascii_digit() || c == '<' || c == '@'));
        }
    }
}

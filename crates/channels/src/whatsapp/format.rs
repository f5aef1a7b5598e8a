//! Rewrites generic markdown into WhatsApp markup.

use regex::Regex;
use std::sync::LazyLock;

static CITATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"【.*?】").expect("valid regex"));
static DOUBLE_STAR_BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid regex"));

/// Strip `【...】` citation markers, trim, then turn `**bold**` into `*bold*`.
///
/// Only applied to externally generated text.
pub fn normalize_markup(text: &str) -> String {
    let stripped = CITATION.replace_all(text, "");
    DOUBLE_STAR_BOLD
        .replace_all(stripped.trim(), "*$1*")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bold_is_rewritten() {
        assert_eq!(
            normalize_markup("Check-in is **3pm** and check-out **11am**."),
            "Check-in is *3pm* and check-out *11am*."
        );
    }

    #[test]
    fn citations_are_stripped_and_trimmed() {
        assert_eq!(
            normalize_markup("  The wifi password is on the fridge【4:0†faq.pdf】  "),
            "The wifi password is on the fridge"
        );
        assert_eq!(normalize_markup("a【1】b【2】c"), "abc");
    }

    #[test]
    fn plain_text_untouched() {
        assert_eq!(normalize_markup("*already* fine"), "*already* fine");
        assert_eq!(normalize_markup(""), "");
    }
}

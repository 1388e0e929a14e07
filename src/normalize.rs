
use regex::Regex;

/// Arabic comma used as the variant separator in multi-valued cells.
pub const ARABIC_COMMA: char = '،';

/// Compiled normalization patterns, built once and shared by the stages.
#[derive(Debug)]
pub struct Normalizer {
    diacritics: Regex,
    weak_letters: Regex,
    non_arabic: Regex,
    non_word: Regex,
    spaces: Regex,
}

impl Normalizer {
    pub fn new() -> Normalizer {
        Normalizer {
            diacritics: Regex::new(r"[\u{0617}-\u{061A}\u{064B}-\u{0652}]").unwrap(),
            weak_letters: Regex::new(r"[اويىأةآإؤئء]").unwrap(),
            non_arabic: Regex::new(r"[^\w\s\u{0600}-\u{06FF}]").unwrap(),
            non_word: Regex::new(r"[^\w\s]").unwrap(),
            spaces: Regex::new(r"\s+").unwrap(),
        }
    }

    /// Removes Arabic diacritic marks (U+0617..U+061A, U+064B..U+0652).
    pub fn strip_diacritics(&self, s: &str) -> String {
        self.diacritics.replace_all(s, "").into_owned()
    }

    /// Normalizes a word for similarity comparison: strips diacritics and
    /// punctuation, removes weak letters, collapses whitespace.
    pub fn remove_weak_letters(&self, s: &str) -> String {
        let s = self.strip_diacritics(s);
        let s = s.replace(ARABIC_COMMA, " ");
        let s = self.non_arabic.replace_all(&s, "");
        let s = self.weak_letters.replace_all(&s, "");
        self.spaces.replace_all(&s, " ").trim().to_string()
    }

    /// Drops everything that is neither a word character nor whitespace.
    /// Used before whitespace tokenization of dialectal forms.
    pub fn strip_punctuation(&self, s: &str) -> String {
        self.non_word.replace_all(s, "").into_owned()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Normalizer::new()
    }
}

/// Splits a multi-valued cell on the Arabic comma.
pub fn split_variants(s: &str) -> Vec<String> {
    s.split(ARABIC_COMMA)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect()
}

/// Last component of an underscore-separated lemma-POS tag,
/// e.g. "kitAb_1_NOUN" => "NOUN".
pub fn extract_pos(tag: &str) -> Option<String> {
    let tag = tag.trim();
    if tag.is_empty() {
        return None;
    }
    tag.rsplit('_').next().map(String::from)
}

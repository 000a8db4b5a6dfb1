//! Tokenization and keyword matching.

use unicode_segmentation::UnicodeSegmentation;

/// Split text into lower-cased Unicode words.
///
/// Word boundaries follow UAX #29, so Devanagari words keep their vowel
/// signs and viramas attached.
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}

/// A compiled set of keywords, each stored as a token sequence.
#[derive(Debug, Clone, Default)]
pub struct KeywordSet {
    phrases: Vec<Vec<String>>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut phrases: Vec<Vec<String>> = Vec::new();
        for keyword in keywords {
            let tokens = tokenize(keyword.as_ref());
            if !tokens.is_empty() && !phrases.contains(&tokens) {
                phrases.push(tokens);
            }
        }
        Self { phrases }
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// Number of distinct keywords present in the tokenized question.
    pub fn hits(&self, tokens: &[String]) -> usize {
        self.phrases
            .iter()
            .filter(|phrase| contains_phrase(tokens, phrase))
            .count()
    }
}

fn contains_phrase(tokens: &[String], phrase: &[String]) -> bool {
    tokens.windows(phrase.len()).any(|window| {
        window
            .iter()
            .zip(phrase)
            .all(|(token, keyword)| token_matches(keyword, token))
    })
}

/// Hindi plural and oblique endings that may follow a noun stem.
const DEVANAGARI_SUFFIXES: &[&str] = &[
    "ियों", "ियां", "ियाँ", "ाओं", "ाएं", "ाएँ", "ों", "ें", "ां", "ो", "े", "ी", "ा",
];

/// Exact match, an English plural (`-s`, `-es`) of an ASCII keyword, or an
/// inflected form (`फसलों` for `फसल`) of a Devanagari keyword.
fn token_matches(keyword: &str, token: &str) -> bool {
    if token == keyword {
        return true;
    }
    match token.strip_prefix(keyword) {
        Some(rest) if keyword.is_ascii() => rest == "s" || rest == "es",
        Some(rest) => DEVANAGARI_SUFFIXES.contains(&rest),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_drops_punctuation() {
        assert_eq!(
            tokenize("What are Potato prices in Bihar?"),
            vec!["what", "are", "potato", "prices", "in", "bihar"]
        );
    }

    #[test]
    fn test_tokenize_keeps_devanagari_words_whole() {
        assert_eq!(tokenize("मूल्य दिखाएं"), vec!["मूल्य", "दिखाएं"]);
        assert_eq!(tokenize("गेहूं की कीमत"), vec!["गेहूं", "की", "कीमत"]);
    }

    #[test]
    fn test_plural_tolerance() {
        let set = KeywordSet::new(["price", "potato"]);
        assert_eq!(set.hits(&tokenize("potatoes and prices")), 2);
        assert_eq!(set.hits(&tokenize("priced")), 0);
    }

    #[test]
    fn test_inflected_devanagari_keywords() {
        let set = KeywordSet::new(["फसल", "कीमत", "सब्जी"]);
        assert_eq!(set.hits(&tokenize("फसलों की पैदावार")), 1);
        assert_eq!(set.hits(&tokenize("आलू की कीमतों में बदलाव")), 1);
        assert_eq!(set.hits(&tokenize("फसलबीमा योजना")), 0);
    }

    #[test]
    fn test_no_substring_matches() {
        let set = KeywordSet::new(["rain"]);
        assert_eq!(set.hits(&tokenize("training data")), 0);
        assert_eq!(set.hits(&tokenize("rains in Kerala")), 1);
    }

    #[test]
    fn test_phrase_keywords() {
        let set = KeywordSet::new(["annual rainfall", "pm-kisan"]);
        assert_eq!(set.hits(&tokenize("Annual rainfall of Assam")), 1);
        assert_eq!(set.hits(&tokenize("rainfall annual")), 0);
        assert_eq!(set.hits(&tokenize("PM-KISAN installments")), 1);
    }

    #[test]
    fn test_duplicates_and_blanks_ignored() {
        let set = KeywordSet::new(["Mandi", "mandi", "  ", "?"]);
        assert_eq!(set.len(), 1);
        assert!(!set.is_empty());
        assert!(KeywordSet::new(Vec::<String>::new()).is_empty());
    }
}

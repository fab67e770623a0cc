//! Frequency-based keyword extraction.
//!
//! Tokens are runs of alphanumeric characters in any alphabet. Stopwords from
//! an English and a Russian list are dropped.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Default number of keywords extracted per thread.
pub const DEFAULT_TOP_N: usize = 10;

/// Minimum token length, in characters.
const MIN_TOKEN_CHARS: usize = 3;

const ENGLISH_STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "have", "his", "how", "its", "may", "who", "did", "get", "let",
    "she", "too", "use", "which", "that", "this", "with", "from", "they", "will", "would",
    "there", "their", "what", "about", "been", "were", "when", "your", "also", "into", "than",
    "then", "them", "these", "those", "some", "such", "only", "just", "more", "most", "other",
    "should", "could", "please", "thanks", "thank", "regards", "best", "dear", "hello", "sent",
    "email", "mail",
];

const RUSSIAN_STOPWORDS: &[&str] = &[
    "что", "это", "как", "для", "или", "при", "без", "после", "письмо", "все", "его", "она",
    "они", "так", "был", "была", "были", "быть", "уже", "еще", "ещё", "вам", "вас", "нас",
    "них", "под", "над", "про", "когда", "если", "также", "только", "чтобы", "этот", "эта",
    "эти", "который", "которые", "спасибо", "уважением", "добрый", "день", "коллеги",
];

fn stopwords() -> &'static HashSet<&'static str> {
    static STOPWORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    STOPWORDS.get_or_init(|| {
        ENGLISH_STOPWORDS
            .iter()
            .chain(RUSSIAN_STOPWORDS)
            .copied()
            .collect()
    })
}

/// Returns true if the (lowercased) token is a stopword.
pub fn is_stopword(token: &str) -> bool {
    stopwords().contains(token)
}

/// Splits text into lowercased tokens of at least three characters.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|raw| raw.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_lowercase)
        .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
}

/// Returns the `top_n` most frequent non-stopword tokens of `text`.
///
/// Ties are broken by first occurrence, so the output is deterministic.
pub fn extract_keywords(text: &str, top_n: usize) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for token in tokenize(text).filter(|t| !is_stopword(t)) {
        match counts.get_mut(&token) {
            Some(count) => *count += 1,
            None => {
                counts.insert(token.clone(), 1);
                order.push(token);
            }
        }
    }

    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|token| {
            let count = counts.get(&token).copied().unwrap_or(0);
            (token, count)
        })
        .collect();
    // Stable sort keeps first-seen order among equal counts.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    ranked
        .into_iter()
        .take(top_n)
        .map(|(token, _)| token)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_text_has_no_keywords() {
        assert!(extract_keywords("", DEFAULT_TOP_N).is_empty());
        assert!(extract_keywords("   \n\t ", DEFAULT_TOP_N).is_empty());
    }

    #[test]
    fn ranks_by_frequency() {
        let text = "invoice payment invoice contract invoice payment";
        assert_eq!(
            extract_keywords(text, 10),
            vec!["invoice", "payment", "contract"]
        );
    }

    #[test]
    fn ties_keep_first_occurrence() {
        let text = "zeta alpha beta alpha zeta beta";
        assert_eq!(extract_keywords(text, 10), vec!["zeta", "alpha", "beta"]);
    }

    #[test]
    fn drops_short_tokens_and_stopwords() {
        let text = "The budget is ok and the budget for Q3 will grow";
        assert_eq!(extract_keywords(text, 10), vec!["budget", "grow"]);
    }

    #[test]
    fn supports_cyrillic_and_digits() {
        let text = "Смета проекта 2024, смета согласована. Это письмо про смету 2024";
        assert_eq!(
            extract_keywords(text, 3),
            vec!["смета", "2024", "проекта"]
        );
    }

    #[test]
    fn respects_top_n() {
        let text = "one1 two2 three3 four4 five5";
        assert_eq!(extract_keywords(text, 2), vec!["one1", "two2"]);
        assert!(extract_keywords(text, 0).is_empty());
    }

    #[test]
    fn tokenize_lowercases() {
        let tokens: Vec<_> = tokenize("Hotel-DESIGN_review").collect();
        assert_eq!(tokens, vec!["hotel", "design", "review"]);
    }
}

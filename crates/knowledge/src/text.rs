//! Significant-term extraction shared by the relevance filter and the
//! trigram embedder.

use std::collections::HashSet;
use std::sync::LazyLock;
use unicode_segmentation::UnicodeSegmentation;

static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "about", "after", "again", "all", "also", "am", "an", "and", "any", "are", "as",
        "at", "be", "because", "been", "before", "being", "both", "but", "by", "can", "could",
        "did", "do", "does", "doing", "each", "few", "for", "from", "get", "give", "had", "has",
        "have", "having", "he", "her", "here", "hers", "him", "his", "how", "i", "if", "in",
        "into", "is", "it", "its", "just", "know", "let", "like", "me", "more", "most", "much",
        "must", "my", "no", "nor", "not", "now", "of", "off", "on", "once", "only", "or",
        "other", "our", "ours", "out", "over", "own", "please", "same", "shall", "she",
        "should", "so", "some", "such", "tell", "than", "that", "the", "their", "theirs",
        "them", "then", "there", "these", "they", "this", "those", "through", "to", "too",
        "under", "until", "up", "us", "very", "was", "we", "were", "what", "when", "where",
        "which", "while", "who", "whom", "whose", "why", "will", "with", "would", "yes", "you",
        "your", "yours",
    ]
    .into_iter()
    .collect()
});

/// Whether `word` (already lower-cased) carries no topical meaning.
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(word)
}

/// Lower-cased, stemmed content words of `text`, in order of appearance.
///
/// Possessive `'s` is stripped, stopwords and single characters are
/// dropped, and a light plural stemmer folds "refunds"/"refund" and
/// "policies"/"policy" together.
pub fn significant_terms(text: &str) -> Vec<String> {
    text.unicode_words()
        .filter_map(|word| {
            let lower = word.to_lowercase();
            let base = lower
                .strip_suffix("'s")
                .or_else(|| lower.strip_suffix("\u{2019}s"))
                .unwrap_or(&lower);

            if base.chars().count() < 2 || is_stopword(base) {
                return None;
            }
            Some(stem(base))
        })
        .collect()
}

/// Unique significant terms of `text`.
pub fn term_set(text: &str) -> HashSet<String> {
    significant_terms(text).into_iter().collect()
}

/// Fraction of the query's unique significant terms found in `chunk_terms`.
///
/// A query without significant terms has nothing to confirm and scores 0.
pub fn term_overlap_ratio(query_terms: &HashSet<String>, chunk_terms: &HashSet<String>) -> f32 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let found = query_terms
        .iter()
        .filter(|term| chunk_terms.contains(*term))
        .count();
    found as f32 / query_terms.len() as f32
}

fn stem(word: &str) -> String {
    let len = word.chars().count();
    if len > 4 {
        if let Some(root) = word.strip_suffix("ies") {
            return format!("{}y", root);
        }
    }
    if let Some(root) = word.strip_suffix("sses") {
        return format!("{}ss", root);
    }
    if len > 3
        && word.ends_with('s')
        && !word.ends_with("ss")
        && !word.ends_with("us")
        && !word.ends_with("is")
    {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_significant_terms_drop_stopwords() {
        assert_eq!(
            significant_terms("What is the refund policy?"),
            vec!["refund", "policy"]
        );
    }

    #[test]
    fn test_plural_folding() {
        assert_eq!(
            significant_terms("Refunds, policies and classes"),
            vec!["refund", "policy", "class"]
        );
        // Short words and -us/-is endings are left alone
        assert_eq!(significant_terms("bus status analysis gas"), vec!["bus", "status", "analysis", "gas"]);
    }

    #[test]
    fn test_possessive_and_contractions() {
        assert_eq!(significant_terms("How's the company's weather?"), vec!["company", "weather"]);
    }

    #[test]
    fn test_numbers_are_terms() {
        assert_eq!(significant_terms("within 30 days"), vec!["within", "30", "day"]);
    }

    #[test]
    fn test_overlap_ratio() {
        let query = term_set("What is the refund policy?");
        let chunk = term_set("Refunds are processed within 30 days of purchase");
        assert!((term_overlap_ratio(&query, &chunk) - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_overlap_ratio_empty_query() {
        let query = term_set("how is it?");
        let chunk = term_set("anything at all");
        assert_eq!(term_overlap_ratio(&query, &chunk), 0.0);
    }

    #[test]
    fn test_unicode_words() {
        let terms = significant_terms("Política de reembolsos: 30 días");
        assert!(terms.contains(&"política".to_string()));
        assert!(terms.contains(&"día".to_string()));
    }
}

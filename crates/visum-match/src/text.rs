//! Text similarity scoring for compare tasks.
//!
//! # Algorithm
//!
//! Both texts are tokenized to lowercase word tokens of two or more chars.
//! Two cosine similarities are computed, one over raw term counts and one
//! over smooth-idf TF-IDF weights for the two-document corpus the inputs
//! form, and their mean is scaled to a 0..=100 score. Empty text on either
//! side scores 0.

use std::collections::{HashMap, HashSet};

/// Strip-and-translate normalization for visually confusable glyphs.
///
/// Keeps only `[a-z0-9 ]`, folds the uppercase confusable set onto digits
/// and canonical letters, then folds the remaining lowercase confusables.
pub fn preprocess(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | ' '))
        .collect();
    let folded: String = stripped
        .to_uppercase()
        .chars()
        .map(|c| translate(c, "TDCLUEZOBSY", "70GIVF20857"))
        .collect();
    folded
        .to_lowercase()
        .chars()
        .map(|c| translate(c, "ucibogqzsy", "ve16099257"))
        .collect()
}

// Both tables are ASCII, so byte offsets equal char offsets.
fn translate(c: char, from: &str, to: &str) -> char {
    match from.find(c) {
        Some(i) => to.as_bytes()[i] as char,
        None => c,
    }
}

/// Lowercase word tokens (letters, digits, underscore) of two or more
/// chars; shorter tokens are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| t.chars().count() >= 2)
        .map(|t| t.to_string())
        .collect()
}

fn term_counts(tokens: &[String]) -> HashMap<&str, f64> {
    let mut counts: HashMap<&str, f64> = HashMap::new();
    for token in tokens {
        *counts.entry(token.as_str()).or_insert(0.0) += 1.0;
    }
    counts
}

fn cosine(a: &HashMap<&str, f64>, b: &HashMap<&str, f64>) -> f64 {
    let dot: f64 = a
        .iter()
        .filter_map(|(term, w)| b.get(term).map(|v| w * v))
        .sum();
    let norm_a = a.values().map(|w| w * w).sum::<f64>().sqrt();
    let norm_b = b.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Cosine similarity over raw term counts.
pub fn bow_similarity(left: &str, right: &str) -> f64 {
    let left_tokens = tokenize(left);
    let right_tokens = tokenize(right);
    if left_tokens.is_empty() || right_tokens.is_empty() {
        return 0.0;
    }
    cosine(&term_counts(&left_tokens), &term_counts(&right_tokens))
}

/// Cosine similarity over smooth-idf TF-IDF weights for the two-document
/// corpus formed by the inputs: `idf = ln((1 + 2) / (1 + df)) + 1`.
pub fn tfidf_similarity(left: &str, right: &str) -> f64 {
    let left_tokens = tokenize(left);
    let right_tokens = tokenize(right);
    if left_tokens.is_empty() || right_tokens.is_empty() {
        return 0.0;
    }

    let left_counts = term_counts(&left_tokens);
    let right_counts = term_counts(&right_tokens);

    let vocabulary: HashSet<&str> = left_counts
        .keys()
        .chain(right_counts.keys())
        .copied()
        .collect();
    let mut idf: HashMap<&str, f64> = HashMap::with_capacity(vocabulary.len());
    for term in vocabulary {
        let df =
            left_counts.contains_key(term) as u32 + right_counts.contains_key(term) as u32;
        idf.insert(term, (3.0 / (1.0 + df as f64)).ln() + 1.0);
    }

    let weigh = |counts: &HashMap<&str, f64>| -> HashMap<&str, f64> {
        counts
            .iter()
            .map(|(term, tf)| (*term, tf * idf[term]))
            .collect()
    };

    cosine(&weigh(&left_counts), &weigh(&right_counts))
}

/// Combined similarity in 0..=100: the mean of the two cosines, scaled.
pub fn compare_texts(left: &str, right: &str) -> f64 {
    (bow_similarity(left, right) + tfidf_similarity(left, right)) / 2.0 * 100.0
}

//! # visum-match
//!
//! Similarity decision layer for the visum image worker: tiered perceptual
//! hash matching with a text-similarity final tier.

pub mod matcher;
pub mod text;

pub use matcher::{Matcher, Verdict};
pub use text::{bow_similarity, compare_texts, preprocess, tfidf_similarity, tokenize};

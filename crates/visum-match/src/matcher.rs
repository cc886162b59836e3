//! Tiered similarity decision between a candidate image and one stored
//! record.
//!
//! # Algorithm
//!
//! The four perceptual hash kinds are checked in fixed order (average,
//! difference, wavelet, color); the first kind whose bit distance is at or
//! under its ceiling decides the match at that kind's configured output
//! score, and no later tier runs. Only when every hash tier misses does the
//! text tier score the pair against the text threshold.

use tracing::debug;
use visum_core::{Fingerprint, HashKind, ImageRecord, MatcherConfig, Result};
use visum_fingerprint::bit_distance;

use crate::text;

/// Outcome of evaluating one candidate/record pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub is_similar: bool,
    /// The configured output value for a hash-tier match, the combined text
    /// score otherwise. The two scales are not mutually comparable.
    pub score: f64,
}

/// Applies the tiered hash-then-text similarity policy.
#[derive(Debug, Clone)]
pub struct Matcher {
    config: MatcherConfig,
}

impl Matcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// Candidate text as the compare pipeline persists and scores it:
    /// normalized when preprocessing is enabled, untouched otherwise.
    pub fn prepare_text(&self, candidate_text: &str) -> String {
        if self.config.preprocess_text {
            text::preprocess(candidate_text)
        } else {
            candidate_text.to_string()
        }
    }

    /// Tiered decision for one stored record.
    pub fn evaluate(
        &self,
        fingerprint: &Fingerprint,
        candidate_text: &str,
        record: &ImageRecord,
    ) -> Result<Verdict> {
        for kind in HashKind::ALL {
            let distance = bit_distance(fingerprint.hash(kind), record.hash(kind))?;
            let threshold = self.config.threshold(kind);
            if f64::from(distance) <= threshold.max_distance {
                debug!(
                    hash_kind = kind.as_str(),
                    distance,
                    record_id = %record.id,
                    score = threshold.output,
                    "hash tier matched"
                );
                return Ok(Verdict {
                    is_similar: true,
                    score: threshold.output,
                });
            }
        }

        let stored_text = record.recognized_text.as_deref().unwrap_or("");
        let score = text::compare_texts(candidate_text, stored_text);
        Ok(Verdict {
            is_similar: score >= self.config.text_threshold,
            score,
        })
    }
}

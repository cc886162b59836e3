//! Compare task handler.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use visum_core::{
    CompareResult, CorpusStore, ImageRecord, ImageTask, Result, SimilarImage, SimilarityLink,
};
use visum_match::Matcher;

use crate::handler::{intake, outcome, Intake, TaskHandler, TaskOutcome};
use crate::resolver::{Resolution, Resolver};
use crate::transport::{ResultPublisher, COMPARE_QUEUE};

/// Handles compare tasks: fingerprint the file, resolve its text, score it
/// against every stored record, persist the new record (and links when
/// anything matched), and publish the result.
pub struct CompareHandler {
    corpus: Arc<dyn CorpusStore>,
    resolver: Resolver,
    matcher: Matcher,
    publisher: Arc<dyn ResultPublisher>,
}

impl CompareHandler {
    pub fn new(
        corpus: Arc<dyn CorpusStore>,
        resolver: Resolver,
        matcher: Matcher,
        publisher: Arc<dyn ResultPublisher>,
    ) -> Self {
        Self {
            corpus,
            resolver,
            matcher,
            publisher,
        }
    }
}

#[async_trait]
impl TaskHandler for CompareHandler {
    fn queue(&self) -> &'static str {
        COMPARE_QUEUE
    }

    async fn execute(&self, payload: &[u8]) -> Result<TaskOutcome> {
        let task: ImageTask = serde_json::from_slice(payload)?;

        let fingerprint = match intake(&task)? {
            Intake::Rejected(msg) => return Ok(TaskOutcome::Rejected(msg)),
            Intake::Accepted(fingerprint) => fingerprint,
        };

        let text = match self.resolver.resolve(&task, &fingerprint).await? {
            Resolution::AlreadyRecognized => {
                return Ok(TaskOutcome::Completed(outcome::ALREADY_RECOGNIZED))
            }
            Resolution::TextTooShort => {
                return Ok(TaskOutcome::Rejected(outcome::TEXT_NOT_RECOGNIZED))
            }
            Resolution::Text(text) => self.matcher.prepare_text(&text),
        };

        // The candidate record is inserted after the scan, so it never
        // scores against itself.
        let stored = self.corpus.all_records().await?;
        let mut scores: HashMap<String, f64> = HashMap::new();
        for record in &stored {
            let verdict = self.matcher.evaluate(&fingerprint, &text, record)?;
            if verdict.is_similar {
                scores.insert(record.id.clone(), verdict.score);
            }
        }
        debug!(
            image_id = %task.image_id,
            result_count = stored.len(),
            match_count = scores.len(),
            "corpus scan finished"
        );

        let record = ImageRecord::new(
            &fingerprint,
            &task.image_id,
            &task.image_path,
            Some(text.clone()),
        );
        self.corpus.insert_record(&record).await?;

        if !scores.is_empty() {
            let ids: Vec<String> = scores.keys().cloned().collect();
            let matched = self.corpus.records_by_ids(&ids).await?;

            let links: Vec<SimilarityLink> = matched
                .iter()
                .map(|m| SimilarityLink::new(&record.id, &m.id))
                .collect();
            self.corpus.insert_links(&links).await?;

            let similar_images: Vec<SimilarImage> = matched
                .iter()
                .map(|m| SimilarImage {
                    image_id: m.image_id.clone(),
                    image_path: m.image_path.clone(),
                    similarity: scores.get(&m.id).copied().unwrap_or_default(),
                    recognized_text: m.recognized_text.clone(),
                })
                .collect();

            self.publisher
                .publish(&CompareResult {
                    image_id: task.image_id.clone(),
                    image_path: task.image_path.clone(),
                    recognized_text: text,
                    similar_images,
                })
                .await?;
            info!(
                image_id = %task.image_id,
                record_id = %record.id,
                match_count = scores.len(),
                "similar images published"
            );
        }

        Ok(TaskOutcome::Completed(outcome::COMPARISON_COMPLETED))
    }
}

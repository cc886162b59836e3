//! Extraction task handler.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use visum_core::{CorpusStore, ImageRecord, ImageTask, Result};

use crate::handler::{intake, outcome, Intake, TaskHandler, TaskOutcome};
use crate::resolver::{Resolution, Resolver};
use crate::transport::EXTRACTION_QUEUE;

/// Handles extraction tasks: fingerprint the file, resolve its text, and
/// persist one record. The raw resolved text is stored as-is.
pub struct ExtractionHandler {
    corpus: Arc<dyn CorpusStore>,
    resolver: Resolver,
}

impl ExtractionHandler {
    pub fn new(corpus: Arc<dyn CorpusStore>, resolver: Resolver) -> Self {
        Self { corpus, resolver }
    }
}

#[async_trait]
impl TaskHandler for ExtractionHandler {
    fn queue(&self) -> &'static str {
        EXTRACTION_QUEUE
    }

    async fn execute(&self, payload: &[u8]) -> Result<TaskOutcome> {
        let task: ImageTask = serde_json::from_slice(payload)?;

        let fingerprint = match intake(&task)? {
            Intake::Rejected(msg) => return Ok(TaskOutcome::Rejected(msg)),
            Intake::Accepted(fingerprint) => fingerprint,
        };

        match self.resolver.resolve(&task, &fingerprint).await? {
            Resolution::AlreadyRecognized => {
                Ok(TaskOutcome::Completed(outcome::ALREADY_RECOGNIZED))
            }
            Resolution::TextTooShort => Ok(TaskOutcome::Rejected(outcome::TEXT_NOT_RECOGNIZED)),
            Resolution::Text(text) => {
                let record =
                    ImageRecord::new(&fingerprint, &task.image_id, &task.image_path, Some(text));
                self.corpus.insert_record(&record).await?;
                info!(
                    image_id = %task.image_id,
                    record_id = %record.id,
                    "recognition stored"
                );
                Ok(TaskOutcome::Completed(outcome::RECOGNITION_COMPLETED))
            }
        }
    }
}

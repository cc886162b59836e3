//! In-memory corpus used by handler and end-to-end tests.

use std::sync::Mutex;

use async_trait::async_trait;

use visum_core::{CorpusStore, ImageRecord, Result, SimilarityLink};

/// In-process [`CorpusStore`] with the same query semantics as the MongoDB
/// implementation, including the earliest-inserted-first ordering of
/// [`CorpusStore::records_by_content_hash`].
#[derive(Debug, Default)]
pub struct MemoryCorpus {
    records: Mutex<Vec<ImageRecord>>,
    links: Mutex<Vec<SimilarityLink>>,
}

impl MemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn link_count(&self) -> usize {
        self.links.lock().unwrap().len()
    }

    pub fn links(&self) -> Vec<SimilarityLink> {
        self.links.lock().unwrap().clone()
    }
}

#[async_trait]
impl CorpusStore for MemoryCorpus {
    async fn insert_record(&self, record: &ImageRecord) -> Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn insert_links(&self, links: &[SimilarityLink]) -> Result<()> {
        self.links.lock().unwrap().extend_from_slice(links);
        Ok(())
    }

    async fn all_records(&self) -> Result<Vec<ImageRecord>> {
        Ok(self.records.lock().unwrap().clone())
    }

    async fn records_by_ids(&self, ids: &[String]) -> Result<Vec<ImageRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect())
    }

    async fn records_by_content_hash(&self, content_hash: &str) -> Result<Vec<ImageRecord>> {
        let mut matches: Vec<ImageRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.content_hash == content_hash)
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            a.created_at_utc
                .cmp(&b.created_at_utc)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(matches)
    }

    async fn clear_all(&self) -> Result<()> {
        self.records.lock().unwrap().clear();
        self.links.lock().unwrap().clear();
        Ok(())
    }
}

//! Trait seams implemented by the storage layer.

use crate::error::Result;
use crate::models::{ImageRecord, SimilarityLink};
use async_trait::async_trait;

/// Persistence operations over the image corpus.
///
/// Implemented by the MongoDB-backed store and by the in-memory fixture
/// used in tests. The corpus is append-only: records are inserted, never
/// updated, and only wiped wholesale through [`CorpusStore::clear_all`].
#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Insert one processed image record.
    async fn insert_record(&self, record: &ImageRecord) -> Result<()>;

    /// Insert a batch of similarity links.
    async fn insert_links(&self, links: &[SimilarityLink]) -> Result<()>;

    /// Every record in the corpus.
    async fn all_records(&self) -> Result<Vec<ImageRecord>>;

    /// Records whose id is in the given set.
    async fn records_by_ids(&self, ids: &[String]) -> Result<Vec<ImageRecord>>;

    /// Records sharing the exact content hash, earliest inserted first
    /// (creation time ascending, record id as tiebreak).
    async fn records_by_content_hash(&self, content_hash: &str) -> Result<Vec<ImageRecord>>;

    /// Wipe both collections.
    async fn clear_all(&self) -> Result<()>;
}

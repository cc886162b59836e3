//! MongoDB-backed corpus repository.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::{Client, Collection, Database};
use tracing::{debug, info};

use visum_core::{CorpusStore, ImageRecord, Result, SimilarityLink, StoreConfig};

/// MongoDB implementation of [`CorpusStore`].
///
/// Both collections are created at connect time when absent. A wipe drops
/// them; the next insert recreates them implicitly.
pub struct Corpus {
    images: Collection<ImageRecord>,
    links: Collection<SimilarityLink>,
}

impl Corpus {
    /// Connect to the store and ensure both collections exist.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let client = Client::with_uri_str(config.connection_uri()).await?;
        let database = client.database(&config.database);
        ensure_collections(
            &database,
            &[&config.images_collection, &config.links_collection],
        )
        .await?;

        info!(
            database = %config.database,
            images = %config.images_collection,
            links = %config.links_collection,
            "connected to document store"
        );

        Ok(Self {
            images: database.collection(&config.images_collection),
            links: database.collection(&config.links_collection),
        })
    }
}

async fn ensure_collections(database: &Database, names: &[&str]) -> Result<()> {
    let existing = database.list_collection_names().await?;
    for name in names {
        if !existing.iter().any(|n| n == name) {
            database.create_collection(*name).await?;
            debug!(collection = name, "created missing collection");
        }
    }
    Ok(())
}

#[async_trait]
impl CorpusStore for Corpus {
    async fn insert_record(&self, record: &ImageRecord) -> Result<()> {
        self.images.insert_one(record).await?;
        Ok(())
    }

    async fn insert_links(&self, links: &[SimilarityLink]) -> Result<()> {
        if links.is_empty() {
            return Ok(());
        }
        self.links.insert_many(links).await?;
        Ok(())
    }

    async fn all_records(&self) -> Result<Vec<ImageRecord>> {
        let cursor = self.images.find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn records_by_ids(&self, ids: &[String]) -> Result<Vec<ImageRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self
            .images
            .find(doc! { "_id": { "$in": ids.to_vec() } })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn records_by_content_hash(&self, content_hash: &str) -> Result<Vec<ImageRecord>> {
        let cursor = self
            .images
            .find(doc! { "content_hash": content_hash })
            .sort(doc! { "created_at_utc": 1, "_id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn clear_all(&self) -> Result<()> {
        self.images.drop().await?;
        self.links.drop().await?;
        Ok(())
    }
}

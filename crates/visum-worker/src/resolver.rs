//! Recognition resolver.
//!
//! Decides where a task's text comes from: records sharing the exact
//! content hash are consulted before the extraction service is called. A
//! record with the identical path means the task was already processed; a
//! content-identical record with text means extraction can be skipped.

use std::io::Cursor;
use std::sync::Arc;

use image::imageops::FilterType;
use image::GenericImageView;
use tracing::{debug, warn};

use visum_core::{CorpusStore, Fingerprint, ImageTask, Result};
use visum_ocr::TextRecognizer;

/// Where the text for a task came from, or why there is none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The exact path was already processed under this content hash.
    AlreadyRecognized,
    /// Extraction produced text at or under the configured minimum length.
    TextTooShort,
    /// Usable text, reused from a content-identical record or freshly
    /// extracted.
    Text(String),
}

/// Resolves task text from the corpus cache before falling back to the
/// extraction service.
pub struct Resolver {
    corpus: Arc<dyn CorpusStore>,
    recognizer: Arc<dyn TextRecognizer>,
    min_text_len: usize,
}

impl Resolver {
    pub fn new(
        corpus: Arc<dyn CorpusStore>,
        recognizer: Arc<dyn TextRecognizer>,
        min_text_len: usize,
    ) -> Self {
        Self {
            corpus,
            recognizer,
            min_text_len,
        }
    }

    /// Resolve the text for a task whose fingerprint is already computed.
    pub async fn resolve(
        &self,
        task: &ImageTask,
        fingerprint: &Fingerprint,
    ) -> Result<Resolution> {
        let twins = self
            .corpus
            .records_by_content_hash(&fingerprint.content_hash)
            .await?;

        if twins.iter().any(|r| r.image_path == task.image_path) {
            debug!(
                image_id = %task.image_id,
                "path already recognized under this content hash"
            );
            return Ok(Resolution::AlreadyRecognized);
        }

        // Twins come back earliest-inserted first, so the first record with
        // text is the one every later duplicate reuses.
        if let Some(text) = twins.iter().find_map(|r| r.recognized_text.clone()) {
            debug!(
                image_id = %task.image_id,
                "reusing text from content-identical record"
            );
            return Ok(Resolution::Text(text));
        }

        let text = self.extract(task).await?;
        if text.chars().count() <= self.min_text_len {
            return Ok(Resolution::TextTooShort);
        }
        Ok(Resolution::Text(text))
    }

    /// Run extraction, retrying once with a 2x upscale on failure.
    async fn extract(&self, task: &ImageTask) -> Result<String> {
        let data = tokio::fs::read(&task.image_path).await?;
        match self.recognizer.recognize(&data).await {
            Ok(text) => Ok(text),
            Err(first) => {
                warn!(
                    image_id = %task.image_id,
                    error = %first,
                    attempt = 2,
                    "extraction failed, retrying upscaled"
                );
                let upscaled = upscale_2x(&data)?;
                self.recognizer.recognize(&upscaled).await
            }
        }
    }
}

/// Double an encoded image's dimensions with linear interpolation,
/// re-encoding as PNG.
fn upscale_2x(data: &[u8]) -> Result<Vec<u8>> {
    let image = image::load_from_memory(data)?;
    let upscaled = image.resize_exact(
        image.width() * 2,
        image.height() * 2,
        FilterType::Triangle,
    );
    let mut out = Cursor::new(Vec::new());
    upscaled.write_to(&mut out, image::ImageFormat::Png)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;
    use visum_core::ImageRecord;
    use visum_ocr::MockRecognizer;
    use visum_store::MemoryCorpus;

    fn write_png(dir: &TempDir, name: &str) -> String {
        let path = dir.path().join(name);
        RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 64]))
            .save(&path)
            .unwrap();
        path.to_string_lossy().into_owned()
    }

    fn task(path: &str) -> ImageTask {
        ImageTask {
            image_id: "img-new".to_string(),
            image_path: path.to_string(),
        }
    }

    fn resolver(
        corpus: &Arc<MemoryCorpus>,
        recognizer: &Arc<MockRecognizer>,
        min_text_len: usize,
    ) -> Resolver {
        Resolver::new(corpus.clone(), recognizer.clone(), min_text_len)
    }

    #[tokio::test]
    async fn test_resolve_same_path_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(&dir, "a.png");
        let fp = visum_fingerprint::generate(std::path::Path::new(&path)).unwrap();

        let corpus = Arc::new(MemoryCorpus::new());
        let stored = ImageRecord::new(&fp, "img-old", &path, Some("stored text".into()));
        corpus.insert_record(&stored).await.unwrap();

        let recognizer = Arc::new(MockRecognizer::new());
        let resolution = resolver(&corpus, &recognizer, 3)
            .resolve(&task(&path), &fp)
            .await
            .unwrap();

        assert_eq!(resolution, Resolution::AlreadyRecognized);
        assert_eq!(recognizer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_resolve_reuses_twin_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(&dir, "a.png");
        let copy = dir.path().join("b.png");
        std::fs::copy(&path, &copy).unwrap();
        let copy = copy.to_string_lossy().into_owned();
        let fp = visum_fingerprint::generate(std::path::Path::new(&copy)).unwrap();

        let corpus = Arc::new(MemoryCorpus::new());
        let stored = ImageRecord::new(&fp, "img-old", &path, Some("reused text".into()));
        corpus.insert_record(&stored).await.unwrap();

        let recognizer = Arc::new(MockRecognizer::new().with_text("never returned"));
        let resolution = resolver(&corpus, &recognizer, 3)
            .resolve(&task(&copy), &fp)
            .await
            .unwrap();

        assert_eq!(resolution, Resolution::Text("reused text".to_string()));
        assert_eq!(recognizer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_resolve_extracts_when_corpus_misses() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(&dir, "a.png");
        let fp = visum_fingerprint::generate(std::path::Path::new(&path)).unwrap();

        let corpus = Arc::new(MemoryCorpus::new());
        let recognizer = Arc::new(MockRecognizer::new().with_text("fresh extraction"));
        let resolution = resolver(&corpus, &recognizer, 3)
            .resolve(&task(&path), &fp)
            .await
            .unwrap();

        assert_eq!(resolution, Resolution::Text("fresh extraction".to_string()));
        assert_eq!(recognizer.call_count(), 1);
    }

    #[tokio::test]
    async fn test_resolve_short_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(&dir, "a.png");
        let fp = visum_fingerprint::generate(std::path::Path::new(&path)).unwrap();

        let corpus = Arc::new(MemoryCorpus::new());
        let recognizer = Arc::new(MockRecognizer::new().with_text("ab"));
        let resolution = resolver(&corpus, &recognizer, 3)
            .resolve(&task(&path), &fp)
            .await
            .unwrap();

        assert_eq!(resolution, Resolution::TextTooShort);
    }

    #[tokio::test]
    async fn test_resolve_retries_upscaled_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(&dir, "a.png");
        let fp = visum_fingerprint::generate(std::path::Path::new(&path)).unwrap();

        let corpus = Arc::new(MemoryCorpus::new());
        let recognizer = Arc::new(
            MockRecognizer::new()
                .with_text("second time lucky")
                .with_failures(1),
        );
        let resolution = resolver(&corpus, &recognizer, 3)
            .resolve(&task(&path), &fp)
            .await
            .unwrap();

        assert_eq!(resolution, Resolution::Text("second time lucky".to_string()));
        assert_eq!(recognizer.call_count(), 2);
    }

    #[tokio::test]
    async fn test_resolve_double_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(&dir, "a.png");
        let fp = visum_fingerprint::generate(std::path::Path::new(&path)).unwrap();

        let corpus = Arc::new(MemoryCorpus::new());
        let recognizer = Arc::new(MockRecognizer::new().with_failures(2));
        let result = resolver(&corpus, &recognizer, 3)
            .resolve(&task(&path), &fp)
            .await;

        assert!(result.is_err());
        assert_eq!(recognizer.call_count(), 2);
    }

    #[test]
    fn test_upscale_doubles_dimensions() {
        let mut encoded = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(RgbImage::new(10, 6))
            .write_to(&mut encoded, image::ImageFormat::Png)
            .unwrap();

        let upscaled = upscale_2x(&encoded.into_inner()).unwrap();
        let decoded = image::load_from_memory(&upscaled).unwrap();
        assert_eq!(decoded.width(), 20);
        assert_eq!(decoded.height(), 12);
    }
}

//! # visum-ocr
//!
//! Text recognition backend abstraction for the visum image worker.
//!
//! The worker only ever talks to the [`TextRecognizer`] trait; the HTTP
//! implementation calls the external recognition service, and the mock
//! implementation scripts responses for tests.

pub mod http;
pub mod mock;

use async_trait::async_trait;
use visum_core::Result;

pub use http::HttpRecognizer;
pub use mock::MockRecognizer;

/// Backend for extracting text from images.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Extract text from encoded image bytes.
    async fn recognize(&self, image_data: &[u8]) -> Result<String>;

    /// Check if the recognition backend is available.
    async fn health_check(&self) -> Result<bool>;
}

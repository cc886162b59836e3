//! Mock recognizer for testing.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use visum_core::{Error, Result};

use crate::TextRecognizer;

/// Recognizer that returns a fixed text without network calls.
///
/// Supports scripting a number of leading failures so retry paths can be
/// exercised deterministically.
pub struct MockRecognizer {
    text: String,
    failures: usize,
    calls: AtomicUsize,
    healthy: bool,
}

impl MockRecognizer {
    pub fn new() -> Self {
        Self {
            text: "mock recognized text".to_string(),
            failures: 0,
            calls: AtomicUsize::new(0),
            healthy: true,
        }
    }

    /// Set the text returned by successful calls.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Fail the first `n` calls before succeeding.
    pub fn with_failures(mut self, n: usize) -> Self {
        self.failures = n;
        self
    }

    pub fn with_healthy(mut self, healthy: bool) -> Self {
        self.healthy = healthy;
        self
    }

    /// Number of `recognize` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextRecognizer for MockRecognizer {
    async fn recognize(&self, _image_data: &[u8]) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(Error::Recognition(format!(
                "mock failure on call {}",
                call + 1
            )));
        }
        Ok(self.text.clone())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.healthy)
    }
}

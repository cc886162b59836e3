//! HTTP recognition backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use visum_core::{Error, RecognizerConfig, Result};

use crate::TextRecognizer;

/// Client for an HTTP text recognition service.
///
/// The service accepts `POST {base}/recognize` with a base64 image payload
/// and answers `{"text": "..."}`.
pub struct HttpRecognizer {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpRecognizer {
    pub fn new(base_url: String, timeout_secs: u64) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
            timeout_secs,
        }
    }

    pub fn from_config(config: &RecognizerConfig) -> Self {
        Self::new(config.url.clone(), config.timeout_secs)
    }
}

#[derive(Serialize)]
struct RecognizeRequest {
    image: String, // base64 encoded
}

#[derive(Deserialize)]
struct RecognizeResponse {
    text: String,
}

#[async_trait]
impl TextRecognizer for HttpRecognizer {
    async fn recognize(&self, image_data: &[u8]) -> Result<String> {
        use base64::Engine;
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(image_data);

        let request = RecognizeRequest { image: image_b64 };

        let url = format!("{}/recognize", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| Error::Recognition(format!("Recognition request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Recognition(format!(
                "Recognition API returned {}: {}",
                status, body
            )));
        }

        let result: RecognizeResponse = response.json().await.map_err(|e| {
            Error::Recognition(format!("Failed to parse recognition response: {}", e))
        })?;

        Ok(result.text)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_recognizer_new() {
        let backend = HttpRecognizer::new("http://localhost:8000".to_string(), 60);
        assert_eq!(backend.base_url, "http://localhost:8000");
        assert_eq!(backend.timeout_secs, 60);
    }

    #[test]
    fn test_http_recognizer_from_config() {
        let config = RecognizerConfig {
            url: "http://ocr.local:8000".to_string(),
            timeout_secs: 30,
            min_text_len: 3,
        };
        let backend = HttpRecognizer::from_config(&config);
        assert_eq!(backend.base_url, "http://ocr.local:8000");
        assert_eq!(backend.timeout_secs, 30);
    }

    #[test]
    fn test_recognize_request_serialization() {
        let request = RecognizeRequest {
            image: "base64data".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["image"], "base64data");
    }

    #[test]
    fn test_recognize_response_deserialization() {
        let json = r#"{"text": "invoice number 42"}"#;
        let response: RecognizeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text, "invoice number 42");
    }
}

//! Core data models for visum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Perceptual hash kinds, in matching precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashKind {
    Average,
    Difference,
    Wavelet,
    Color,
}

impl HashKind {
    /// All kinds, in the order the matcher evaluates them.
    pub const ALL: [HashKind; 4] = [
        HashKind::Average,
        HashKind::Difference,
        HashKind::Wavelet,
        HashKind::Color,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HashKind::Average => "average",
            HashKind::Difference => "difference",
            HashKind::Wavelet => "wavelet",
            HashKind::Color => "color",
        }
    }
}

impl std::fmt::Display for HashKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five content signatures computed for every image.
///
/// `content_hash` is an exact digest of the file bytes; the other four are
/// perceptual hashes that tolerate small visual differences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub content_hash: String,
    pub average_hash: String,
    pub difference_hash: String,
    pub wavelet_hash: String,
    pub color_hash: String,
}

impl Fingerprint {
    /// The stored hash string for one perceptual kind.
    pub fn hash(&self, kind: HashKind) -> &str {
        match kind {
            HashKind::Average => &self.average_hash,
            HashKind::Difference => &self.difference_hash,
            HashKind::Wavelet => &self.wavelet_hash,
            HashKind::Color => &self.color_hash,
        }
    }
}

/// A processed image as persisted in the images collection.
///
/// Records are append-only: a task either inserts a complete record or
/// inserts nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub content_hash: String,
    pub average_hash: String,
    pub difference_hash: String,
    pub wavelet_hash: String,
    pub color_hash: String,
    pub image_id: String,
    pub image_path: String,
    pub recognized_text: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at_utc: DateTime<Utc>,
}

impl ImageRecord {
    pub fn new(
        fingerprint: &Fingerprint,
        image_id: impl Into<String>,
        image_path: impl Into<String>,
        recognized_text: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content_hash: fingerprint.content_hash.clone(),
            average_hash: fingerprint.average_hash.clone(),
            difference_hash: fingerprint.difference_hash.clone(),
            wavelet_hash: fingerprint.wavelet_hash.clone(),
            color_hash: fingerprint.color_hash.clone(),
            image_id: image_id.into(),
            image_path: image_path.into(),
            recognized_text,
            created_at_utc: Utc::now(),
        }
    }

    /// The stored hash string for one perceptual kind.
    pub fn hash(&self, kind: HashKind) -> &str {
        match kind {
            HashKind::Average => &self.average_hash,
            HashKind::Difference => &self.difference_hash,
            HashKind::Wavelet => &self.wavelet_hash,
            HashKind::Color => &self.color_hash,
        }
    }
}

/// A directed similarity link between two records, persisted in the links
/// collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityLink {
    #[serde(rename = "_id")]
    pub id: String,
    pub source_record_id: String,
    pub target_record_id: String,
}

impl SimilarityLink {
    pub fn new(source_record_id: impl Into<String>, target_record_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source_record_id: source_record_id.into(),
            target_record_id: target_record_id.into(),
        }
    }
}

/// Payload of an extraction or compare task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageTask {
    pub image_id: String,
    pub image_path: String,
}

/// Payload of a maintenance task. A missing action is handled as unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceTask {
    #[serde(default)]
    pub action: Option<String>,
}

/// One matched image inside a published compare result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarImage {
    pub image_id: String,
    pub image_path: String,
    pub similarity: f64,
    pub recognized_text: Option<String>,
}

/// Result of a compare task, published to the response queue when at least
/// one similar image was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareResult {
    pub image_id: String,
    pub image_path: String,
    pub recognized_text: String,
    pub similar_images: Vec<SimilarImage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fingerprint() -> Fingerprint {
        Fingerprint {
            content_hash: "aabbccddeeff00112233445566778899".to_string(),
            average_hash: "ffd8d8c0c0d8f8f8".to_string(),
            difference_hash: "cc9c9c4e4e261313".to_string(),
            wavelet_hash: "ffd8d8c0c0d8f8f8".to_string(),
            color_hash: "0700000000000000000000000007".to_string(),
        }
    }

    #[test]
    fn test_hash_kind_order() {
        assert_eq!(
            HashKind::ALL,
            [
                HashKind::Average,
                HashKind::Difference,
                HashKind::Wavelet,
                HashKind::Color
            ]
        );
        assert_eq!(HashKind::Wavelet.as_str(), "wavelet");
        assert_eq!(HashKind::Color.to_string(), "color");
    }

    #[test]
    fn test_fingerprint_hash_accessor() {
        let fp = sample_fingerprint();
        assert_eq!(fp.hash(HashKind::Average), fp.average_hash);
        assert_eq!(fp.hash(HashKind::Difference), fp.difference_hash);
        assert_eq!(fp.hash(HashKind::Wavelet), fp.wavelet_hash);
        assert_eq!(fp.hash(HashKind::Color), fp.color_hash);
    }

    #[test]
    fn test_image_record_new_copies_fingerprint() {
        let fp = sample_fingerprint();
        let record = ImageRecord::new(&fp, "img-1", "/data/in/img-1.png", Some("text".into()));

        assert_eq!(record.content_hash, fp.content_hash);
        assert_eq!(record.hash(HashKind::Color), fp.color_hash);
        assert_eq!(record.image_id, "img-1");
        assert_eq!(record.recognized_text.as_deref(), Some("text"));
        assert!(!record.id.is_empty());
    }

    #[test]
    fn test_image_record_distinct_ids() {
        let fp = sample_fingerprint();
        let a = ImageRecord::new(&fp, "img-1", "/data/a.png", None);
        let b = ImageRecord::new(&fp, "img-1", "/data/a.png", None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_image_record_document_shape() {
        let fp = sample_fingerprint();
        let record = ImageRecord::new(&fp, "img-1", "/data/in/img-1.png", None);
        let doc = bson::to_document(&record).unwrap();

        assert_eq!(doc.get_str("_id").unwrap(), record.id);
        assert_eq!(doc.get_str("content_hash").unwrap(), record.content_hash);
        assert!(matches!(
            doc.get("created_at_utc"),
            Some(bson::Bson::DateTime(_))
        ));
        assert!(matches!(
            doc.get("recognized_text"),
            Some(bson::Bson::Null)
        ));
    }

    #[test]
    fn test_image_task_deserialize() {
        let task: ImageTask =
            serde_json::from_str(r#"{"image_id": "img-7", "image_path": "/data/in/img-7.jpg"}"#)
                .unwrap();
        assert_eq!(task.image_id, "img-7");
        assert_eq!(task.image_path, "/data/in/img-7.jpg");
    }

    #[test]
    fn test_maintenance_task_missing_action() {
        let task: MaintenanceTask = serde_json::from_str("{}").unwrap();
        assert_eq!(task.action, None);

        let task: MaintenanceTask =
            serde_json::from_str(r#"{"action": "clear_all_collections"}"#).unwrap();
        assert_eq!(task.action.as_deref(), Some("clear_all_collections"));
    }

    #[test]
    fn test_similarity_link_new() {
        let link = SimilarityLink::new("source-id", "target-id");
        assert_eq!(link.source_record_id, "source-id");
        assert_eq!(link.target_record_id, "target-id");
        assert_ne!(link.id, SimilarityLink::new("source-id", "target-id").id);
    }

    #[test]
    fn test_compare_result_serialize() {
        let result = CompareResult {
            image_id: "img-2".to_string(),
            image_path: "/data/in/img-2.png".to_string(),
            recognized_text: "invoice 42".to_string(),
            similar_images: vec![SimilarImage {
                image_id: "img-1".to_string(),
                image_path: "/data/in/img-1.png".to_string(),
                similarity: 90.0,
                recognized_text: None,
            }],
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["image_id"], "img-2");
        assert_eq!(value["similar_images"][0]["similarity"], 90.0);
        assert!(value["similar_images"][0]["recognized_text"].is_null());
    }
}

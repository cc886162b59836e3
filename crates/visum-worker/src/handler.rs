//! Task handler seam between the dispatcher and the domain logic.

use std::path::Path;

use async_trait::async_trait;
use tracing::warn;

use visum_core::{Fingerprint, ImageTask, Result};

/// File extensions admitted at task intake, matched case-insensitively.
pub const ALLOWED_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

/// Outcome strings reported for acknowledged tasks.
pub mod outcome {
    pub const IMAGE_NOT_FOUND: &str = "image not found";
    pub const BAD_EXTENSION: &str = "incorrect file extension";
    pub const RECOGNITION_COMPLETED: &str = "recognition completed";
    pub const ALREADY_RECOGNIZED: &str = "image already recognized";
    pub const TEXT_NOT_RECOGNIZED: &str = "text not recognized";
    pub const COMPARISON_COMPLETED: &str = "comparison completed";
    pub const MAINTENANCE_NOT_ALLOWED: &str = "maintenance action not allowed";
    pub const UNKNOWN_MAINTENANCE_ACTION: &str = "unknown maintenance action";
    pub const COLLECTIONS_CLEARED: &str = "collections cleared";
}

/// Result of a task that gets acknowledged.
///
/// Both variants acknowledge the message; `Rejected` marks the expected,
/// non-fatal input rejections and is logged at warn. Processing errors are
/// not outcomes: they propagate as `Err` and dead-letter the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The task did its work.
    Completed(&'static str),
    /// The input was rejected before any work happened.
    Rejected(&'static str),
}

impl TaskOutcome {
    /// The outcome string reported for logging and monitoring.
    pub fn message(&self) -> &'static str {
        match self {
            TaskOutcome::Completed(msg) | TaskOutcome::Rejected(msg) => msg,
        }
    }
}

/// Trait for queue task handlers.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// The queue this handler consumes.
    fn queue(&self) -> &'static str;

    /// Process one raw message payload.
    async fn execute(&self, payload: &[u8]) -> Result<TaskOutcome>;
}

/// Intake decision for an image task.
pub(crate) enum Intake {
    /// The input was rejected with an outcome string.
    Rejected(&'static str),
    /// The file was admitted and fingerprinted.
    Accepted(Fingerprint),
}

/// Whether the path carries an admitted image extension.
pub(crate) fn allowed_extension(path: &str) -> bool {
    let lower = path.to_lowercase();
    ALLOWED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Validate an image task and fingerprint the file.
///
/// Missing files and disallowed extensions are rejections, checked before
/// any byte of the file is read. Fingerprinting failures (unreadable or
/// undecodable files) propagate as errors.
pub(crate) fn intake(task: &ImageTask) -> Result<Intake> {
    if !Path::new(&task.image_path).exists() {
        warn!(
            image_id = %task.image_id,
            image_path = %task.image_path,
            outcome = outcome::IMAGE_NOT_FOUND,
            "image file missing"
        );
        return Ok(Intake::Rejected(outcome::IMAGE_NOT_FOUND));
    }
    if !allowed_extension(&task.image_path) {
        warn!(
            image_id = %task.image_id,
            image_path = %task.image_path,
            outcome = outcome::BAD_EXTENSION,
            "extension not in allow-list"
        );
        return Ok(Intake::Rejected(outcome::BAD_EXTENSION));
    }

    let fingerprint = visum_fingerprint::generate(Path::new(&task.image_path))?;
    Ok(Intake::Accepted(fingerprint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_allowed_extensions() {
        assert!(allowed_extension("/data/in/scan.jpg"));
        assert!(allowed_extension("/data/in/scan.JPEG"));
        assert!(allowed_extension("/data/in/scan.Png"));
        assert!(!allowed_extension("/data/in/scan.bmp"));
        assert!(!allowed_extension("/data/in/scan.png.enc"));
        assert!(!allowed_extension("/data/in/scan"));
    }

    #[test]
    fn test_outcome_message() {
        assert_eq!(
            TaskOutcome::Completed(outcome::RECOGNITION_COMPLETED).message(),
            "recognition completed"
        );
        assert_eq!(
            TaskOutcome::Rejected(outcome::IMAGE_NOT_FOUND).message(),
            "image not found"
        );
    }

    #[test]
    fn test_intake_missing_file() {
        let task = ImageTask {
            image_id: "img-1".to_string(),
            image_path: "/nonexistent/img-1.png".to_string(),
        };
        assert!(matches!(
            intake(&task).unwrap(),
            Intake::Rejected(outcome::IMAGE_NOT_FOUND)
        ));
    }

    #[test]
    fn test_intake_rejects_extension_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.bmp");
        // Not a decodable image; the extension check must fire first.
        std::fs::write(&path, b"not an image").unwrap();

        let task = ImageTask {
            image_id: "img-1".to_string(),
            image_path: path.to_string_lossy().into_owned(),
        };
        assert!(matches!(
            intake(&task).unwrap(),
            Intake::Rejected(outcome::BAD_EXTENSION)
        ));
    }

    #[test]
    fn test_intake_fingerprints_admitted_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 64]))
            .save(&path)
            .unwrap();

        let task = ImageTask {
            image_id: "img-1".to_string(),
            image_path: path.to_string_lossy().into_owned(),
        };
        match intake(&task).unwrap() {
            Intake::Accepted(fp) => {
                assert_eq!(fp.content_hash.len(), 32);
                assert_eq!(fp.color_hash.len(), 28);
            }
            Intake::Rejected(msg) => panic!("rejected admissible file: {msg}"),
        }
    }

    #[test]
    fn test_intake_propagates_decode_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image at all").unwrap();

        let task = ImageTask {
            image_id: "img-1".to_string(),
            image_path: path.to_string_lossy().into_owned(),
        };
        assert!(intake(&task).is_err());
    }
}

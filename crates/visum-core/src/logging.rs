//! Structured logging schema and field name constants for visum.
//!
//! All crates use these constants for consistent structured logging fields.
//! This ensures log aggregation tools (Loki, Elasticsearch) can query by
//! standardized field names across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Task failures (dead-lettered), connection loss, publish failures |
//! | WARN  | Input rejections, recognition retries, degraded collaborators |
//! | INFO  | Lifecycle events (startup, shutdown), task completions |
//! | DEBUG | Tier decisions, drain-cycle counts, reconnect attempts |
//! | TRACE | Per-record scan iteration, payload contents |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID attached to published results.
/// Format: UUIDv4.
pub const CORRELATION_ID: &str = "correlation_id";

/// Subsystem originating the log event.
/// Values: "worker", "store", "fingerprint", "match", "ocr"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "extract", "compare", "maintain", "publish", "connect"
pub const OPERATION: &str = "op";

/// Queue the event relates to.
pub const QUEUE: &str = "queue";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// External image identifier from the task payload.
pub const IMAGE_ID: &str = "image_id";

/// Filesystem path of the image being processed.
pub const IMAGE_PATH: &str = "image_path";

/// Corpus record UUID.
pub const RECORD_ID: &str = "record_id";

/// Maintenance action name.
pub const ACTION: &str = "action";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of records returned by a corpus query or scan.
pub const RESULT_COUNT: &str = "result_count";

/// Number of matches found by a compare scan.
pub const MATCH_COUNT: &str = "match_count";

/// Bit distance between two hashes of the same kind.
pub const DISTANCE: &str = "distance";

/// Similarity score (0..=100).
pub const SCORE: &str = "score";

/// Perceptual hash kind that decided a match.
pub const HASH_KIND: &str = "hash_kind";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Task outcome string ("recognition completed", "image not found", ...).
pub const OUTCOME: &str = "outcome";

/// Whether an operation succeeded (true/false).
pub const SUCCESS: &str = "success";

/// Error message on failure paths.
pub const ERROR_MSG: &str = "error";

/// Recognition attempt number (1 = original scale, 2 = upscaled retry).
pub const ATTEMPT: &str = "attempt";

//! # visum-fingerprint
//!
//! Content and perceptual hashing for the visum image worker.
//!
//! A fingerprint is five hash strings: an exact digest of the file bytes
//! and four perceptual hashes of the decoded pixels (average, difference,
//! wavelet, color). The content hash is compared only by equality; the
//! perceptual kinds by bit distance.

pub mod content;
pub mod perceptual;

use std::path::Path;

use visum_core::{Fingerprint, Result};

pub use content::hash_file;
pub use perceptual::{average_hash, bit_distance, color_hash, difference_hash, wavelet_hash};

/// Compute the full five-part fingerprint for the image at `path`.
///
/// The file is read twice: streamed for the content hash, then decoded once
/// for all four perceptual hashes.
pub fn generate(path: &Path) -> Result<Fingerprint> {
    let content_hash = content::hash_file(path)?;
    let image = image::open(path)?;
    Ok(Fingerprint {
        content_hash,
        average_hash: perceptual::average_hash(&image),
        difference_hash: perceptual::difference_hash(&image),
        wavelet_hash: perceptual::wavelet_hash(&image),
        color_hash: perceptual::color_hash(&image),
    })
}

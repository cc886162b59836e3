//! Perceptual hashes over decoded image content.
//!
//! Four kinds, each serialized as lowercase hex and compared by bit
//! distance: average (mean threshold), difference (horizontal gradient),
//! wavelet (Haar approximation cascade), and color (HSV bucket histogram).
//! The first two come from `image_hasher`; the last two are computed here.

use image::imageops::FilterType;
use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig};
use visum_core::{Error, Result};

/// Side length of the 64-bit hash grid.
const HASH_SIZE: u32 = 8;
/// Working scale for the wavelet hash before the cascade.
const WAVELET_SCALE: u32 = 64;
/// Cascade levels from the working scale down to the hash grid.
const WAVELET_LEVELS: usize = 3;
/// Per-bucket quantization bits for the color hash.
const COLOR_BITS: u32 = 3;
/// Hue sextants per saturation band.
const HUE_BINS: usize = 6;

/// Value ceiling below which a pixel counts as black.
const BLACK_VALUE_CEIL: f64 = 0.125;
/// Saturation ceiling below which a non-black pixel counts as gray.
const GRAY_SATURATION_CEIL: f64 = 0.2;
/// Saturation floor above which a hue lands in the strong band.
const STRONG_SATURATION_FLOOR: f64 = 0.6;

/// 64-bit mean-threshold hash.
pub fn average_hash(image: &DynamicImage) -> String {
    let hasher = HasherConfig::new()
        .hash_size(HASH_SIZE, HASH_SIZE)
        .hash_alg(HashAlg::Mean)
        .to_hasher();
    hex::encode(hasher.hash_image(image).as_bytes())
}

/// 64-bit horizontal-gradient hash.
pub fn difference_hash(image: &DynamicImage) -> String {
    let hasher = HasherConfig::new()
        .hash_size(HASH_SIZE, HASH_SIZE)
        .hash_alg(HashAlg::Gradient)
        .to_hasher();
    hex::encode(hasher.hash_image(image).as_bytes())
}

/// 64-bit Haar-approximation hash.
///
/// Grayscale at 64x64, then three approximation levels (each 2x2 block
/// collapses to its mean) down to 8x8, thresholded at the median.
pub fn wavelet_hash(image: &DynamicImage) -> String {
    let gray = image::imageops::resize(
        &image.to_luma8(),
        WAVELET_SCALE,
        WAVELET_SCALE,
        FilterType::Lanczos3,
    );

    let mut values: Vec<f64> = gray.pixels().map(|p| p.0[0] as f64 / 255.0).collect();
    let mut side = WAVELET_SCALE as usize;
    for _ in 0..WAVELET_LEVELS {
        values = halve(&values, side);
        side /= 2;
    }

    let mut sorted = values.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    let median = (sorted[mid - 1] + sorted[mid]) / 2.0;

    let mut bytes = [0u8; (HASH_SIZE * HASH_SIZE / 8) as usize];
    for (i, value) in values.iter().enumerate() {
        if *value > median {
            bytes[i / 8] |= 1 << (7 - (i % 8));
        }
    }
    hex::encode(bytes)
}

/// One Haar approximation level: each 2x2 block collapses to its mean.
fn halve(values: &[f64], side: usize) -> Vec<f64> {
    let half = side / 2;
    let mut out = vec![0.0; half * half];
    for y in 0..half {
        for x in 0..half {
            let i = 2 * y * side + 2 * x;
            out[y * half + x] =
                (values[i] + values[i + 1] + values[i + side] + values[i + side + 1]) / 4.0;
        }
    }
    out
}

/// 14-bucket HSV histogram hash: black, gray, six hue sextants at strong
/// saturation, six at mild saturation. Each bucket fraction is quantized to
/// three bits and serialized as two hex chars (28 chars total).
pub fn color_hash(image: &DynamicImage) -> String {
    let rgb = image.to_rgb8();
    let total = (rgb.width() as u64 * rgb.height() as u64) as f64;

    let mut counts = [0u64; 2 + 2 * HUE_BINS];
    for pixel in rgb.pixels() {
        let (h, s, v) = rgb_to_hsv(pixel.0[0], pixel.0[1], pixel.0[2]);
        let bucket = if v <= BLACK_VALUE_CEIL {
            0
        } else if s <= GRAY_SATURATION_CEIL {
            1
        } else {
            let sextant = ((h / 60.0) as usize).min(HUE_BINS - 1);
            if s > STRONG_SATURATION_FLOOR {
                2 + sextant
            } else {
                2 + HUE_BINS + sextant
            }
        };
        counts[bucket] += 1;
    }

    let max_level = ((1u32 << COLOR_BITS) - 1) as f64;
    let mut out = String::with_capacity(counts.len() * 2);
    for count in counts {
        let level = ((count as f64 / total) * max_level).round() as u8;
        out.push_str(&format!("{level:02x}"));
    }
    out
}

fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let s = if max == 0.0 { 0.0 } else { delta / max };
    (h, s, max)
}

/// Number of differing bits between two hex-serialized hashes of the same
/// kind. Hashes of different lengths are not comparable.
pub fn bit_distance(a: &str, b: &str) -> Result<u32> {
    if a.len() != b.len() {
        return Err(Error::InvalidInput(format!(
            "hash length mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    let left = hex::decode(a).map_err(|e| Error::InvalidInput(format!("invalid hash hex: {e}")))?;
    let right =
        hex::decode(b).map_err(|e| Error::InvalidInput(format!("invalid hash hex: {e}")))?;
    Ok(left
        .iter()
        .zip(right.iter())
        .map(|(x, y)| (x ^ y).count_ones())
        .sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(r: u8, g: u8, b: u8) -> DynamicImage {
        let mut img = RgbImage::new(32, 32);
        for pixel in img.pixels_mut() {
            *pixel = Rgb([r, g, b]);
        }
        DynamicImage::ImageRgb8(img)
    }

    fn gradient() -> DynamicImage {
        let img = RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 128]));
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_hash_shapes() {
        let img = gradient();
        assert_eq!(average_hash(&img).len(), 16);
        assert_eq!(difference_hash(&img).len(), 16);
        assert_eq!(wavelet_hash(&img).len(), 16);
        assert_eq!(color_hash(&img).len(), 28);
    }

    #[test]
    fn test_hashes_deterministic() {
        let a = gradient();
        let b = gradient();
        assert_eq!(average_hash(&a), average_hash(&b));
        assert_eq!(difference_hash(&a), difference_hash(&b));
        assert_eq!(wavelet_hash(&a), wavelet_hash(&b));
        assert_eq!(color_hash(&a), color_hash(&b));
    }

    #[test]
    fn test_wavelet_hash_of_flat_image_is_zero() {
        // Every cascade value equals the median, and the threshold is
        // strict, so no bit is set.
        assert_eq!(wavelet_hash(&solid(128, 128, 128)), "0000000000000000");
    }

    #[test]
    fn test_wavelet_hash_of_gradient_has_bits() {
        assert_ne!(wavelet_hash(&gradient()), "0000000000000000");
    }

    #[test]
    fn test_color_hash_separates_hues() {
        // Solid red fills the strong-saturation sextant 0; solid blue fills
        // sextant 4. One full bucket quantizes to 7, so the two hashes
        // differ by exactly the bits of 0x07 on each side.
        let red = color_hash(&solid(255, 0, 0));
        let blue = color_hash(&solid(0, 0, 255));
        assert_ne!(red, blue);
        assert_eq!(bit_distance(&red, &blue).unwrap(), 6);
    }

    #[test]
    fn test_color_hash_black_and_gray_buckets() {
        let black = color_hash(&solid(10, 10, 10));
        assert!(black.starts_with("07"));

        let gray = color_hash(&solid(200, 200, 200));
        assert!(gray.starts_with("0007"));
    }

    #[test]
    fn test_bit_distance_identity() {
        assert_eq!(bit_distance("ffd8d8c0", "ffd8d8c0").unwrap(), 0);
    }

    #[test]
    fn test_bit_distance_counts_bits() {
        assert_eq!(
            bit_distance("0000000000000000", "0000000000000003").unwrap(),
            2
        );
        assert_eq!(
            bit_distance("0000000000000000", "ffffffffffffffff").unwrap(),
            64
        );
    }

    #[test]
    fn test_bit_distance_length_mismatch() {
        let err = bit_distance("00", "0000").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_bit_distance_invalid_hex() {
        let err = bit_distance("zz", "00").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_rgb_to_hsv_primaries() {
        let (h, s, v) = rgb_to_hsv(255, 0, 0);
        assert_eq!((h, s, v), (0.0, 1.0, 1.0));

        let (h, _, _) = rgb_to_hsv(0, 255, 0);
        assert!((h - 120.0).abs() < 1e-9);

        let (h, _, _) = rgb_to_hsv(0, 0, 255);
        assert!((h - 240.0).abs() < 1e-9);

        let (_, s, v) = rgb_to_hsv(0, 0, 0);
        assert_eq!((s, v), (0.0, 0.0));
    }
}

//! Perceptual image hashing.
//!
//! Hashing is done by `img_hash` using the gradient (difference) algorithm
//! on an 8x8 grid, giving 64 bits per image. Visually identical images hash
//! identically regardless of encoding or resolution, and the Hamming
//! distance between two hashes grows with visual difference.
//!
//! Uploads are decoded with `image`, which carries the format decoders the
//! service accepts, then handed to the hasher as a grayscale buffer.

use crate::comparator::{CompareError, Comparator};
use crate::types::{ComparisonResult, MAX_SCORE};
use async_trait::async_trait;
use img_hash::image as hash_image;
use img_hash::{HashAlg, Hasher, HasherConfig};
use std::fmt;

const HASH_WIDTH: u32 = 8;
const HASH_HEIGHT: u32 = 8;
const HASH_BITS: u32 = HASH_WIDTH * HASH_HEIGHT;

fn hasher() -> Hasher {
    HasherConfig::new()
        .hash_alg(HashAlg::Gradient)
        .hash_size(HASH_WIDTH, HASH_HEIGHT)
        .to_hasher()
}

/// 64-bit gradient hash of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHash(img_hash::ImageHash);

impl ImageHash {
    /// Decode encoded image bytes (PNG, JPEG, ...) and hash them.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CompareError> {
        let img = image::load_from_memory(bytes)?;
        Ok(Self::from_image(&img))
    }

    pub fn from_image(img: &image::DynamicImage) -> Self {
        Self::with_hasher(&hasher(), img)
    }

    fn with_hasher(hasher: &Hasher, img: &image::DynamicImage) -> Self {
        let gray = img.to_luma8();
        let buf = hash_image::ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
            hash_image::Luma([gray.get_pixel(x, y)[0]])
        });
        Self(hasher.hash_image(&hash_image::DynamicImage::ImageLuma8(buf)))
    }

    /// Number of differing bits.
    pub fn distance(&self, other: &ImageHash) -> u32 {
        self.0.dist(&other.0)
    }
}

impl fmt::Display for ImageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.as_bytes() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Compares images by perceptual hash distance.
///
/// With the default `max_distance` of 0 a leg matches only when both hashes
/// are equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerceptualComparator {
    pub max_distance: u32,
}

impl PerceptualComparator {
    pub fn new(max_distance: u32) -> Self {
        Self {
            max_distance: max_distance.min(HASH_BITS),
        }
    }

    /// Turn a hash distance into a comparison result.
    pub fn judge(&self, distance: u32) -> ComparisonResult {
        let distance = distance.min(HASH_BITS);
        let score = MAX_SCORE * (HASH_BITS - distance) as f32 / HASH_BITS as f32;
        ComparisonResult::new(distance <= self.max_distance, Some(score))
    }
}

#[async_trait]
impl Comparator for PerceptualComparator {
    fn name(&self) -> &'static str {
        "phash"
    }

    async fn compare(
        &self,
        reference: &[u8],
        captured: &[u8],
    ) -> Result<ComparisonResult, CompareError> {
        let reference = reference.to_vec();
        let captured = captured.to_vec();

        // Decoding full-size uploads is CPU bound; keep it off the async workers.
        let (a, b) = tokio::task::spawn_blocking(move || {
            let hasher = hasher();
            let reference = image::load_from_memory(&reference)?;
            let captured = image::load_from_memory(&captured)?;
            Ok::<_, CompareError>((
                ImageHash::with_hasher(&hasher, &reference),
                ImageHash::with_hasher(&hasher, &captured),
            ))
        })
        .await??;

        let distance = a.distance(&b);
        tracing::debug!(reference = %a, captured = %b, distance, "perceptual hashes compared");
        Ok(self.judge(distance))
    }
}

use crate::common::Result;
use crate::core::features::ImageFeatures;
use crate::core::photo::validate_image;

/// Scores at or above this are treated as the same person.
pub const SAME_PERSON_THRESHOLD: f64 = 0.6;

const COLOR_WEIGHT: f64 = 0.7;
const BRIGHTNESS_WEIGHT: f64 = 0.2;
const DIMENSION_WEIGHT: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceComparison {
    pub score: f64,
    pub is_match: bool,
}

/// Validates both photos, extracts their features and scores them.
pub fn compare_faces(reference: &str, candidate: &str, threshold: f64) -> Result<FaceComparison> {
    validate_image(reference)?;
    validate_image(candidate)?;

    let reference_features = ImageFeatures::extract(reference)?;
    let candidate_features = ImageFeatures::extract(candidate)?;

    let score = similarity_score(&reference_features, &candidate_features);
    tracing::debug!("Face comparison score {:.4} (threshold {:.2})", score, threshold);

    Ok(FaceComparison {
        score,
        is_match: score >= threshold,
    })
}

/// Weighted blend of colour, brightness and dimension similarity, in [0, 1].
pub fn similarity_score(a: &ImageFeatures, b: &ImageFeatures) -> f64 {
    let similarity_r = histogram_similarity(&a.histogram_r, &b.histogram_r);
    let similarity_g = histogram_similarity(&a.histogram_g, &b.histogram_g);
    let similarity_b = histogram_similarity(&a.histogram_b, &b.histogram_b);
    let color = (similarity_r + similarity_g + similarity_b) / 3.0;

    let brightness = brightness_similarity(a.average_luminance, b.average_luminance);
    let dimensions = dimension_similarity(a, b);

    let score = color * COLOR_WEIGHT + brightness * BRIGHTNESS_WEIGHT + dimensions * DIMENSION_WEIGHT;
    score.clamp(0.0, 1.0)
}

/// Pearson correlation of two histograms mapped from [-1, 1] to [0, 1].
///
/// A flat histogram has no variance, so the correlation is undefined; such
/// channels score 0 rather than NaN.
pub fn histogram_similarity(h1: &[u32], h2: &[u32]) -> f64 {
    if h1.len() != h2.len() || h1.is_empty() {
        return 0.0;
    }

    let n = h1.len() as f64;
    let (mut sum1, mut sum2, mut sum1_sq, mut sum2_sq, mut sum_product) = (0.0, 0.0, 0.0, 0.0, 0.0);

    for (&x, &y) in h1.iter().zip(h2) {
        let v1 = x as f64;
        let v2 = y as f64;
        sum1 += v1;
        sum2 += v2;
        sum1_sq += v1 * v1;
        sum2_sq += v2 * v2;
        sum_product += v1 * v2;
    }

    let numerator = n * sum_product - sum1 * sum2;
    let denominator = ((n * sum1_sq - sum1 * sum1) * (n * sum2_sq - sum2 * sum2)).sqrt();

    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }

    let correlation = (numerator / denominator).clamp(-1.0, 1.0);
    (correlation + 1.0) / 2.0
}

pub fn brightness_similarity(luminance_a: f64, luminance_b: f64) -> f64 {
    (1.0 - (luminance_a - luminance_b).abs() / 255.0).max(0.0)
}

pub fn dimension_similarity(a: &ImageFeatures, b: &ImageFeatures) -> f64 {
    let width_ratio = ratio(a.width, b.width);
    let height_ratio = ratio(a.height, b.height);
    (width_ratio + height_ratio) / 2.0
}

fn ratio(a: u32, b: u32) -> f64 {
    let (small, large) = (a.min(b), a.max(b));
    if large == 0 {
        // Decoded photos always have positive size
        return 0.0;
    }
    small as f64 / large as f64
}

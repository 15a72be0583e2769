//! Vector arithmetic for the flat inner-product index.

/// Normalise a vector to unit length in place.
///
/// Zero vectors are left untouched; they score 0.0 against everything.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Inner product of two equally sized vectors.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Cosine similarity between two vectors of any magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product(a, b) / (magnitude_a * magnitude_b)
}

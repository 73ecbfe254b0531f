//! Angular distance helpers shared by the forest builder and the search engine.
//!
//! Products are accumulated in `f64` so that an item compared with itself
//! yields a cosine of exactly 1.0 and therefore a distance of exactly 0.0.

/// Epsilon below which a squared norm is treated as zero.
const EPSILON: f64 = 1e-20;

/// Dot product of two equally sized vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");

    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum()
}

/// Squared Euclidean norm, computed with the same accumulation as [`dot`].
pub fn squared_norm(a: &[f32]) -> f64 {
    dot(a, a)
}

/// Computes cosine similarity between two vectors.
///
/// # Returns
/// * Cosine similarity in range [-1, 1], 0.0 when either vector is zero
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    cosine_with_norms(a, squared_norm(a), b, squared_norm(b)) as f32
}

/// Angular distance `1 - cos(a, b)`, in `[0, 2]`.
///
/// Zero vectors sit at distance 1.0 from everything, themselves included.
pub fn angular_distance(a: &[f32], b: &[f32]) -> f32 {
    angular_distance_with_norms(a, squared_norm(a), b, squared_norm(b))
}

/// Angular distance when the squared norms are already known.
pub fn angular_distance_with_norms(a: &[f32], norm_sq_a: f64, b: &[f32], norm_sq_b: f64) -> f32 {
    let cosine = cosine_with_norms(a, norm_sq_a, b, norm_sq_b);
    (1.0 - cosine).clamp(0.0, 2.0) as f32
}

fn cosine_with_norms(a: &[f32], norm_sq_a: f64, b: &[f32], norm_sq_b: f64) -> f64 {
    if norm_sq_a < EPSILON || norm_sq_b < EPSILON {
        return 0.0;
    }
    dot(a, b) / (norm_sq_a * norm_sq_b).sqrt()
}

/// Creates a unit-length copy of a vector.
///
/// Vectors with (near) zero norm are returned as all zeros.
pub fn normalize(vector: &[f32]) -> Vec<f32> {
    let norm_sq = squared_norm(vector);
    if norm_sq < EPSILON {
        return vec![0.0; vector.len()];
    }
    let norm = norm_sq.sqrt();
    vector
        .iter()
        .map(|&x| (f64::from(x) / norm) as f32)
        .collect()
}

/// Signed distance of `point` to the hyperplane `normal · x + offset = 0`.
///
/// Positive values lie on the right-hand side of a split.
pub fn margin(normal: &[f32], offset: f32, point: &[f32]) -> f32 {
    (dot(normal, point) + f64::from(offset)) as f32
}

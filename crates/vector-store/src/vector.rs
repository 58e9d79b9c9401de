use ndarray::ArrayView1;

/// Fixed-length embedding of a chunk or a query
pub type EmbeddingVector = Vec<f32>;

/// Euclidean norm of `v`
#[must_use]
pub fn magnitude(v: &[f32]) -> f32 {
    let v = ArrayView1::from(v);
    v.dot(&v).sqrt()
}

/// Scale `v` to unit length in place; zero vectors are left untouched
pub fn normalize(v: &mut [f32]) {
    let norm = magnitude(v);
    if norm > 0.0 && norm.is_finite() {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity `dot(a, b) / (|a| * |b|)`.
///
/// Degenerate inputs score `0.0`: zero-magnitude vectors, mismatched lengths
/// and non-finite results. Callers that must reject mismatched lengths check
/// them before scoring.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let norm_a = magnitude(a);
    let norm_b = magnitude(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let dot = ArrayView1::from(a).dot(&ArrayView1::from(b));
    let similarity = dot / (norm_a * norm_b);
    if similarity.is_finite() {
        similarity.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

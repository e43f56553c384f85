//! Cosine similarity and evidence ranking.

use std::cmp::Ordering;

/// Compute cosine similarity between two vectors.
///
/// Zero-magnitude vectors, mismatched lengths and non-finite results score 0.
/// The result is clamped to `[-1, 1]`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot_product / (norm_a * norm_b);
    if similarity.is_finite() {
        similarity.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Score every vector against the query, highest first.
///
/// The sort is stable, so equal scores keep their original index order.
pub fn rank(query: &[f32], vectors: &[Vec<f32>]) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = vectors
        .iter()
        .enumerate()
        .map(|(index, vector)| (index, cosine_similarity(query, vector)))
        .collect();

    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked
}

/// Keep the `max_items` best entries of a ranking, then drop those under `min_score`.
///
/// An empty result means there is not enough evidence; it is not an error.
pub fn select_top(ranked: &[(usize, f32)], max_items: usize, min_score: f32) -> Vec<(usize, f32)> {
    ranked
        .iter()
        .take(max_items)
        .filter(|(_, score)| *score >= min_score)
        .copied()
        .collect()
}

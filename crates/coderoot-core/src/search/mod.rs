//! Search and ranking
//!
//! Plain vector search is cosine similarity with a threshold; hybrid
//! search fuses vector and BM25 lexical scores with a fixed weighting and
//! a definition bonus.

mod hybrid;

pub use hybrid::sanitize_match_query;

/// Weight of the vector similarity score in hybrid fusion
pub const VECTOR_WEIGHT: f32 = 0.7;
/// Weight of the lexical relevance score in hybrid fusion
pub const LEXICAL_WEIGHT: f32 = 0.3;
/// Flat bonus for chunks spanning a named declaration
pub const DEFINITION_BONUS: f32 = 0.1;

/// Options for plain vector search
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum number of results
    pub top_k: usize,
    /// Minimum similarity (1 - cosine distance) to keep a result
    pub threshold: f32,
    /// Optional filter predicate over document fields
    pub filter: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            threshold: 0.3,
            filter: None,
        }
    }
}

/// Options for hybrid search
#[derive(Debug, Clone)]
pub struct HybridOptions {
    /// Candidate-set size per signal, and the final result cap
    pub limit: usize,
    /// Optional filter predicate over document fields
    pub filter: Option<String>,
}

impl Default for HybridOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            filter: None,
        }
    }
}

/// A ranked search result. Stored vectors are never included.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchResult {
    pub id: String,
    pub content: String,
    pub relative_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub file_extension: String,
    pub is_definition: bool,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub score: f32,
}

/// Cosine similarity between two vectors; zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// The fixed hybrid fusion formula. A candidate missing from either
/// signal contributes 0 for that signal.
pub fn fuse_scores(vector_score: f32, lexical_score: f32, is_definition: bool) -> f32 {
    let bonus = if is_definition { DEFINITION_BONUS } else { 0.0 };
    vector_score * VECTOR_WEIGHT + lexical_score * LEXICAL_WEIGHT + bonus
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_and_mismatched_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_fusion_is_deterministic() {
        let score = fuse_scores(0.8, 0.5, true);
        assert!((score - (0.8 * 0.7 + 0.5 * 0.3 + 0.1)).abs() < 1e-6);
        assert_eq!(score, fuse_scores(0.8, 0.5, true));

        let score = fuse_scores(0.8, 0.0, false);
        assert!((score - 0.56).abs() < 1e-6);
    }
}

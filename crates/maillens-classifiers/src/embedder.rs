//! Embedding backend seam
//!
//! The zero-shot classifier only needs dense vectors; everything about how
//! they are produced (model, device, tokenization) sits behind this trait so
//! tests can substitute a deterministic embedder.

use maillens_core::Result;

/// Produces sentence embeddings for raw text.
pub trait Embedder: Send + Sync {
    /// Embed a single text into a dense vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts. The default implementation loops; backends with
    /// real batch support should override it.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Dimensionality of produced vectors.
    fn dimension(&self) -> usize;

    /// Identity of the underlying model.
    fn name(&self) -> &str;
}

/// Cosine similarity between two vectors.
///
/// Total: zero-norm inputs yield 0.0 instead of NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Element-wise mean of several vectors. Empty input yields an empty vector.
pub fn mean_vector(vectors: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = vectors.first() else {
        return Vec::new();
    };
    let mut mean = vec![0.0f32; first.len()];
    for vector in vectors {
        for (acc, value) in mean.iter_mut().zip(vector.iter()) {
            *acc += value;
        }
    }
    let n = vectors.len() as f32;
    for value in &mut mean {
        *value /= n;
    }
    mean
}

/// Temperature-scaled softmax over raw similarities.
///
/// Returns a distribution summing to 1.0; uniform when the input is empty
/// of signal (all equal values still produce a valid uniform distribution).
pub fn softmax(values: &[f32], temperature: f32) -> Vec<f32> {
    if values.is_empty() {
        return Vec::new();
    }
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = values
        .iter()
        .map(|v| ((v - max) * temperature).exp())
        .collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

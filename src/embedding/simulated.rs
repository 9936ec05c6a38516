//! Simulated embeddings for tests and offline runs
//!
//! Hashes lowercase word tokens into a fixed number of buckets and
//! L2-normalizes the counts. Texts sharing words end up close under cosine
//! similarity, which is enough to exercise retrieval without a model.

use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use rustc_hash::FxHasher;

use super::traits::Embedder;

static WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{L}\p{N}]+").expect("static regex")
});

/// Deterministic feature-hashing embedder
pub struct SimulatedEmbedding {
    dimensions: usize,
}

impl SimulatedEmbedding {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(2),
        }
    }

    /// Embed one text
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        // Last bucket is a constant bias so no vector is ever all zeros
        vector[self.dimensions - 1] = 0.1;

        for word in WORD.find_iter(text) {
            let mut hasher = FxHasher::default();
            word.as_str().to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() % (self.dimensions as u64 - 1)) as usize;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        vector.iter_mut().for_each(|x| *x /= norm);
        vector
    }
}

#[async_trait]
impl Embedder for SimulatedEmbedding {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_documents(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    async fn embed_queries(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

//! BM25 scoring over a small in-memory corpus

use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};

/// BM25 parameters
const K1: f32 = 1.2;
const B: f32 = 0.75;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("valid token regex"));

/// BM25 scorer over a fixed set of passages
pub struct Bm25Scorer {
    /// Term -> number of passages containing it
    doc_freq: FxHashMap<String, usize>,
    num_docs: usize,
    avg_doc_len: f32,
    doc_lengths: Vec<usize>,
    /// Per passage: term -> count
    term_freqs: Vec<FxHashMap<String, usize>>,
}

impl Bm25Scorer {
    pub fn build(passages: &[&str]) -> Self {
        let num_docs = passages.len();
        let mut doc_freq: FxHashMap<String, usize> = FxHashMap::default();
        let mut doc_lengths = Vec::with_capacity(num_docs);
        let mut term_freqs = Vec::with_capacity(num_docs);

        for passage in passages {
            let tokens = tokenize(passage);
            doc_lengths.push(tokens.len());

            let mut tf: FxHashMap<String, usize> = FxHashMap::default();
            for token in tokens {
                *tf.entry(token).or_insert(0) += 1;
            }
            for term in tf.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(tf);
        }

        let total: usize = doc_lengths.iter().sum();
        let avg_doc_len = if num_docs > 0 && total > 0 {
            total as f32 / num_docs as f32
        } else {
            1.0
        };

        Self {
            doc_freq,
            num_docs,
            avg_doc_len,
            doc_lengths,
            term_freqs,
        }
    }

    /// Score of every passage for `query`, in passage order
    pub fn score_query(&self, query: &str) -> Vec<f32> {
        let mut scores = vec![0.0f32; self.num_docs];
        let terms: FxHashSet<String> = tokenize(query).into_iter().collect();

        for term in &terms {
            let df = self.doc_freq.get(term).copied().unwrap_or(0) as f32;
            if df == 0.0 {
                continue;
            }
            let idf = ((self.num_docs as f32 - df + 0.5) / (df + 0.5) + 1.0).ln();

            for (i, tf_map) in self.term_freqs.iter().enumerate() {
                let tf = tf_map.get(term).copied().unwrap_or(0) as f32;
                if tf == 0.0 {
                    continue;
                }
                let norm = 1.0 - B + B * (self.doc_lengths[i] as f32 / self.avg_doc_len);
                scores[i] += idf * (tf * (K1 + 1.0)) / (tf + K1 * norm);
            }
        }

        scores
    }
}

/// Lowercased alphanumeric runs, single characters dropped
pub fn tokenize(text: &str) -> Vec<String> {
    TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|s| s.chars().count() > 1)
        .collect()
}

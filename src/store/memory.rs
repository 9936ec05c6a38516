//! In-memory document store backed by a usearch vector index

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::document::{Document, ScoredDocument};
use crate::embedding::Embedder;
use crate::error::InputError;

use super::filter::MetadataFilter;
use super::{DocumentStore, DuplicatePolicy};

/// Similarity function used for vector search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Similarity {
    #[default]
    Cosine,
    DotProduct,
}

impl Similarity {
    fn metric(self) -> MetricKind {
        match self {
            Similarity::Cosine => MetricKind::Cos,
            Similarity::DotProduct => MetricKind::IP,
        }
    }

    /// Distance in usearch's convention: `1 - similarity`
    fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        match self {
            Similarity::Cosine => {
                let norm = |v: &[f32]| v.iter().map(|x| x * x).sum::<f32>().sqrt();
                let denom = norm(a) * norm(b);
                if denom == 0.0 {
                    1.0
                } else {
                    1.0 - dot / denom
                }
            }
            Similarity::DotProduct => 1.0 - dot,
        }
    }

    /// Map a usearch distance to a score in `[0, 1]`
    fn scale(self, distance: f32) -> f64 {
        // Both metrics report `1 - similarity`
        let similarity = 1.0 - f64::from(distance);
        match self {
            Similarity::Cosine => ((similarity + 1.0) / 2.0).clamp(0.0, 1.0),
            Similarity::DotProduct => 1.0 / (1.0 + (-similarity / 100.0).exp()),
        }
    }
}

/// Filters matching at most this many documents are scored exhaustively
const EXACT_SCAN_LIMIT: usize = 512;

struct VectorIndex {
    index: Index,
    dimensions: usize,
    /// Raw vectors by document position, for exact scoring of small candidate sets
    vectors: Vec<Vec<f32>>,
}

/// Ordered document storage plus an optional vector index over contents.
///
/// Documents keep their insertion position; the vector key of a document is
/// that position. Any write drops the vector index, so embeddings must be
/// recomputed with [`InMemoryDocumentStore::update_embeddings`].
pub struct InMemoryDocumentStore {
    documents: Vec<Document>,
    positions: FxHashMap<String, usize>,
    similarity: Similarity,
    vectors: Option<VectorIndex>,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new(Similarity::default())
    }
}

impl InMemoryDocumentStore {
    pub fn new(similarity: Similarity) -> Self {
        Self {
            documents: Vec::new(),
            positions: FxHashMap::default(),
            similarity,
            vectors: None,
        }
    }

    /// Iterate stored documents in insertion order
    pub fn documents(&self) -> impl Iterator<Item = &Document> + '_ {
        self.documents.iter()
    }

    /// Whether every document currently has an embedding
    pub fn has_embeddings(&self) -> bool {
        self.vectors.is_some()
    }

    /// Embed every stored document and rebuild the vector index.
    ///
    /// `on_batch` is called with the size of each completed batch.
    pub async fn update_embeddings(
        &mut self,
        embedder: &dyn Embedder,
        batch_size: usize,
        mut on_batch: impl FnMut(usize),
    ) -> anyhow::Result<()> {
        let batch_size = batch_size.max(1);
        let expected = embedder.dimensions();
        let mut vectors: Option<VectorIndex> = None;

        info!(
            "Updating embeddings for {} documents (batch size {})",
            self.documents.len(),
            batch_size
        );

        for (batch_no, batch) in self.documents.chunks(batch_size).enumerate() {
            let texts: Vec<&str> = batch.iter().map(|d| d.content.as_str()).collect();
            let embeddings = embedder.embed_documents(&texts).await?;

            if embeddings.len() != batch.len() {
                anyhow::bail!(
                    "Embedder returned {} vectors for {} documents",
                    embeddings.len(),
                    batch.len()
                );
            }

            for (offset, embedding) in embeddings.iter().enumerate() {
                if vectors.is_none() {
                    if expected != 0 && embedding.len() != expected {
                        anyhow::bail!(
                            "Embedding dimension mismatch: expected {}, got {}",
                            expected,
                            embedding.len()
                        );
                    }
                    vectors = Some(self.new_index(embedding.len())?);
                }
                let Some(vi) = vectors.as_ref() else {
                    continue;
                };
                if embedding.len() != vi.dimensions {
                    anyhow::bail!(
                        "Embedding dimension mismatch: expected {}, got {}",
                        vi.dimensions,
                        embedding.len()
                    );
                }
                let key = (batch_no * batch_size + offset) as u64;
                vi.index.add(key, embedding)?;
            }
            if let Some(vi) = vectors.as_mut() {
                vi.vectors.extend(embeddings);
            }

            on_batch(batch.len());
        }

        if let Some(vi) = &vectors {
            info!("Vector index holds {} embeddings ({} dims)", vi.index.size(), vi.dimensions);
        }
        self.vectors = vectors;
        Ok(())
    }

    fn new_index(&self, dimensions: usize) -> anyhow::Result<VectorIndex> {
        let options = IndexOptions {
            dimensions,
            metric: self.similarity.metric(),
            quantization: ScalarKind::F32,
            connectivity: 16,
            expansion_add: 128,
            expansion_search: 64,
            multi: false,
        };

        let index = Index::new(&options)?;
        index.reserve(self.documents.len())?;
        Ok(VectorIndex {
            index,
            dimensions,
            vectors: Vec::with_capacity(self.documents.len()),
        })
    }

    /// Rank documents matching `filters` by similarity to `query`
    pub fn query_by_embedding(
        &self,
        query: &[f32],
        filters: Option<&MetadataFilter>,
        top_k: usize,
    ) -> anyhow::Result<Vec<ScoredDocument>> {
        let vi = self.vectors.as_ref().ok_or_else(|| {
            anyhow::anyhow!("Documents have no embeddings; run update_embeddings after writing")
        })?;

        if query.len() != vi.dimensions {
            anyhow::bail!(
                "Query dimension mismatch: expected {}, got {}",
                vi.dimensions,
                query.len()
            );
        }

        let count = top_k.min(self.documents.len());
        if count == 0 {
            return Ok(Vec::new());
        }

        let hits: Vec<(usize, f32)> = match filters {
            Some(filter) => {
                let candidates: Vec<usize> = self
                    .documents
                    .iter()
                    .enumerate()
                    .filter(|(_, doc)| filter.matches(&doc.meta))
                    .map(|(pos, _)| pos)
                    .collect();

                if candidates.len() <= EXACT_SCAN_LIMIT {
                    self.exact_scan(vi, query, &candidates, count)
                } else {
                    let matches = vi.index.filtered_search(query, count, |key: u64| {
                        self.documents
                            .get(key as usize)
                            .is_some_and(|doc| filter.matches(&doc.meta))
                    })?;
                    ranked(matches.keys, matches.distances)
                }
            }
            None => {
                let matches = vi.index.search(query, count)?;
                ranked(matches.keys, matches.distances)
            }
        };

        let results: Vec<ScoredDocument> = hits
            .into_iter()
            .filter_map(|(pos, distance)| {
                self.documents.get(pos).map(|doc| ScoredDocument {
                    document: doc.clone(),
                    score: self.similarity.scale(distance),
                })
            })
            .collect();

        debug!("Vector query returned {} of {} requested", results.len(), count);
        Ok(results)
    }

    /// Score `candidates` against `query` directly, closest first
    fn exact_scan(
        &self,
        vi: &VectorIndex,
        query: &[f32],
        candidates: &[usize],
        count: usize,
    ) -> Vec<(usize, f32)> {
        let mut hits: Vec<(usize, f32)> = candidates
            .iter()
            .filter_map(|&pos| {
                vi.vectors
                    .get(pos)
                    .map(|v| (pos, self.similarity.distance(query, v)))
            })
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits.truncate(count);
        hits
    }
}

fn ranked(keys: Vec<u64>, distances: Vec<f32>) -> Vec<(usize, f32)> {
    keys.into_iter().map(|k| k as usize).zip(distances).collect()
}

impl DocumentStore for InMemoryDocumentStore {
    fn write_documents(
        &mut self,
        documents: Vec<Document>,
        policy: DuplicatePolicy,
    ) -> anyhow::Result<usize> {
        let mut written = 0;

        for doc in documents {
            match self.positions.get(&doc.id) {
                Some(&pos) => match policy {
                    DuplicatePolicy::Overwrite => {
                        self.documents[pos] = doc;
                        written += 1;
                    }
                    DuplicatePolicy::Skip => {
                        debug!("Skipping duplicate document {}", doc.id);
                    }
                    DuplicatePolicy::Fail => {
                        return Err(InputError::DuplicateDocument(doc.id).into());
                    }
                },
                None => {
                    self.positions.insert(doc.id.clone(), self.documents.len());
                    self.documents.push(doc);
                    written += 1;
                }
            }
        }

        if written > 0 && self.vectors.take().is_some() {
            warn!("Stored embeddings invalidated by write; call update_embeddings again");
        }

        Ok(written)
    }

    fn document_count(&self) -> usize {
        self.documents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::SimulatedEmbedding;
    use serde_json::{json, Map, Value};

    fn doc(content: &str, index: u64) -> Document {
        let mut meta = Map::new();
        meta.insert("index".into(), json!(index));
        Document::new(content.into(), meta, &["content".to_string()]).unwrap()
    }

    #[test]
    fn test_write_keeps_order_and_overwrites_in_place() {
        let mut store = InMemoryDocumentStore::default();
        store
            .write_documents(vec![doc("a", 0), doc("b", 1)], DuplicatePolicy::Overwrite)
            .unwrap();
        let written = store
            .write_documents(vec![doc("a", 5)], DuplicatePolicy::Overwrite)
            .unwrap();

        assert_eq!(written, 1);
        assert_eq!(store.document_count(), 2);
        let indexes: Vec<_> = store.documents().map(|d| d.index()).collect();
        assert_eq!(indexes, vec![Some(5), Some(1)]);
    }

    #[test]
    fn test_skip_and_fail_policies() {
        let mut store = InMemoryDocumentStore::default();
        store.write_documents(vec![doc("a", 0)], DuplicatePolicy::Skip).unwrap();
        let written = store.write_documents(vec![doc("a", 9)], DuplicatePolicy::Skip).unwrap();
        assert_eq!(written, 0);
        assert_eq!(store.documents().next().unwrap().index(), Some(0));

        let err = store
            .write_documents(vec![doc("a", 1)], DuplicatePolicy::Fail)
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_query_requires_embeddings() {
        let mut store = InMemoryDocumentStore::default();
        store.write_documents(vec![doc("a", 0)], DuplicatePolicy::Overwrite).unwrap();
        assert!(store.query_by_embedding(&[0.0; 8], None, 1).is_err());
    }

    #[tokio::test]
    async fn test_filtered_query_scopes_to_one_document() {
        let embedder = SimulatedEmbedding::new(64);
        let mut store = InMemoryDocumentStore::default();
        store
            .write_documents(
                vec![
                    doc("the animation is stunning", 0),
                    doc("the plot drags in the middle", 1),
                    doc("stunning animation, weak plot", 2),
                ],
                DuplicatePolicy::Overwrite,
            )
            .unwrap();

        let mut seen = 0;
        store.update_embeddings(&embedder, 2, |n| seen += n).await.unwrap();
        assert_eq!(seen, 3);
        assert!(store.has_embeddings());

        let query = embedder.embed_queries(&["stunning animation"]).await.unwrap();
        let filter = MetadataFilter::eq("index", Value::from(1));
        let hits = store.query_by_embedding(&query[0], Some(&filter), 10).unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.index(), Some(1));
        assert!((0.0..=1.0).contains(&hits[0].score));
    }

    #[tokio::test]
    async fn test_unfiltered_query_ranks_closest_first() {
        let embedder = SimulatedEmbedding::new(64);
        let mut store = InMemoryDocumentStore::default();
        store
            .write_documents(
                vec![doc("slice of life comedy", 0), doc("mecha battles in space", 1)],
                DuplicatePolicy::Overwrite,
            )
            .unwrap();
        store.update_embeddings(&embedder, 8, |_| {}).await.unwrap();

        let query = embedder.embed_queries(&["mecha space battles"]).await.unwrap();
        let hits = store.query_by_embedding(&query[0], None, 2).unwrap();
        assert_eq!(hits[0].document.index(), Some(1));
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_write_after_embedding_invalidates_index() {
        let embedder = SimulatedEmbedding::new(32);
        let mut store = InMemoryDocumentStore::default();
        store
            .write_documents(vec![doc("great soundtrack", 0)], DuplicatePolicy::Overwrite)
            .unwrap();
        store.update_embeddings(&embedder, 4, |_| {}).await.unwrap();
        let query = embedder.embed_queries(&["soundtrack"]).await.unwrap();

        // A duplicate skipped under Skip changes nothing
        let written = store
            .write_documents(vec![doc("great soundtrack", 7)], DuplicatePolicy::Skip)
            .unwrap();
        assert_eq!(written, 0);
        assert!(store.has_embeddings());
        assert_eq!(store.query_by_embedding(&query[0], None, 1).unwrap().len(), 1);

        store
            .write_documents(vec![doc("slow pacing", 1)], DuplicatePolicy::Overwrite)
            .unwrap();
        assert!(!store.has_embeddings());
        assert!(store.query_by_embedding(&query[0], None, 1).is_err());

        store.update_embeddings(&embedder, 4, |_| {}).await.unwrap();
        assert_eq!(store.query_by_embedding(&query[0], None, 2).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_dot_product_store_scores() {
        let embedder = SimulatedEmbedding::new(64);
        let mut store = InMemoryDocumentStore::new(Similarity::DotProduct);
        store
            .write_documents(
                vec![doc("slice of life comedy", 0), doc("mecha battles in space", 1)],
                DuplicatePolicy::Overwrite,
            )
            .unwrap();
        store.update_embeddings(&embedder, 8, |_| {}).await.unwrap();

        let query = embedder.embed_queries(&["mecha space battles"]).await.unwrap();
        let filter = MetadataFilter::eq("index", Value::from(1));
        let hits = store.query_by_embedding(&query[0], Some(&filter), 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.index(), Some(1));
        assert!(hits[0].score > 0.5 && hits[0].score < 1.0);
    }

    #[test]
    fn test_dot_product_scale_is_sigmoid() {
        let sim = Similarity::DotProduct;
        let orthogonal = sim.distance(&[1.0, 0.0], &[0.0, 1.0]);
        assert!((orthogonal - 1.0).abs() < 1e-6);
        assert!((sim.scale(orthogonal) - 0.5).abs() < 1e-9);

        let aligned = sim.scale(sim.distance(&[3.0, 4.0], &[3.0, 4.0]));
        let opposed = sim.scale(sim.distance(&[3.0, 4.0], &[-3.0, -4.0]));
        assert!(aligned > 0.5 && aligned < 1.0);
        assert!((aligned + opposed - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_matches_score_scale() {
        let sim = Similarity::Cosine;
        let same = sim.distance(&[1.0, 0.0], &[2.0, 0.0]);
        let opposite = sim.distance(&[1.0, 0.0], &[-1.0, 0.0]);
        assert!((sim.scale(same) - 1.0).abs() < 1e-6);
        assert!(sim.scale(opposite).abs() < 1e-6);
    }
}

//! Retrievers - rank stored documents for a query

use async_trait::async_trait;
use tracing::debug;

use crate::document::ScoredDocument;
use crate::embedding::Embedder;
use crate::store::{InMemoryDocumentStore, MetadataFilter};

/// Default number of documents returned per query
pub const DEFAULT_TOP_K: usize = 10;

/// Query-side view of a document store
#[async_trait(?Send)]
pub trait Retriever {
    /// Most similar documents first
    async fn retrieve(
        &self,
        query: &str,
        filters: Option<&MetadataFilter>,
        top_k: Option<usize>,
    ) -> anyhow::Result<Vec<ScoredDocument>>;

    /// One ranked list per query, in query order
    async fn retrieve_batch(
        &self,
        queries: &[String],
        filters: Option<&MetadataFilter>,
        top_k: Option<usize>,
    ) -> anyhow::Result<Vec<Vec<ScoredDocument>>>;
}

/// Embeds queries and delegates ranking to the store's vector index
pub struct EmbeddingRetriever<'a> {
    store: &'a InMemoryDocumentStore,
    embedder: &'a dyn Embedder,
    top_k: usize,
}

impl<'a> EmbeddingRetriever<'a> {
    pub fn new(store: &'a InMemoryDocumentStore, embedder: &'a dyn Embedder, top_k: usize) -> Self {
        Self {
            store,
            embedder,
            top_k,
        }
    }
}

#[async_trait(?Send)]
impl Retriever for EmbeddingRetriever<'_> {
    async fn retrieve(
        &self,
        query: &str,
        filters: Option<&MetadataFilter>,
        top_k: Option<usize>,
    ) -> anyhow::Result<Vec<ScoredDocument>> {
        let mut batch = self.retrieve_batch(&[query.to_string()], filters, top_k).await?;
        Ok(batch.pop().unwrap_or_default())
    }

    async fn retrieve_batch(
        &self,
        queries: &[String],
        filters: Option<&MetadataFilter>,
        top_k: Option<usize>,
    ) -> anyhow::Result<Vec<Vec<ScoredDocument>>> {
        if queries.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = queries.iter().map(String::as_str).collect();
        let embeddings = self.embedder.embed_queries(&texts).await?;
        if embeddings.len() != queries.len() {
            anyhow::bail!(
                "Embedder returned {} vectors for {} queries",
                embeddings.len(),
                queries.len()
            );
        }

        let top_k = top_k.unwrap_or(self.top_k);
        let mut results = Vec::with_capacity(queries.len());
        for embedding in &embeddings {
            results.push(self.store.query_by_embedding(embedding, filters, top_k)?);
        }

        debug!(
            "Retrieved {:?} documents for {} queries",
            results.iter().map(Vec::len).collect::<Vec<_>>(),
            queries.len()
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::embedding::SimulatedEmbedding;
    use crate::store::{DocumentStore, DuplicatePolicy};
    use serde_json::{json, Map};

    async fn store_with(texts: &[&str], embedder: &SimulatedEmbedding) -> InMemoryDocumentStore {
        let docs = texts
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let mut meta = Map::new();
                meta.insert("index".into(), json!(i));
                Document::new(t.to_string(), meta, &["content".to_string()]).unwrap()
            })
            .collect();
        let mut store = InMemoryDocumentStore::default();
        store.write_documents(docs, DuplicatePolicy::Overwrite).unwrap();
        store.update_embeddings(embedder, 16, |_| {}).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_batch_aligned_with_queries() {
        let embedder = SimulatedEmbedding::new(64);
        let store = store_with(&["great opening song", "boring villain", "great villain"], &embedder).await;
        let retriever = EmbeddingRetriever::new(&store, &embedder, DEFAULT_TOP_K);

        let queries = vec!["opening song".to_string(), "villain".to_string()];
        let results = retriever.retrieve_batch(&queries, None, Some(2)).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.len() == 2));
    }

    #[tokio::test]
    async fn test_filter_limits_to_one_document() {
        let embedder = SimulatedEmbedding::new(64);
        let store = store_with(&["a", "b", "c", "d"], &embedder).await;
        let retriever = EmbeddingRetriever::new(&store, &embedder, DEFAULT_TOP_K);

        let filter = MetadataFilter::parse(&json!({"index": {"$eq": 2}})).unwrap();
        let hits = retriever.retrieve("anything", Some(&filter), None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.content, "c");
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let embedder = SimulatedEmbedding::new(8);
        let store = store_with(&["a"], &embedder).await;
        let retriever = EmbeddingRetriever::new(&store, &embedder, 1);
        assert!(retriever.retrieve_batch(&[], None, None).await.unwrap().is_empty());
    }
}

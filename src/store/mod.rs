//! Document store - ordered in-memory storage with vector similarity search

mod filter;
mod memory;

pub use filter::{FilterCondition, FilterOp, MetadataFilter};
pub use memory::{InMemoryDocumentStore, Similarity};

use serde::{Deserialize, Serialize};

use crate::document::Document;

/// What to do when a written document id already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Replace the stored document, keeping its position
    #[default]
    Overwrite,
    /// Keep the stored document
    Skip,
    /// Abort the write
    Fail,
}

/// Write side of a document store, as seen by indexing pipelines
pub trait DocumentStore {
    /// Insert documents, returning how many were newly added or replaced
    fn write_documents(
        &mut self,
        documents: Vec<Document>,
        policy: DuplicatePolicy,
    ) -> anyhow::Result<usize>;

    /// Number of stored documents
    fn document_count(&self) -> usize;
}

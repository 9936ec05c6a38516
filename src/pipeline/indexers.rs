//! Indexing pipelines: CSV files (or zipped CSVs) into a document store

use std::path::PathBuf;

use serde_json::Value;

use super::{Pipeline, PipelineOutput, ROOT};
use crate::nodes::{Converter, DataFramer, DocumentWriter, Node, ZipDataFramer, ZipLister};
use crate::store::{DocumentStore, DuplicatePolicy};

/// Settings shared by both indexers
#[derive(Debug, Clone)]
pub struct IndexerOptions {
    pub id_hash_keys: Vec<String>,
    pub duplicate_documents: DuplicatePolicy,
}

impl Default for IndexerOptions {
    fn default() -> Self {
        Self {
            id_hash_keys: vec!["content".to_string()],
            duplicate_documents: DuplicatePolicy::default(),
        }
    }
}

/// DataFramer → converter → DocumentStore
pub struct ReviewIndexer<'a> {
    pipeline: Pipeline<'a>,
}

impl<'a> ReviewIndexer<'a> {
    pub fn new(
        store: &'a mut dyn DocumentStore,
        converter: Converter,
        options: IndexerOptions,
    ) -> anyhow::Result<Self> {
        let converter_name = converter.component();
        let mut pipeline = Pipeline::new();
        pipeline.add_node(DataFramer::new(options.id_hash_keys)?, "DataFramer", &[ROOT])?;
        pipeline.add_node(converter, converter_name, &["DataFramer"])?;
        pipeline.add_node(
            DocumentWriter::new(store, options.duplicate_documents),
            "DocumentStore",
            &[converter_name],
        )?;
        Ok(Self { pipeline })
    }

    /// Index `file_paths`; `params` is keyed by node name
    pub fn run(
        &mut self,
        file_paths: Vec<PathBuf>,
        params: &Value,
        debug: bool,
    ) -> anyhow::Result<PipelineOutput> {
        self.pipeline.run(file_paths, params, debug)
    }
}

/// ZipLister → ZipDataFramer → converter → DocumentStore
pub struct ZippedReviewIndexer<'a> {
    pipeline: Pipeline<'a>,
}

impl<'a> ZippedReviewIndexer<'a> {
    pub fn new(
        lister: ZipLister,
        store: &'a mut dyn DocumentStore,
        converter: Converter,
        options: IndexerOptions,
    ) -> anyhow::Result<Self> {
        let converter_name = converter.component();
        let mut pipeline = Pipeline::new();
        pipeline.add_node(lister, "ZipLister", &[ROOT])?;
        pipeline.add_node(
            ZipDataFramer::new(options.id_hash_keys)?,
            "ZipDataFramer",
            &["ZipLister"],
        )?;
        pipeline.add_node(converter, converter_name, &["ZipDataFramer"])?;
        pipeline.add_node(
            DocumentWriter::new(store, options.duplicate_documents),
            "DocumentStore",
            &[converter_name],
        )?;
        Ok(Self { pipeline })
    }

    /// Index the archives in `file_paths`
    pub fn run(
        &mut self,
        file_paths: Vec<PathBuf>,
        params: &Value,
        debug: bool,
    ) -> anyhow::Result<PipelineOutput> {
        self.pipeline.run(file_paths, params, debug)
    }
}

//! Extractive question answering: retriever then reader

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::document::{Answer, ScoredDocument};
use crate::nodes::node_params;
use crate::reader::Reader;
use crate::retriever::Retriever;
use crate::store::MetadataFilter;

const RETRIEVER: &str = "Retriever";
const READER: &str = "Reader";

/// Default answers kept per query
pub const DEFAULT_READER_TOP_K: usize = 1;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RetrieverParams {
    filters: Option<MetadataFilter>,
    top_k: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReaderParams {
    top_k: Option<usize>,
}

/// Answers for one query
#[derive(Debug, Clone)]
pub struct QaResult {
    pub query: String,
    pub documents: Vec<ScoredDocument>,
    pub answers: Vec<Answer>,
}

/// Answers for several queries, aligned with `queries`
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub queries: Vec<String>,
    pub answers: Vec<Vec<Answer>>,
}

/// Retriever → Reader
pub struct ExtractiveQaPipeline<'a> {
    retriever: &'a dyn Retriever,
    reader: &'a dyn Reader,
    reader_top_k: usize,
}

impl<'a> ExtractiveQaPipeline<'a> {
    pub fn new(retriever: &'a dyn Retriever, reader: &'a dyn Reader) -> Self {
        Self {
            retriever,
            reader,
            reader_top_k: DEFAULT_READER_TOP_K,
        }
    }

    /// Change the default number of answers per query
    pub fn with_reader_top_k(mut self, top_k: usize) -> Self {
        self.reader_top_k = top_k.max(1);
        self
    }

    /// Answer one query. `params` is `null` or `{"Retriever": {...}, "Reader": {...}}`.
    pub async fn run(&self, query: &str, params: &Value) -> anyhow::Result<QaResult> {
        let (retriever, reader) = split_params(params)?;
        let documents = self
            .retriever
            .retrieve(query, retriever.filters.as_ref(), retriever.top_k)
            .await?;
        let answers = self
            .reader
            .predict(query, &documents, reader.top_k.unwrap_or(self.reader_top_k))
            .await?;

        Ok(QaResult {
            query: query.to_string(),
            documents,
            answers,
        })
    }

    /// Answer several queries with the same parameters
    pub async fn run_batch(&self, queries: &[String], params: &Value) -> anyhow::Result<BatchResult> {
        let (retriever, reader) = split_params(params)?;
        let top_k = reader.top_k.unwrap_or(self.reader_top_k);

        let documents = self
            .retriever
            .retrieve_batch(queries, retriever.filters.as_ref(), retriever.top_k)
            .await?;

        let mut answers = Vec::with_capacity(queries.len());
        for (query, docs) in queries.iter().zip(&documents) {
            answers.push(self.reader.predict(query, docs, top_k).await?);
        }
        debug!("Answered {} queries", queries.len());

        Ok(BatchResult {
            queries: queries.to_vec(),
            answers,
        })
    }
}

fn split_params(params: &Value) -> anyhow::Result<(RetrieverParams, ReaderParams)> {
    match params {
        Value::Null => return Ok(Default::default()),
        Value::Object(map) => {
            if let Some(unknown) = map.keys().find(|k| *k != RETRIEVER && *k != READER) {
                anyhow::bail!("Unknown node '{}' in params (nodes: Retriever, Reader)", unknown);
            }
        }
        other => anyhow::bail!("Pipeline params must be an object, got {}", other),
    }

    let field = |name: &str| params.get(name).cloned().unwrap_or(Value::Null);
    Ok((
        node_params(&field(RETRIEVER), RETRIEVER)?,
        node_params(&field(READER), READER)?,
    ))
}

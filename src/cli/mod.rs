//! CLI module - argument parsing and the end-to-end run

mod extract;

use std::path::PathBuf;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{json, Value};
use tracing::info;

use crate::config::{Config, LlmBackend, ReaderKind};
use crate::embedding::{EmbeddingMode, EmbeddingProvider};
use crate::error::UsageError;
use crate::nodes::{Converter, DataFrameConverter, Node, SeriesConverter, ZipLister};
use crate::pipeline::{ExtractiveQaPipeline, IndexerOptions, ReviewIndexer, ZippedReviewIndexer};
use crate::report::write_report;
use crate::retriever::EmbeddingRetriever;
use crate::store::{DocumentStore, InMemoryDocumentStore};

/// review-qa - Extracts metadata and query answers from CSV documents
#[derive(Parser, Debug)]
#[command(name = "review-qa")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Name of column to regard as documents for query purposes
    pub document_column: String,

    /// File(s) to extract preprocessed documents from (member names with --zip-path)
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Path to zip containing CSV files, if compressed
    #[arg(short = 'z', long)]
    pub zip_path: Option<PathBuf>,

    /// Name of metadata column to extract (usable multiple times)
    #[arg(short = 'm', long = "metadata-column")]
    pub metadata_columns: Vec<String>,

    /// Query to extract answers for per document (usable multiple times)
    #[arg(short = 'q', long = "query")]
    pub queries: Vec<String>,

    /// Do not use the GPU for model inference
    #[arg(long)]
    pub no_gpu: bool,

    /// Name of output CSV file to write
    #[arg(long, default_value = "output.csv")]
    pub output: PathBuf,

    /// Enable pipeline debugging output
    #[arg(long)]
    pub debug: bool,

    /// Configuration file (default: ~/.config/review-qa/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Embedding mode
    #[cfg(feature = "local-embeddings")]
    #[arg(long, value_parser = ["ollama", "openai", "simulated", "local"])]
    pub embedding_mode: Option<String>,

    /// Embedding mode
    #[cfg(not(feature = "local-embeddings"))]
    #[arg(long, value_parser = ["ollama", "openai", "simulated"])]
    pub embedding_mode: Option<String>,

    /// Embedding model name
    #[arg(long)]
    pub embedding_model: Option<String>,

    /// Ollama host for embeddings
    #[arg(long, env = "OLLAMA_HOST")]
    pub embedding_host: Option<String>,

    /// OpenAI API base URL
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub embedding_api_base: Option<String>,

    /// API key for the embedding service (OpenAI)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub embedding_api_key: Option<String>,

    /// Local model directory (for local embedding mode)
    #[cfg(feature = "local-embeddings")]
    #[arg(long)]
    pub embedding_model_path: Option<String>,

    /// Reader used to extract answers
    #[arg(long, value_parser = ["lexical", "llm"])]
    pub reader: Option<String>,

    /// LLM backend for the llm reader
    #[arg(long, value_parser = ["ollama", "openai"])]
    pub llm: Option<String>,

    /// Model name for the llm reader
    #[arg(long)]
    pub reader_model: Option<String>,

    /// Documents retrieved per query
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Records written per chunk of the output file
    #[arg(long)]
    pub chunk_size: Option<usize>,
}

impl Cli {
    /// Reject invocations with nothing to do, before any I/O
    pub fn validate(&self) -> Result<(), UsageError> {
        if self.metadata_columns.is_empty() && self.queries.is_empty() {
            return Err(UsageError::NothingToExtract);
        }
        if self.chunk_size == Some(0) {
            return Err(UsageError::ZeroChunkSize);
        }
        if self.top_k == Some(0) {
            return Err(UsageError::ZeroTopK("retriever"));
        }
        Ok(())
    }

    /// Load the config file and apply command-line overrides
    pub fn settings(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        let emb = &mut config.embedding;
        if let Some(mode) = &self.embedding_mode {
            emb.provider = mode.clone();
        }
        if let Some(model) = &self.embedding_model {
            emb.model = model.clone();
        }
        if self.embedding_host.is_some() {
            emb.host = self.embedding_host.clone();
        }
        if self.embedding_api_base.is_some() {
            emb.base_url = self.embedding_api_base.clone();
        }
        if self.embedding_api_key.is_some() {
            emb.api_key = self.embedding_api_key.clone();
        }

        if let Some(reader) = &self.reader {
            config.reader.kind = match reader.as_str() {
                "llm" => ReaderKind::Llm,
                _ => ReaderKind::Lexical,
            };
        }
        if let Some(llm) = &self.llm {
            config.reader.llm = match llm.as_str() {
                "openai" => LlmBackend::OpenAI,
                _ => LlmBackend::Ollama,
            };
        }
        if let Some(model) = &self.reader_model {
            config.reader.model = model.clone();
        }
        if let Some(top_k) = self.top_k {
            config.retriever.top_k = top_k;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.report.chunk_size = chunk_size;
        }

        if config.retriever.top_k == 0 {
            return Err(UsageError::ZeroTopK("retriever").into());
        }
        if config.reader.top_k == 0 {
            return Err(UsageError::ZeroTopK("reader").into());
        }
        Ok(config)
    }

    fn embedding_mode(&self, config: &Config) -> anyhow::Result<EmbeddingMode> {
        let emb = &config.embedding;
        Ok(match emb.provider.as_str() {
            "openai" => EmbeddingMode::OpenAI {
                api_key: emb.api_key.clone(),
                base_url: emb.base_url.clone(),
            },
            "ollama" => EmbeddingMode::Ollama {
                host: emb.host.clone(),
            },
            "simulated" => EmbeddingMode::Simulated,
            #[cfg(feature = "local-embeddings")]
            "local" => EmbeddingMode::Local {
                model_path: self.embedding_model_path.clone(),
            },
            other => anyhow::bail!(
                "Unknown embedding mode: {} (expected one of: {})",
                other,
                EmbeddingMode::names().join(", ")
            ),
        })
    }

    fn converter(&self) -> Converter {
        if self.metadata_columns.is_empty() {
            SeriesConverter::new(self.document_column.clone()).into()
        } else {
            DataFrameConverter::new(self.document_column.clone(), self.metadata_columns.clone())
                .into()
        }
    }

    /// Converter parameters for this invocation, keyed by node name
    fn converter_params(&self, converter: &Converter) -> (String, Value) {
        let params = match converter {
            Converter::DataFrame(_) => json!({
                "document_column": self.document_column,
                "meta_columns": self.metadata_columns,
            }),
            Converter::Series(_) => json!({ "column": self.document_column }),
        };
        (converter.component().to_string(), params)
    }

    /// Index, embed, extract and write the report
    pub async fn run(self) -> anyhow::Result<()> {
        self.validate()?;
        let config = self.settings()?;
        let use_gpu = !self.no_gpu;

        let mut store = InMemoryDocumentStore::new(config.index.similarity);
        self.index(&mut store, &config)?;

        if store.document_count() == 0 {
            anyhow::bail!("No documents were indexed; nothing to write to {:?}", self.output);
        }

        let embedder =
            EmbeddingProvider::new(config.embedding.model.clone(), self.embedding_mode(&config)?, use_gpu)
                .await?;

        let progress = ProgressBar::new(store.document_count() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
                .progress_chars("#>-"),
        );
        progress.set_message("Computing embeddings...");
        store
            .update_embeddings(&embedder, config.embedding.batch_size, |n| {
                progress.inc(n as u64)
            })
            .await?;
        progress.finish_and_clear();

        let reader = extract::build_reader(&config.reader, use_gpu)?;
        let retriever = EmbeddingRetriever::new(&store, &embedder, config.retriever.top_k);
        let qa = ExtractiveQaPipeline::new(&retriever, &reader).with_reader_top_k(config.reader.top_k);

        let records = extract::collect_records(&store, &qa, &self.queries).await?;

        let summary = write_report(
            &self.output,
            &records,
            config.report.chunk_size,
            config.report.header,
        )?;
        info!(
            "Extracted {} columns for {} documents into {:?}",
            summary.header.len(),
            summary.rows,
            self.output
        );
        Ok(())
    }

    fn index(&self, store: &mut InMemoryDocumentStore, config: &Config) -> anyhow::Result<()> {
        let converter = self.converter();
        let (converter_name, converter_params) = self.converter_params(&converter);
        let options = IndexerOptions {
            id_hash_keys: config.index.id_hash_keys.clone(),
            duplicate_documents: config.index.duplicate_documents,
        };

        let output = match &self.zip_path {
            Some(zip_path) => {
                let mut params = serde_json::Map::new();
                params.insert("ZipLister".into(), json!({ "valid_names": self.files }));
                params.insert(converter_name, converter_params);

                let mut indexer =
                    ZippedReviewIndexer::new(ZipLister::default(), store, converter, options)?;
                indexer.run(vec![zip_path.clone()], &Value::Object(params), self.debug)?
            }
            None => {
                let mut params = serde_json::Map::new();
                params.insert(converter_name, converter_params);

                let files = self.files.iter().map(PathBuf::from).collect();
                let mut indexer = ReviewIndexer::new(store, converter, options)?;
                indexer.run(files, &Value::Object(params), self.debug)?
            }
        };

        if let Some(trace) = output.debug {
            info!("Indexing pipeline trace:\n{}", serde_json::to_string_pretty(&trace)?);
        }
        Ok(())
    }
}

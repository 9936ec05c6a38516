//! Configuration file support for review-qa
//!
//! Config file location: ~/.config/review-qa/config.toml (or `--config`)
//!
//! Example config:
//! ```toml
//! [embedding]
//! provider = "ollama"  # ollama, openai, simulated, local
//! model = "all-minilm"
//! # host = "http://localhost:11434"
//! # base_url = "http://localhost:1234/v1"
//! # batch_size = 64
//!
//! [retriever]
//! top_k = 10
//!
//! [reader]
//! kind = "lexical"  # lexical, llm
//! llm = "ollama"    # ollama, openai
//! model = "llama3.2"
//! top_k = 1
//! context_window = 150
//!
//! [index]
//! id_hash_keys = ["content"]
//! duplicate_documents = "overwrite"  # overwrite, skip, fail
//! similarity = "cosine"  # cosine, dot_product
//!
//! [report]
//! chunk_size = 256
//! header = "union"  # union, strict
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::reader::DEFAULT_CONTEXT_WINDOW;
use crate::report::{HeaderPolicy, DEFAULT_CHUNK_SIZE};
use crate::retriever::DEFAULT_TOP_K;
use crate::store::{DuplicatePolicy, Similarity};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub embedding: EmbeddingConfig,
    pub retriever: RetrieverConfig,
    pub reader: ReaderConfig,
    pub index: IndexConfig,
    pub report: ReportConfig,
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// ollama, openai, simulated or local
    pub provider: String,
    pub model: String,
    /// Ollama host
    pub host: Option<String>,
    /// Base URL for OpenAI-compatible APIs
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Documents per embedding request
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "all-minilm".to_string(),
            host: None,
            base_url: None,
            api_key: None,
            batch_size: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    pub top_k: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self { top_k: DEFAULT_TOP_K }
    }
}

/// Which reader answers queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaderKind {
    #[default]
    Lexical,
    Llm,
}

/// LLM backend for the LLM reader
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    #[default]
    Ollama,
    OpenAI,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub kind: ReaderKind,
    pub llm: LlmBackend,
    pub model: String,
    pub host: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Answers kept per query
    pub top_k: usize,
    /// Characters of context around each answer
    pub context_window: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            kind: ReaderKind::default(),
            llm: LlmBackend::default(),
            model: "llama3.2".to_string(),
            host: None,
            base_url: None,
            api_key: None,
            top_k: 1,
            context_window: DEFAULT_CONTEXT_WINDOW,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Attributes hashed into document ids: "content" and/or "meta"
    pub id_hash_keys: Vec<String>,
    pub duplicate_documents: DuplicatePolicy,
    /// Vector similarity used for retrieval and scores
    pub similarity: Similarity,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            id_hash_keys: vec!["content".to_string()],
            duplicate_documents: DuplicatePolicy::default(),
            similarity: Similarity::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub chunk_size: usize,
    pub header: HeaderPolicy,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            header: HeaderPolicy::default(),
        }
    }
}

impl Config {
    /// Default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("review-qa")
            .join("config.toml")
    }

    /// Load the default config file, falling back to defaults when absent
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            tracing::debug!("No config file at {:?}; using defaults", path);
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load an explicit config file; it must exist and parse
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.embedding.provider, "ollama");
        assert_eq!(config.retriever.top_k, 10);
        assert_eq!(config.reader.kind, ReaderKind::Lexical);
        assert_eq!(config.reader.top_k, 1);
        assert_eq!(config.index.id_hash_keys, vec!["content"]);
        assert_eq!(config.index.similarity, Similarity::Cosine);
        assert_eq!(config.report.chunk_size, 256);
        assert_eq!(config.report.header, HeaderPolicy::Union);
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[embedding]
provider = "openai"
model = "text-embedding-3-small"

[reader]
kind = "llm"
llm = "openai"

[index]
duplicate_documents = "skip"

[report]
header = "strict"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.embedding.provider, "openai");
        assert_eq!(config.embedding.batch_size, 64);
        assert_eq!(config.reader.kind, ReaderKind::Llm);
        assert_eq!(config.reader.llm, LlmBackend::OpenAI);
        assert_eq!(config.reader.context_window, 150);
        assert_eq!(config.index.duplicate_documents, DuplicatePolicy::Skip);
        assert_eq!(config.report.header, HeaderPolicy::Strict);
        assert_eq!(config.report.chunk_size, 256);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[retriever]\ntop_k = 3\n").unwrap();
        assert_eq!(Config::load_from(&path).unwrap().retriever.top_k, 3);

        std::fs::write(&path, "[retriever]\ntop_k = \"many\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());
        assert!(Config::load_from(&dir.path().join("missing.toml")).is_err());
    }
}

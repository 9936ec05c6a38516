//! Per-document question answering for the report

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{json, Value};

use crate::config::{LlmBackend, ReaderConfig, ReaderKind};
use crate::document::INDEX_KEY;
use crate::llm::{LlmProvider, LlmType};
use crate::pipeline::{BatchResult, ExtractiveQaPipeline};
use crate::reader::{LexicalReader, LlmReader, ReaderProvider};
use crate::report::Record;
use crate::store::{InMemoryDocumentStore, MetadataFilter};

/// Build the configured reader
pub fn build_reader(config: &ReaderConfig, use_gpu: bool) -> anyhow::Result<ReaderProvider> {
    Ok(match config.kind {
        ReaderKind::Lexical => ReaderProvider::Lexical(LexicalReader::new(config.context_window)),
        ReaderKind::Llm => {
            let llm_type = match config.llm {
                LlmBackend::Ollama => LlmType::Ollama {
                    host: config.host.clone(),
                },
                LlmBackend::OpenAI => LlmType::OpenAI {
                    api_key: config.api_key.clone(),
                    base_url: config.base_url.clone(),
                },
            };
            let llm = LlmProvider::new(config.model.clone(), llm_type, use_gpu)?;
            ReaderProvider::Llm(LlmReader::new(llm, config.context_window))
        }
    })
}

/// One record per stored document, in store order.
///
/// Each document's metadata is copied; with queries, every query is answered
/// against that document alone through an `index` equality filter.
pub async fn collect_records(
    store: &InMemoryDocumentStore,
    qa: &ExtractiveQaPipeline<'_>,
    queries: &[String],
) -> anyhow::Result<Vec<Record>> {
    let total = store.documents().count();
    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("#>-"),
    );
    progress.set_message("Extracting document metadata");

    let mut records = Vec::with_capacity(total);
    for document in store.documents() {
        let mut record = document.meta.clone();

        if !queries.is_empty() {
            let index = document
                .meta
                .get(INDEX_KEY)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("Document {} has no '{}'", document.id, INDEX_KEY))?;
            let filter = MetadataFilter::eq(INDEX_KEY, index);
            let params = json!({"Retriever": {"filters": filter.to_value()}});
            let result = qa.run_batch(queries, &params).await?;
            add_answer_columns(&mut record, &result);
        }

        records.push(record);
        progress.inc(1);
    }
    progress.finish_and_clear();

    Ok(records)
}

/// Append `Q{n}`, `Q{n} answer`, `Q{n} score` and `Q{n} context` per query.
/// Queries without an answer get empty answer cells.
fn add_answer_columns(record: &mut Record, result: &BatchResult) {
    for (n, (query, answers)) in result.queries.iter().zip(&result.answers).enumerate() {
        let q = format!("Q{}", n + 1);
        let top = answers.first();

        record.insert(q.clone(), Value::String(query.clone()));
        record.insert(
            format!("{q} answer"),
            top.map_or(Value::Null, |a| Value::String(a.answer.clone())),
        );
        record.insert(
            format!("{q} score"),
            top.map_or(Value::Null, |a| Value::from(a.score)),
        );
        record.insert(
            format!("{q} context"),
            top.map_or(Value::Null, |a| Value::String(a.context.clone())),
        );
    }
}

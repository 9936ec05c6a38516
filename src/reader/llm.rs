//! LLM-backed extractive reader
//!
//! The model is asked to copy the answering span verbatim. A span that
//! cannot be located in the document is discarded and the lexical reader
//! answers for that document instead.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{context_window, rank, LexicalReader, Reader};
use crate::document::{Answer, Document, ScoredDocument};
use crate::llm::LlmProvider;

const NO_ANSWER: &str = "NONE";

/// Extractive reader driven by an LLM
pub struct LlmReader {
    llm: LlmProvider,
    fallback: LexicalReader,
    context_window: usize,
}

impl LlmReader {
    pub fn new(llm: LlmProvider, context_window: usize) -> Self {
        Self {
            llm,
            fallback: LexicalReader::new(context_window),
            context_window,
        }
    }

    async fn answer(&self, query: &str, document: &Document) -> anyhow::Result<Option<Answer>> {
        if document.content.trim().is_empty() {
            return Ok(None);
        }

        let reply = self.llm.generate(&build_prompt(query, &document.content)).await?;
        let span = clean_reply(&reply);

        if span.eq_ignore_ascii_case(NO_ANSWER) || span.is_empty() {
            debug!("{} found no answer in {}", self.llm.model_name(), document.id);
            return Ok(None);
        }

        match locate(&document.content, span) {
            Some((start, end)) => Ok(Some(Answer {
                answer: document.content[start..end].to_string(),
                score: 1.0,
                context: context_window(&document.content, start, end, self.context_window),
                document_id: document.id.clone(),
                offsets: (start, end),
            })),
            None => {
                warn!(
                    "Span from {} not found verbatim in {}; using lexical answer",
                    self.llm.model_name(),
                    document.id
                );
                Ok(self.fallback.answer(query, document))
            }
        }
    }
}

#[async_trait(?Send)]
impl Reader for LlmReader {
    async fn predict(
        &self,
        query: &str,
        documents: &[ScoredDocument],
        top_k: usize,
    ) -> anyhow::Result<Vec<Answer>> {
        let mut answers = Vec::with_capacity(documents.len());
        for scored in documents {
            if let Some(answer) = self.answer(query, &scored.document).await? {
                answers.push(answer);
            }
        }
        Ok(rank(answers, top_k))
    }
}

fn build_prompt(query: &str, content: &str) -> String {
    format!(
        "Answer the question using only the review below. Reply with the shortest \
         exact span copied from the review that answers it, and nothing else. \
         If the review does not answer the question, reply {NO_ANSWER}.\n\n\
         Review:\n{content}\n\n\
         Question: {query}\n\
         Answer:"
    )
}

/// Strip whitespace, a leading "Answer:" and wrapping quotes from a reply
fn clean_reply(reply: &str) -> &str {
    let mut span = reply.trim();
    if let Some(rest) = span.strip_prefix("Answer:") {
        span = rest.trim();
    }
    for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”')] {
        if let Some(inner) = span.strip_prefix(open).and_then(|s| s.strip_suffix(close)) {
            span = inner.trim();
        }
    }
    span
}

/// Byte range of `span` in `content`, exact first, then ASCII case-insensitive
fn locate(content: &str, span: &str) -> Option<(usize, usize)> {
    if let Some(start) = content.find(span) {
        return Some((start, start + span.len()));
    }
    let start = content.to_ascii_lowercase().find(&span.to_ascii_lowercase())?;
    Some((start, start + span.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_reply() {
        assert_eq!(clean_reply("  \"the ending\"\n"), "the ending");
        assert_eq!(clean_reply("Answer: “great music”"), "great music");
        assert_eq!(clean_reply("NONE"), "NONE");
    }

    #[test]
    fn test_locate() {
        let content = "The Ending was rushed.";
        assert_eq!(locate(content, "Ending was"), Some((4, 14)));
        assert_eq!(locate(content, "the ending"), Some((0, 10)));
        assert_eq!(locate(content, "great music"), None);
    }

    #[test]
    fn test_prompt_mentions_question_and_review() {
        let prompt = build_prompt("Is it good?", "It is good.");
        assert!(prompt.contains("Question: Is it good?"));
        assert!(prompt.contains("Review:\nIt is good."));
        assert!(prompt.contains(NO_ANSWER));
    }
}

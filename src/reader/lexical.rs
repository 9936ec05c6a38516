//! Offline extractive reader: the best BM25-matching sentence of each document

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::{context_window, rank, Bm25Scorer, Reader};
use crate::document::{Answer, Document, ScoredDocument};

static SENTENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?\n]+[.!?]*").expect("valid sentence regex"));

/// Sentence-level extractive reader.
///
/// Every non-empty document yields one answer: the sentence sharing the most
/// weighted terms with the query, or the first sentence when none do (score 0).
#[derive(Debug, Clone)]
pub struct LexicalReader {
    context_window: usize,
}

impl Default for LexicalReader {
    fn default() -> Self {
        Self::new(super::DEFAULT_CONTEXT_WINDOW)
    }
}

impl LexicalReader {
    pub fn new(context_window: usize) -> Self {
        Self { context_window }
    }

    /// Best answer in a single document
    pub fn answer(&self, query: &str, document: &Document) -> Option<Answer> {
        let content = &document.content;
        let spans = sentence_spans(content);
        if spans.is_empty() {
            return None;
        }

        let texts: Vec<&str> = spans.iter().map(|&(s, e)| &content[s..e]).collect();
        let scores = Bm25Scorer::build(&texts).score_query(query);

        let (best, raw) = scores
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |acc, (i, &s)| if s > acc.1 { (i, s) } else { acc });

        let (start, end) = spans[best];
        let raw = f64::from(raw);
        Some(Answer {
            answer: texts[best].to_string(),
            score: raw / (1.0 + raw),
            context: context_window(content, start, end, self.context_window),
            document_id: document.id.clone(),
            offsets: (start, end),
        })
    }
}

#[async_trait(?Send)]
impl Reader for LexicalReader {
    async fn predict(
        &self,
        query: &str,
        documents: &[ScoredDocument],
        top_k: usize,
    ) -> anyhow::Result<Vec<Answer>> {
        let answers = documents
            .iter()
            .filter_map(|d| self.answer(query, &d.document))
            .collect();
        Ok(rank(answers, top_k))
    }
}

/// Byte spans of sentences, surrounding whitespace excluded
pub(crate) fn sentence_spans(content: &str) -> Vec<(usize, usize)> {
    SENTENCE_RE
        .find_iter(content)
        .filter_map(|m| {
            let text = m.as_str();
            let lead = text.len() - text.trim_start().len();
            let trail = text.len() - text.trim_end().len();
            let (start, end) = (m.start() + lead, m.end() - trail);
            (start < end).then_some((start, end))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn doc(content: &str) -> Document {
        Document::new(content.into(), Map::new(), &["content".to_string()]).unwrap()
    }

    #[test]
    fn test_sentence_spans() {
        let content = "  First one.  Second!\nThird?";
        let spans: Vec<&str> = sentence_spans(content)
            .into_iter()
            .map(|(s, e)| &content[s..e])
            .collect();
        assert_eq!(spans, vec!["First one.", "Second!", "Third?"]);
    }

    #[test]
    fn test_picks_matching_sentence() {
        let reader = LexicalReader::new(40);
        let d = doc("The art style is gorgeous. The ending felt rushed and unearned. Voice acting was fine.");
        let answer = reader.answer("was the ending rushed?", &d).unwrap();

        assert_eq!(answer.answer, "The ending felt rushed and unearned.");
        assert_eq!(&d.content[answer.offsets.0..answer.offsets.1], answer.answer);
        assert!(answer.score > 0.0 && answer.score < 1.0);
        assert!(answer.context.contains(&answer.answer));
        assert_eq!(answer.document_id, d.id);
    }

    #[test]
    fn test_no_overlap_falls_back_to_first_sentence() {
        let reader = LexicalReader::default();
        let answer = reader.answer("xyzzy", &doc("Solid show. Would watch again.")).unwrap();
        assert_eq!(answer.answer, "Solid show.");
        assert_eq!(answer.score, 0.0);
    }

    #[test]
    fn test_empty_document_has_no_answer() {
        assert!(LexicalReader::default().answer("anything", &doc("   ")).is_none());
    }

    #[tokio::test]
    async fn test_predict_ranks_across_documents() {
        let reader = LexicalReader::default();
        let docs = vec![
            ScoredDocument { document: doc("Nothing relevant here."), score: 0.9 },
            ScoredDocument { document: doc("The soundtrack is superb."), score: 0.5 },
        ];
        let answers = reader.predict("how is the soundtrack", &docs, 1).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].answer, "The soundtrack is superb.");
    }
}

//! Readers - extract answer spans from retrieved documents

mod bm25;
mod lexical;
mod llm;

pub use bm25::Bm25Scorer;
pub use lexical::LexicalReader;
pub use llm::LlmReader;

use async_trait::async_trait;

use crate::document::{Answer, ScoredDocument};

/// Default characters of surrounding text kept with an answer
pub const DEFAULT_CONTEXT_WINDOW: usize = 150;

/// Extractive question answering over candidate documents
#[async_trait(?Send)]
pub trait Reader {
    /// Up to `top_k` answers across `documents`, best first
    async fn predict(
        &self,
        query: &str,
        documents: &[ScoredDocument],
        top_k: usize,
    ) -> anyhow::Result<Vec<Answer>>;
}

/// Reader selected by configuration
pub enum ReaderProvider {
    Lexical(LexicalReader),
    Llm(LlmReader),
}

#[async_trait(?Send)]
impl Reader for ReaderProvider {
    async fn predict(
        &self,
        query: &str,
        documents: &[ScoredDocument],
        top_k: usize,
    ) -> anyhow::Result<Vec<Answer>> {
        match self {
            ReaderProvider::Lexical(r) => r.predict(query, documents, top_k).await,
            ReaderProvider::Llm(r) => r.predict(query, documents, top_k).await,
        }
    }
}

/// Keep the best `top_k` answers
fn rank(mut answers: Vec<Answer>, top_k: usize) -> Vec<Answer> {
    answers.sort_by(|a, b| b.score.total_cmp(&a.score));
    answers.truncate(top_k);
    answers
}

/// Text around `content[start..end]`, about `window` characters wide.
///
/// Offsets are byte offsets on char boundaries. The answer is always kept
/// whole, even when it is longer than the window.
pub fn context_window(content: &str, start: usize, end: usize, window: usize) -> String {
    let answer_chars = content[start..end].chars().count();
    let pad = window.saturating_sub(answer_chars) / 2;

    let from = content[..start]
        .char_indices()
        .rev()
        .nth(pad.saturating_sub(1))
        .map_or(0, |(i, _)| i);
    let from = if pad == 0 { start } else { from };

    let to = content[end..]
        .char_indices()
        .nth(pad)
        .map_or(content.len(), |(i, _)| end + i);

    content[from..to].trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_window_centers_answer() {
        let content = "aaaa bbbb ANSWER cccc dddd";
        let start = content.find("ANSWER").unwrap();
        let ctx = context_window(content, start, start + 6, 12);
        assert_eq!(ctx, "bb ANSWER cc");
    }

    #[test]
    fn test_context_window_clamps_to_content() {
        let content = "short answer";
        assert_eq!(context_window(content, 0, 5, 150), "short answer");
    }

    #[test]
    fn test_context_window_never_cuts_answer() {
        let content = "xx a long answer yy";
        let ctx = context_window(content, 3, 16, 4);
        assert_eq!(ctx, "a long answer");
    }

    #[test]
    fn test_context_window_multibyte() {
        let content = "素晴らしい作品でした。音楽も最高。";
        let start = content.find("音楽").unwrap();
        let end = start + "音楽".len();
        let ctx = context_window(content, start, end, 6);
        assert_eq!(ctx, "た。音楽も最");
    }

    #[test]
    fn test_rank_keeps_best() {
        let mk = |s: f64| Answer {
            answer: "a".into(),
            score: s,
            context: "a".into(),
            document_id: "d".into(),
            offsets: (0, 1),
        };
        let ranked = rank(vec![mk(0.2), mk(0.9), mk(0.5)], 2);
        assert_eq!(ranked.iter().map(|a| a.score).collect::<Vec<_>>(), vec![0.9, 0.5]);
    }
}

//! Token truncation using tiktoken
//!
//! Review bodies are often longer than an embedding model accepts. Remote
//! providers reject or silently clip over-long input, so texts are clipped
//! here first. cl100k is only an approximation of each model's tokenizer.

use std::sync::LazyLock;

use tiktoken_rs::{cl100k_base, CoreBPE};
use tracing::warn;

static BPE: LazyLock<Option<CoreBPE>> = LazyLock::new(|| match cl100k_base() {
    Ok(bpe) => Some(bpe),
    Err(e) => {
        warn!("tiktoken encoding unavailable, texts will not be truncated: {}", e);
        None
    }
});

/// Clip each text to at most `token_limit` tokens
pub fn truncate_to_token_limit(texts: &[&str], token_limit: usize) -> Vec<String> {
    let Some(bpe) = BPE.as_ref() else {
        return texts.iter().map(|t| t.to_string()).collect();
    };

    let mut truncated = Vec::with_capacity(texts.len());
    let mut truncation_count = 0;

    for text in texts {
        let tokens = bpe.encode_with_special_tokens(text);
        if tokens.len() <= token_limit {
            truncated.push(text.to_string());
            continue;
        }

        let kept: Vec<_> = tokens.into_iter().take(token_limit).collect();
        let clipped = bpe.decode(kept).unwrap_or_else(|_| {
            // Fall back to a char-boundary-safe prefix of ~4 chars per token
            text.chars().take(token_limit * 4).collect()
        });
        truncated.push(clipped);
        truncation_count += 1;
    }

    if truncation_count > 0 {
        warn!(
            "{}/{} texts truncated to {} tokens before embedding",
            truncation_count,
            texts.len(),
            token_limit
        );
    }

    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_untouched() {
        let result = truncate_to_token_limit(&["Hello world"], 100);
        assert_eq!(result, vec!["Hello world".to_string()]);
    }

    #[test]
    fn test_long_text_clipped() {
        let long = "word ".repeat(500);
        let result = truncate_to_token_limit(&[long.as_str()], 16);
        assert!(result[0].len() < long.len());
    }
}

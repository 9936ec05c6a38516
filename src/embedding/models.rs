//! Per-model embedding settings
//!
//! Asymmetric models want different prefixes for stored text and queries,
//! and every model has an input token limit.

/// Settings for one embedding model family
#[derive(Debug, Clone, PartialEq)]
pub struct ModelProfile {
    /// Prefix added to stored documents
    pub document_prefix: &'static str,
    /// Prefix added to queries
    pub query_prefix: &'static str,
    /// Output dimensions, 0 when it must be detected
    pub dimensions: usize,
    /// Maximum input tokens
    pub token_limit: usize,
}

impl Default for ModelProfile {
    fn default() -> Self {
        Self {
            document_prefix: "",
            query_prefix: "",
            dimensions: 0,
            token_limit: 2048,
        }
    }
}

/// Strip hub organisations and version tags: `sentence-transformers/all-MiniLM-L6-v2`
/// and `all-minilm:latest` both reduce to the bare model name.
fn base_name(model_name: &str) -> &str {
    let name = model_name.rsplit('/').next().unwrap_or(model_name);
    name.split(':').next().unwrap_or(name)
}

/// Look up the profile for a model name
pub fn profile_for(model_name: &str) -> ModelProfile {
    match base_name(model_name) {
        "all-minilm" | "all-MiniLM-L6-v2" | "all-MiniLM-L12-v2" => ModelProfile {
            dimensions: 384,
            token_limit: 256,
            ..ModelProfile::default()
        },

        "all-mpnet-base-v2" => ModelProfile {
            dimensions: 768,
            token_limit: 384,
            ..ModelProfile::default()
        },

        "nomic-embed-text" | "nomic-embed-text-v1.5" => ModelProfile {
            document_prefix: "search_document: ",
            query_prefix: "search_query: ",
            dimensions: 768,
            token_limit: 2048,
        },

        "mxbai-embed-large" | "mxbai-embed-large-v1" => ModelProfile {
            query_prefix: "Represent this sentence for searching relevant passages: ",
            dimensions: 1024,
            token_limit: 512,
            ..ModelProfile::default()
        },

        "bge-small-en-v1.5" | "bge-base-en-v1.5" => ModelProfile {
            query_prefix: "Represent this sentence for searching relevant passages: ",
            dimensions: if model_name.contains("small") { 384 } else { 768 },
            token_limit: 512,
            ..ModelProfile::default()
        },

        "text-embedding-3-small" | "text-embedding-ada-002" => ModelProfile {
            dimensions: 1536,
            token_limit: 8192,
            ..ModelProfile::default()
        },

        "text-embedding-3-large" => ModelProfile {
            dimensions: 3072,
            token_limit: 8192,
            ..ModelProfile::default()
        },

        _ => ModelProfile::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minilm_aliases() {
        let hub = profile_for("sentence-transformers/all-MiniLM-L6-v2");
        let ollama = profile_for("all-minilm:latest");
        assert_eq!(hub.dimensions, 384);
        assert_eq!(hub, ollama);
        assert_eq!(hub.query_prefix, "");
    }

    #[test]
    fn test_nomic_prefixes() {
        let profile = profile_for("nomic-embed-text:latest");
        assert_eq!(profile.document_prefix, "search_document: ");
        assert_eq!(profile.query_prefix, "search_query: ");
    }

    #[test]
    fn test_unknown_model_needs_detection() {
        let profile = profile_for("some-unknown-model");
        assert_eq!(profile.dimensions, 0);
        assert_eq!(profile.token_limit, 2048);
    }
}

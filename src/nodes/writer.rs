//! Write converted documents into a document store

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{node_params, unexpected, Node, Payload};
use crate::store::{DocumentStore, DuplicatePolicy};

/// Terminal node of every indexing pipeline
pub struct DocumentWriter<'a> {
    store: &'a mut dyn DocumentStore,
    policy: DuplicatePolicy,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct WriterParams {
    duplicate_documents: Option<DuplicatePolicy>,
}

impl<'a> DocumentWriter<'a> {
    pub fn new(store: &'a mut dyn DocumentStore, policy: DuplicatePolicy) -> Self {
        Self { store, policy }
    }
}

impl Node for DocumentWriter<'_> {
    fn component(&self) -> &'static str {
        "DocumentStore"
    }

    fn run(&mut self, input: Payload, params: &Value) -> anyhow::Result<Payload> {
        let documents = match input {
            Payload::Documents(documents) => documents,
            other => return Err(unexpected(self.component(), &other, "documents")),
        };
        let params: WriterParams = node_params(params, self.component())?;
        let policy = params.duplicate_documents.unwrap_or(self.policy);

        let received = documents.len();
        let count = self.store.write_documents(documents, policy)?;
        info!(
            "Wrote {} of {} documents ({} stored)",
            count,
            received,
            self.store.document_count()
        );
        Ok(Payload::Written { count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::store::InMemoryDocumentStore;
    use serde_json::{json, Map};

    fn doc(content: &str) -> Document {
        Document::new(content.into(), Map::new(), &["content".to_string()]).unwrap()
    }

    #[test]
    fn test_writes_documents() {
        let mut store = InMemoryDocumentStore::default();
        {
            let mut writer = DocumentWriter::new(&mut store, DuplicatePolicy::Overwrite);
            let out = writer
                .run(Payload::Documents(vec![doc("a"), doc("b")]), &Value::Null)
                .unwrap();
            assert!(matches!(out, Payload::Written { count: 2 }));
        }
        assert_eq!(store.document_count(), 2);
    }

    #[test]
    fn test_policy_param() {
        let mut store = InMemoryDocumentStore::default();
        let mut writer = DocumentWriter::new(&mut store, DuplicatePolicy::Overwrite);
        writer
            .run(Payload::Documents(vec![doc("a")]), &Value::Null)
            .unwrap();
        let result = writer.run(
            Payload::Documents(vec![doc("a")]),
            &json!({"duplicate_documents": "fail"}),
        );
        assert!(result.is_err());
    }
}

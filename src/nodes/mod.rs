//! Pipeline nodes - single-purpose steps from input files to stored documents
//!
//! Every node consumes one [`Payload`] and produces the next one. Per-run
//! parameters arrive as JSON and are deserialized into the node's own
//! parameter struct.

mod converter;
mod dataframer;
mod writer;
mod zip_lister;

pub use converter::{Converter, DataFrameConverter, SeriesConverter};
pub use dataframer::{DataFramer, ZipDataFramer};
pub use writer::DocumentWriter;
pub use zip_lister::{ZipLister, ZipMember};

#[cfg(test)]
pub(crate) use zip_lister::tests::write_zip as write_test_zip;

use std::path::PathBuf;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::dataframe::DataFrame;
use crate::document::Document;

/// Data flowing between nodes
#[derive(Debug, Clone)]
pub enum Payload {
    Files(Vec<PathBuf>),
    ZipMembers(Vec<ZipMember>),
    DataFrames(Vec<DataFrame>),
    Documents(Vec<Document>),
    Written { count: usize },
}

impl Payload {
    /// Variant name, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Files(_) => "files",
            Payload::ZipMembers(_) => "zip members",
            Payload::DataFrames(_) => "dataframes",
            Payload::Documents(_) => "documents",
            Payload::Written { .. } => "write result",
        }
    }

    /// Short summary for debug traces
    pub fn describe(&self) -> Value {
        match self {
            Payload::Files(paths) => serde_json::json!({
                "files": paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
            }),
            Payload::ZipMembers(members) => serde_json::json!({
                "zip_members": members.iter().map(ZipMember::to_string).collect::<Vec<_>>(),
            }),
            Payload::DataFrames(frames) => serde_json::json!({
                "dataframes": frames
                    .iter()
                    .map(|f| serde_json::json!({"source": f.source, "rows": f.len(), "columns": f.columns}))
                    .collect::<Vec<_>>(),
            }),
            Payload::Documents(docs) => serde_json::json!({ "documents": docs.len() }),
            Payload::Written { count } => serde_json::json!({ "written": count }),
        }
    }
}

/// A pipeline step
pub trait Node {
    /// Component type, shown in logs and traces
    fn component(&self) -> &'static str;

    /// Transform one payload into the next
    fn run(&mut self, input: Payload, params: &Value) -> anyhow::Result<Payload>;
}

/// Deserialize per-run node parameters; `null` means "use the defaults"
pub fn node_params<T: DeserializeOwned + Default>(params: &Value, component: &str) -> anyhow::Result<T> {
    if params.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(params.clone())
        .with_context(|| format!("Invalid parameters for {}", component))
}

fn unexpected(component: &str, input: &Payload, expected: &str) -> anyhow::Error {
    anyhow::anyhow!("{} expects {} but received {}", component, expected, input.kind())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Params {
        top_k: Option<usize>,
    }

    #[test]
    fn test_node_params_null_is_default() {
        let p: Params = node_params(&Value::Null, "Test").unwrap();
        assert!(p.top_k.is_none());
    }

    #[test]
    fn test_node_params_rejects_unknown_fields() {
        let err = node_params::<Params>(&json!({"top_n": 3}), "Test").unwrap_err();
        assert!(err.to_string().contains("Test"));
    }

    #[test]
    fn test_describe_documents() {
        let payload = Payload::Written { count: 4 };
        assert_eq!(payload.describe(), json!({"written": 4}));
    }
}

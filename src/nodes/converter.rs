//! Turn data frame rows into documents
//!
//! Each row yields one document: a designated column becomes the content,
//! selected columns become metadata and a run-wide row counter is appended
//! as `index`.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{node_params, unexpected, Node, Payload};
use crate::dataframe::{value_to_text, DataFrame};
use crate::document::{Document, INDEX_KEY};

/// Content column plus metadata columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrameConverter {
    pub document_column: String,
    pub meta_columns: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DataFrameConverterParams {
    document_column: Option<String>,
    meta_columns: Option<Vec<String>>,
}

impl DataFrameConverter {
    pub fn new(document_column: impl Into<String>, meta_columns: Vec<String>) -> Self {
        Self {
            document_column: document_column.into(),
            meta_columns,
        }
    }

    /// Convert frames in order; `index` continues across frames
    pub fn convert(&self, frames: &[DataFrame]) -> anyhow::Result<Vec<Document>> {
        convert_frames(frames, &self.document_column, &self.meta_columns)
    }
}

/// Single content column, metadata holds only `index`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesConverter {
    pub column: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeriesConverterParams {
    column: Option<String>,
}

impl SeriesConverter {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }

    pub fn convert(&self, frames: &[DataFrame]) -> anyhow::Result<Vec<Document>> {
        convert_frames(frames, &self.column, &[])
    }
}

fn convert_frames(
    frames: &[DataFrame],
    document_column: &str,
    meta_columns: &[String],
) -> anyhow::Result<Vec<Document>> {
    let mut documents = Vec::with_capacity(frames.iter().map(DataFrame::len).sum());
    let mut next_index: u64 = 0;

    if meta_columns.iter().any(|c| c == INDEX_KEY) {
        warn!("Metadata column '{}' is replaced by the row index", INDEX_KEY);
    }

    for frame in frames {
        let content_idx = frame.column_index(document_column)?;
        let meta_idx = meta_columns
            .iter()
            .filter(|c| c.as_str() != INDEX_KEY)
            .map(|c| frame.column_index(c).map(|i| (c, i)))
            .collect::<Result<Vec<_>, _>>()?;

        for row in &frame.rows {
            let mut meta = Map::new();
            for (column, idx) in &meta_idx {
                meta.insert((*column).clone(), row[*idx].clone());
            }
            meta.insert(INDEX_KEY.to_string(), Value::from(next_index));
            next_index += 1;

            let content = value_to_text(&row[content_idx]);
            documents.push(Document::new(content, meta, &frame.id_hash_keys)?);
        }
        debug!("Converted {} rows from {}", frame.len(), frame.source);
    }

    Ok(documents)
}

/// The converter selected for an indexing pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Converter {
    DataFrame(DataFrameConverter),
    Series(SeriesConverter),
}

impl From<DataFrameConverter> for Converter {
    fn from(c: DataFrameConverter) -> Self {
        Converter::DataFrame(c)
    }
}

impl From<SeriesConverter> for Converter {
    fn from(c: SeriesConverter) -> Self {
        Converter::Series(c)
    }
}

impl Node for Converter {
    fn component(&self) -> &'static str {
        match self {
            Converter::DataFrame(_) => "DataFrameConverter",
            Converter::Series(_) => "SeriesConverter",
        }
    }

    fn run(&mut self, input: Payload, params: &Value) -> anyhow::Result<Payload> {
        let Payload::DataFrames(frames) = &input else {
            return Err(unexpected(self.component(), &input, "dataframes"));
        };
        let component = self.component();

        let documents = match self {
            Converter::DataFrame(c) => {
                let p: DataFrameConverterParams = node_params(params, component)?;
                convert_frames(
                    frames,
                    p.document_column.as_deref().unwrap_or(&c.document_column),
                    p.meta_columns.as_deref().unwrap_or(&c.meta_columns),
                )?
            }
            Converter::Series(c) => {
                let p: SeriesConverterParams = node_params(params, component)?;
                convert_frames(frames, p.column.as_deref().unwrap_or(&c.column), &[])?
            }
        };

        Ok(Payload::Documents(documents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InputError;
    use serde_json::json;

    fn reviews() -> Vec<DataFrame> {
        vec![
            DataFrame::from_csv_str(
                "Review,Anime Title,Overall Rating\n\
                 Loved it,Mushishi,9\n\
                 Too slow,Monster,6\n",
                "a.csv",
            )
            .unwrap(),
            DataFrame::from_csv_str(
                "Overall Rating,Review,Anime Title\n\
                 8,Great fights,Naruto\n",
                "b.csv",
            )
            .unwrap(),
        ]
    }

    #[test]
    fn test_index_continues_across_frames() {
        let converter = DataFrameConverter::new("Review", vec![]);
        let docs = converter.convert(&reviews()).unwrap();
        let indices: Vec<u64> = docs.iter().filter_map(Document::index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_meta_in_configured_order_then_index() {
        let converter =
            DataFrameConverter::new("Review", vec!["Overall Rating".into(), "Anime Title".into()]);
        let docs = converter.convert(&reviews()).unwrap();

        assert_eq!(docs[2].content, "Great fights");
        let keys: Vec<&str> = docs[2].meta.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Overall Rating", "Anime Title", "index"]);
        assert_eq!(docs[0].meta["Anime Title"], json!("Mushishi"));
        assert_eq!(docs[0].meta["Overall Rating"], json!(9));
    }

    #[test]
    fn test_series_converter_only_index() {
        let docs = SeriesConverter::new("Anime Title").convert(&reviews()).unwrap();
        assert_eq!(docs.len(), 3);
        assert!(docs.iter().all(|d| d.meta.len() == 1 && d.meta.contains_key(INDEX_KEY)));
        assert_eq!(docs[1].content, "Monster");
    }

    #[test]
    fn test_numeric_content_is_coerced_to_text() {
        let docs = SeriesConverter::new("Overall Rating").convert(&reviews()).unwrap();
        assert_eq!(docs[0].content, "9");
    }

    #[test]
    fn test_missing_columns_fail() {
        let err = DataFrameConverter::new("Body", vec![])
            .convert(&reviews())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InputError>(),
            Some(InputError::MissingColumn { column, .. }) if column == "Body"
        ));

        let err = DataFrameConverter::new("Review", vec!["Studio".into()])
            .convert(&reviews())
            .unwrap_err();
        assert!(err.to_string().contains("Studio"));
    }

    #[test]
    fn test_node_run_resets_index_per_run() {
        let mut converter = Converter::from(SeriesConverter::new("Review"));
        for _ in 0..2 {
            let out = converter
                .run(Payload::DataFrames(reviews()), &Value::Null)
                .unwrap();
            let Payload::Documents(docs) = out else { panic!("wrong payload") };
            assert_eq!(docs[0].index(), Some(0));
        }
    }

    #[test]
    fn test_node_params_override_columns() {
        let mut converter = Converter::from(DataFrameConverter::new("Review", vec![]));
        let params = json!({"meta_columns": ["Anime Title"]});
        let Payload::Documents(docs) = converter
            .run(Payload::DataFrames(reviews()), &params)
            .unwrap()
        else {
            panic!("wrong payload")
        };
        assert_eq!(docs[1].meta["Anime Title"], json!("Monster"));
    }
}

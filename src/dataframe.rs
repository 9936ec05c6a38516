//! In-memory tables parsed from CSV text
//!
//! Every column gets one inferred type: integer when all non-empty cells
//! parse as `i64`, float when they all parse as finite `f64`, text otherwise.
//! Empty cells become `null` regardless of the column type.

use std::io::Read;

use serde_json::{Number, Value};

use crate::error::InputError;

/// A table of rows × named columns
#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    /// Where the table came from, for error messages
    pub source: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// Attributes used to derive document ids downstream
    pub id_hash_keys: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ColumnKind {
    Integer,
    Float,
    Text,
}

impl DataFrame {
    /// Parse comma-separated text with a header row
    pub fn from_reader<R: Read>(reader: R, source: &str) -> Result<Self, InputError> {
        let malformed = |e: csv::Error| InputError::MalformedCsv {
            source_name: source.to_string(),
            message: e.to_string(),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let columns: Vec<String> = reader
            .headers()
            .map_err(malformed)?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut raw: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record.map_err(malformed)?;
            raw.push(record.iter().map(|c| c.to_string()).collect());
        }

        let kinds: Vec<ColumnKind> = (0..columns.len())
            .map(|col| infer_kind(raw.iter().map(|row| row[col].as_str())))
            .collect();

        let rows = raw
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(kinds.iter())
                    .map(|(cell, kind)| typed_value(cell, *kind))
                    .collect()
            })
            .collect();

        Ok(Self {
            source: source.to_string(),
            columns,
            rows,
            id_hash_keys: vec!["content".to_string()],
        })
    }

    /// Parse a CSV string
    pub fn from_csv_str(text: &str, source: &str) -> Result<Self, InputError> {
        Self::from_reader(text.as_bytes(), source)
    }

    /// Position of a column, or a descriptive error
    pub fn column_index(&self, column: &str) -> Result<usize, InputError> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| InputError::MissingColumn {
                column: column.to_string(),
                source_name: self.source.clone(),
                available: self.columns.join(", "),
            })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn infer_kind<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut kind = ColumnKind::Integer;
    for cell in cells.filter(|c| !c.is_empty()) {
        let cell = cell.trim();
        if kind == ColumnKind::Integer && cell.parse::<i64>().is_err() {
            kind = ColumnKind::Float;
        }
        if kind == ColumnKind::Float && !cell.parse::<f64>().is_ok_and(f64::is_finite) {
            return ColumnKind::Text;
        }
    }
    kind
}

fn typed_value(cell: String, kind: ColumnKind) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    match kind {
        ColumnKind::Integer => cell
            .trim()
            .parse::<i64>()
            .map(|n| Value::Number(n.into()))
            .unwrap_or(Value::String(cell)),
        ColumnKind::Float => cell
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::String(cell)),
        ColumnKind::Text => Value::String(cell),
    }
}

/// Render a cell as document text
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

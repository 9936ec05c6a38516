//! CSV report of per-document metadata and answers, written in chunks

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::dataframe::value_to_text;
use crate::error::UsageError;

/// One output row: column name → value
pub type Record = Map<String, Value>;

/// Records written between flushes
pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// How the header is derived from the records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderPolicy {
    /// Every key seen in any record, in first-seen order; missing cells are blank
    #[default]
    Union,
    /// The first record's keys; any record with a different key set is rejected
    Strict,
}

/// What a finished report contains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub header: Vec<String>,
    pub rows: usize,
    pub chunks: usize,
}

/// Compute the header for `records` under `policy`
pub fn header_for(records: &[Record], policy: HeaderPolicy) -> anyhow::Result<Vec<String>> {
    let first = records
        .first()
        .ok_or_else(|| anyhow::anyhow!("No documents to report; nothing was indexed"))?;
    let mut header: Vec<String> = first.keys().cloned().collect();

    match policy {
        HeaderPolicy::Strict => {
            if let Some((i, _)) = records.iter().enumerate().find(|(_, r)| {
                r.len() != header.len() || !header.iter().all(|k| r.contains_key(k))
            }) {
                anyhow::bail!(
                    "Record {} has columns [{}] but the header is [{}]",
                    i,
                    records[i].keys().cloned().collect::<Vec<_>>().join(", "),
                    header.join(", ")
                );
            }
        }
        HeaderPolicy::Union => {
            for record in &records[1..] {
                for key in record.keys() {
                    if !header.contains(key) {
                        header.push(key.clone());
                    }
                }
            }
        }
    }

    Ok(header)
}

/// CSV writer that flushes after every chunk
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
    header: Vec<String>,
    rows: usize,
    chunks: usize,
}

impl<W: Write> ReportWriter<W> {
    /// Start a report, writing the header row
    pub fn new(inner: W, header: Vec<String>) -> anyhow::Result<Self> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(&header)?;
        Ok(Self {
            writer,
            header,
            rows: 0,
            chunks: 0,
        })
    }

    /// Write one chunk of records and flush it
    pub fn write_chunk(&mut self, records: &[Record]) -> anyhow::Result<()> {
        for record in records {
            let row = self
                .header
                .iter()
                .map(|column| record.get(column).map(value_to_text).unwrap_or_default());
            self.writer.write_record(row)?;
        }
        self.writer.flush()?;
        self.rows += records.len();
        self.chunks += 1;
        Ok(())
    }

    /// Flush and hand back the totals
    pub fn finish(mut self) -> anyhow::Result<ReportSummary> {
        self.writer.flush()?;
        Ok(ReportSummary {
            header: self.header,
            rows: self.rows,
            chunks: self.chunks,
        })
    }
}

/// Write `records` to `path` in chunks of `chunk_size`.
///
/// Fails before touching `path` when there are no records or the header
/// policy rejects them.
pub fn write_report(
    path: &Path,
    records: &[Record],
    chunk_size: usize,
    policy: HeaderPolicy,
) -> anyhow::Result<ReportSummary> {
    if chunk_size == 0 {
        return Err(UsageError::ZeroChunkSize.into());
    }
    let header = header_for(records, policy)?;

    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = ReportWriter::new(BufWriter::new(file), header)?;

    let progress = ProgressBar::new(records.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    progress.set_message(format!("Writing {}", path.display()));

    for chunk in records.chunks(chunk_size) {
        writer.write_chunk(chunk)?;
        progress.inc(chunk.len() as u64);
    }
    progress.finish_and_clear();

    let summary = writer.finish()?;
    info!(
        "Wrote {} rows to {:?} in {} chunks",
        summary.rows, path, summary.chunks
    );
    Ok(summary)
}

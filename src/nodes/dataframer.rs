//! Read CSV files, or CSV members of ZIP archives, into data frames

use std::fs::File;
use std::io::BufReader;

use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use zip::ZipArchive;

use super::{node_params, unexpected, Node, Payload, ZipMember};
use crate::dataframe::DataFrame;
use crate::document::validate_hash_keys;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FramerParams {
    id_hash_keys: Option<Vec<String>>,
}

/// Resolve the hash keys for one run: run params win over the node default
fn hash_keys_for_run(
    default: &[String],
    params: &Value,
    component: &str,
) -> anyhow::Result<Vec<String>> {
    let params: FramerParams = node_params(params, component)?;
    let keys = params.id_hash_keys.unwrap_or_else(|| default.to_vec());
    validate_hash_keys(&keys)?;
    Ok(keys)
}

/// Plain CSV paths → one data frame per file
#[derive(Debug, Clone)]
pub struct DataFramer {
    id_hash_keys: Vec<String>,
}

impl DataFramer {
    pub fn new(id_hash_keys: Vec<String>) -> anyhow::Result<Self> {
        validate_hash_keys(&id_hash_keys)?;
        Ok(Self { id_hash_keys })
    }
}

impl Default for DataFramer {
    fn default() -> Self {
        Self {
            id_hash_keys: vec!["content".to_string()],
        }
    }
}

impl Node for DataFramer {
    fn component(&self) -> &'static str {
        "DataFramer"
    }

    fn run(&mut self, input: Payload, params: &Value) -> anyhow::Result<Payload> {
        let Payload::Files(paths) = &input else {
            return Err(unexpected(self.component(), &input, "file paths"));
        };
        let keys = hash_keys_for_run(&self.id_hash_keys, params, self.component())?;

        let mut frames = Vec::with_capacity(paths.len());
        for path in paths {
            let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
            let mut frame = DataFrame::from_reader(BufReader::new(file), &path.display().to_string())?;
            debug!("Read {} rows from {:?}", frame.len(), path);
            frame.id_hash_keys = keys.clone();
            frames.push(frame);
        }
        Ok(Payload::DataFrames(frames))
    }
}

/// (archive, member) pairs → one data frame per member
#[derive(Debug, Clone)]
pub struct ZipDataFramer {
    id_hash_keys: Vec<String>,
}

impl ZipDataFramer {
    pub fn new(id_hash_keys: Vec<String>) -> anyhow::Result<Self> {
        validate_hash_keys(&id_hash_keys)?;
        Ok(Self { id_hash_keys })
    }

    fn read_member(member: &ZipMember) -> anyhow::Result<DataFrame> {
        let file = File::open(&member.archive)
            .with_context(|| format!("Failed to open archive {:?}", member.archive))?;
        let mut archive = ZipArchive::new(BufReader::new(file))
            .with_context(|| format!("{:?} is not a valid ZIP archive", member.archive))?;
        let entry = archive
            .by_name(&member.name)
            .with_context(|| format!("Failed to open member {}", member))?;
        Ok(DataFrame::from_reader(entry, &member.to_string())?)
    }
}

impl Default for ZipDataFramer {
    fn default() -> Self {
        Self {
            id_hash_keys: vec!["content".to_string()],
        }
    }
}

impl Node for ZipDataFramer {
    fn component(&self) -> &'static str {
        "ZipDataFramer"
    }

    fn run(&mut self, input: Payload, params: &Value) -> anyhow::Result<Payload> {
        let Payload::ZipMembers(members) = &input else {
            return Err(unexpected(self.component(), &input, "zip members"));
        };
        let keys = hash_keys_for_run(&self.id_hash_keys, params, self.component())?;

        let mut frames = Vec::with_capacity(members.len());
        for member in members {
            let mut frame = Self::read_member(member)?;
            debug!("Read {} rows from {}", frame.len(), member);
            frame.id_hash_keys = keys.clone();
            frames.push(frame);
        }
        Ok(Payload::DataFrames(frames))
    }
}

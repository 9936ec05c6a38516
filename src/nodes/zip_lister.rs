//! List CSV members of ZIP archives

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use zip::ZipArchive;

use super::{node_params, unexpected, Node, Payload};

/// A member inside a specific archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipMember {
    pub archive: PathBuf,
    pub name: String,
}

impl fmt::Display for ZipMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.archive.display(), self.name)
    }
}

/// Archive paths → member names accepted by `valid_names`
#[derive(Debug, Clone, Default)]
pub struct ZipLister {
    /// Exact, case-sensitive member names to keep; `None` keeps every file
    valid_names: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ZipListerParams {
    valid_names: Option<Vec<String>>,
}

impl ZipLister {
    pub fn new(valid_names: Option<Vec<String>>) -> Self {
        Self { valid_names }
    }

    /// Members of one archive, in archive order
    pub fn list(&self, archive_path: &Path) -> anyhow::Result<Vec<ZipMember>> {
        self.list_with(archive_path, self.valid_names.as_deref())
    }

    fn list_with(
        &self,
        archive_path: &Path,
        valid_names: Option<&[String]>,
    ) -> anyhow::Result<Vec<ZipMember>> {
        let file = File::open(archive_path)
            .with_context(|| format!("Failed to open archive {:?}", archive_path))?;
        let mut archive = ZipArchive::new(file)
            .with_context(|| format!("{:?} is not a valid ZIP archive", archive_path))?;

        let mut members = Vec::new();
        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name();
            if valid_names.map_or(true, |names| names.iter().any(|n| n == name)) {
                members.push(ZipMember {
                    archive: archive_path.to_path_buf(),
                    name: name.to_string(),
                });
            }
        }

        if let Some(names) = valid_names {
            for missing in names {
                if !members.iter().any(|m| &m.name == missing) {
                    warn!("{:?} has no member named {:?}", archive_path, missing);
                }
            }
        }

        debug!("{:?}: {} matching members", archive_path, members.len());
        Ok(members)
    }
}

impl Node for ZipLister {
    fn component(&self) -> &'static str {
        "ZipLister"
    }

    fn run(&mut self, input: Payload, params: &Value) -> anyhow::Result<Payload> {
        let Payload::Files(archives) = &input else {
            return Err(unexpected(self.component(), &input, "archive paths"));
        };
        let params: ZipListerParams = node_params(params, self.component())?;
        let valid_names = params.valid_names.as_deref().or(self.valid_names.as_deref());

        let mut members = Vec::new();
        for archive in archives {
            members.extend(self.list_with(archive, valid_names)?);
        }
        Ok(Payload::ZipMembers(members))
    }
}

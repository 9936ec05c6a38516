//! Pipelines - fixed linear chains of named nodes
//!
//! Nodes are registered in order, each naming the node it consumes. The
//! chain is rooted at the [`ROOT`] input, which receives the file paths
//! passed to [`Pipeline::run`].

mod indexers;
mod qa;

pub use indexers::{IndexerOptions, ReviewIndexer, ZippedReviewIndexer};
pub use qa::{BatchResult, ExtractiveQaPipeline, QaResult};

use std::path::PathBuf;

use serde_json::{Map, Value};
use tracing::debug;

use crate::nodes::{Node, Payload};

/// Name of the implicit input node
pub const ROOT: &str = "File";

struct Registered<'a> {
    name: String,
    node: Box<dyn Node + 'a>,
}

/// A linear chain of nodes
#[derive(Default)]
pub struct Pipeline<'a> {
    nodes: Vec<Registered<'a>>,
}

/// Terminal payload plus the optional per-node trace
#[derive(Debug)]
pub struct PipelineOutput {
    pub output: Payload,
    pub debug: Option<Value>,
}

impl<'a> Pipeline<'a> {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Register `node` under `name`, consuming the output of `inputs`.
    ///
    /// Exactly one input is allowed and it must be the current tail of the
    /// chain: [`ROOT`] for the first node, the last registered node after that.
    pub fn add_node(
        &mut self,
        node: impl Node + 'a,
        name: &str,
        inputs: &[&str],
    ) -> anyhow::Result<()> {
        if name == ROOT || self.nodes.iter().any(|n| n.name == name) {
            anyhow::bail!("Node name '{}' is already in use", name);
        }

        let input = match inputs {
            [input] => *input,
            [] => anyhow::bail!("Node '{}' declares no input", name),
            _ => anyhow::bail!(
                "Node '{}' declares {} inputs; only linear pipelines are supported",
                name,
                inputs.len()
            ),
        };

        let known = input == ROOT || self.nodes.iter().any(|n| n.name == input);
        if !known {
            anyhow::bail!("Node '{}' has unknown input '{}'", name, input);
        }

        let tail = self.nodes.last().map_or(ROOT, |n| n.name.as_str());
        if input != tail {
            anyhow::bail!(
                "Node '{}' cannot consume '{}': its output already feeds another node",
                name,
                input
            );
        }

        debug!("Registered node {} ({}) after {}", name, node.component(), input);
        self.nodes.push(Registered {
            name: name.to_string(),
            node: Box::new(node),
        });
        Ok(())
    }

    /// Registered node names in execution order
    pub fn node_names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    /// Run the chain once over `file_paths`.
    ///
    /// `params` is `null` or an object keyed by node name.
    pub fn run(
        &mut self,
        file_paths: Vec<PathBuf>,
        params: &Value,
        debug: bool,
    ) -> anyhow::Result<PipelineOutput> {
        let params = self.split_params(params)?;
        let mut trace = Map::new();
        let mut payload = Payload::Files(file_paths);

        for registered in &mut self.nodes {
            let node_params = params.get(&registered.name).cloned().unwrap_or(Value::Null);
            let input_summary = payload.describe();

            debug!(
                "Running {} ({}) with params {}",
                registered.name,
                registered.node.component(),
                node_params
            );
            payload = registered
                .node
                .run(payload, &node_params)
                .map_err(|e| e.context(format!("Pipeline node '{}' failed", registered.name)))?;
            debug!("{} produced {}", registered.name, payload.describe());

            if debug {
                trace.insert(
                    registered.name.clone(),
                    serde_json::json!({
                        "input": input_summary,
                        "params": node_params,
                        "output": payload.describe(),
                    }),
                );
            }
        }

        Ok(PipelineOutput {
            output: payload,
            debug: debug.then_some(Value::Object(trace)),
        })
    }

    fn split_params(&self, params: &Value) -> anyhow::Result<Map<String, Value>> {
        let map = match params {
            Value::Null => return Ok(Map::new()),
            Value::Object(map) => map,
            other => anyhow::bail!("Pipeline params must be an object, got {}", other),
        };

        if let Some(unknown) = map.keys().find(|k| !self.nodes.iter().any(|n| &n.name == *k)) {
            anyhow::bail!(
                "Unknown node '{}' in params (nodes: {})",
                unknown,
                self.node_names().join(", ")
            );
        }
        Ok(map.clone())
    }
}

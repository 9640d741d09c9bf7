//! Export types for handing the analysed network to downstream tools.
//!
//! The visualization renderer reads a node-link JSON document of the filtered
//! subgraph; every node carries the `label` it displays.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::graph::TransmissionGraph;
use crate::table;

/// Exported node with resolved label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeExport {
    /// Narrator id.
    pub id: u64,
    /// Display label; falls back to the id when no name is known.
    pub label: String,
}

/// Exported edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeExport {
    /// Teacher id.
    pub source: u64,
    /// Student id.
    pub target: u64,
    /// How many chains contained this pair.
    pub multiplicity: u32,
}

/// Node-link document of a transmission graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphExport {
    pub directed: bool,
    pub nodes: Vec<NodeExport>,
    pub edges: Vec<EdgeExport>,
}

impl GraphExport {
    pub fn from_graph(graph: &TransmissionGraph) -> Self {
        let nodes = graph
            .node_data()
            .map(|n| NodeExport {
                id: n.id.get(),
                label: n.label.clone().unwrap_or_else(|| n.id.to_string()),
            })
            .collect();
        let edges = graph
            .edges_with_data()
            .map(|(e, data)| EdgeExport {
                source: e.source.get(),
                target: e.target.get(),
                multiplicity: data.multiplicity,
            })
            .collect();
        Self {
            directed: true,
            nodes,
            edges,
        }
    }

    /// Write as pretty-printed JSON, replacing any previous export atomically.
    pub fn save(&self, path: &Path) -> Result<(), PipelineError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| PipelineError::Serialize {
            message: e.to_string(),
        })?;
        table::replace_file(path, json.as_bytes()).map_err(|source| PipelineError::Export {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!(
            path = %path.display(),
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "graph export written"
        );
        Ok(())
    }
}

//! Transmission graph: a simple directed graph of teacher → student edges.
//!
//! - **Structure** ([`TransmissionGraph`]): `petgraph` storage plus an id index
//! - **Analytics** ([`analytics`]): degree counts and random-walk centrality
//!
//! Parallel edges collapse on insertion; how often an edge was seen is kept as
//! auxiliary [`EdgeData::multiplicity`] and never changes the graph's shape.

pub mod analytics;
pub mod index;

use serde::{Deserialize, Serialize};

use crate::person::PersonId;

pub use index::{GraphResult, TransmissionGraph};

/// Node data stored on petgraph nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    /// The narrator this node stands for.
    pub id: PersonId,
    /// Display label, when one has been attached.
    pub label: Option<String>,
}

impl NodeData {
    pub fn new(id: PersonId) -> Self {
        Self { id, label: None }
    }
}

/// Edge data stored on petgraph edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeData {
    /// Number of times this (source, target) pair was inserted.
    pub multiplicity: u32,
}

impl Default for EdgeData {
    fn default() -> Self {
        Self { multiplicity: 1 }
    }
}

//! In-memory transmission graph.
//!
//! Uses `petgraph` for the graph structure and a `HashMap` for O(1) lookups
//! by [`PersonId`].

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::chain::TransmissionEdge;
use crate::error::GraphError;
use crate::person::PersonId;

use super::{EdgeData, NodeData};

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Directed simple graph of narrators.
///
/// Nodes exist only because some edge mentions them (or because they were
/// retained by [`induced_subgraph`](Self::induced_subgraph)). Node and edge
/// iteration follow insertion order, so everything derived from a graph is
/// deterministic for a given input.
#[derive(Clone, Default)]
pub struct TransmissionGraph {
    /// The directed graph: nodes carry NodeData, edges carry EdgeData.
    graph: DiGraph<NodeData, EdgeData>,
    /// PersonId → NodeIndex mapping for O(1) node lookups.
    node_index: HashMap<PersonId, NodeIndex>,
}

impl TransmissionGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from every extracted edge. Zero edges give an empty graph.
    pub fn from_edges(edges: impl IntoIterator<Item = TransmissionEdge>) -> Self {
        let mut g = Self::new();
        for edge in edges {
            g.insert_edge(edge);
        }
        g
    }

    /// Ensure a node exists for the given person, returning its NodeIndex.
    fn ensure_node(&mut self, data: NodeData) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(&data.id) {
            return idx;
        }
        let id = data.id;
        let idx = self.graph.add_node(data);
        self.node_index.insert(id, idx);
        idx
    }

    /// Insert an edge, creating both endpoints if needed.
    ///
    /// Returns `true` if the edge is new. Re-inserting an existing edge leaves
    /// the node and edge sets unchanged and only bumps its multiplicity.
    pub fn insert_edge(&mut self, edge: TransmissionEdge) -> bool {
        let src = self.ensure_node(NodeData::new(edge.source));
        let dst = self.ensure_node(NodeData::new(edge.target));

        match self.graph.find_edge(src, dst) {
            Some(e) => {
                self.graph[e].multiplicity = self.graph[e].multiplicity.saturating_add(1);
                false
            }
            None => {
                self.graph.add_edge(src, dst, EdgeData::default());
                true
            }
        }
    }

    /// Node-induced subgraph over `ids`.
    ///
    /// Ids not present in this graph are ignored. Retained nodes keep their
    /// labels and retained edges keep their multiplicity.
    pub fn induced_subgraph(&self, ids: &HashSet<PersonId>) -> Self {
        let mut sub = Self::new();
        for data in self.graph.node_weights() {
            if ids.contains(&data.id) {
                sub.ensure_node(data.clone());
            }
        }
        for e in self.graph.edge_indices() {
            let Some((a, b)) = self.graph.edge_endpoints(e) else {
                continue;
            };
            let (source, target) = (self.graph[a].id, self.graph[b].id);
            if let (Some(&sa), Some(&sb)) = (sub.node_index.get(&source), sub.node_index.get(&target)) {
                sub.graph.add_edge(sa, sb, self.graph[e]);
            }
        }
        tracing::debug!(
            requested = ids.len(),
            nodes = sub.node_count(),
            edges = sub.edge_count(),
            "induced subgraph"
        );
        sub
    }

    /// Attach display labels to existing nodes. Returns how many were set.
    pub fn set_labels(&mut self, labels: &HashMap<PersonId, String>) -> usize {
        let mut set = 0;
        for (id, &idx) in &self.node_index {
            if let Some(label) = labels.get(id) {
                self.graph[idx].label = Some(label.clone());
                set += 1;
            }
        }
        set
    }

    /// Display label of a node, if any.
    pub fn label(&self, id: PersonId) -> Option<&str> {
        let idx = self.node_index.get(&id)?;
        self.graph[*idx].label.as_deref()
    }

    /// Check if a node exists.
    pub fn has_node(&self, id: PersonId) -> bool {
        self.node_index.contains_key(&id)
    }

    /// Check if the edge `source -> target` exists.
    pub fn has_edge(&self, source: PersonId, target: PersonId) -> bool {
        self.edge_multiplicity(source, target).is_some()
    }

    /// How many times `source -> target` was inserted, or `None` if absent.
    pub fn edge_multiplicity(&self, source: PersonId, target: PersonId) -> Option<u32> {
        let (a, b) = (self.node_index.get(&source)?, self.node_index.get(&target)?);
        let e = self.graph.find_edge(*a, *b)?;
        Some(self.graph[e].multiplicity)
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of distinct edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// All node ids, in insertion order.
    pub fn nodes(&self) -> Vec<PersonId> {
        self.graph.node_weights().map(|d| d.id).collect()
    }

    /// All nodes with their data, in insertion order.
    pub fn node_data(&self) -> impl Iterator<Item = &NodeData> {
        self.graph.node_weights()
    }

    /// All distinct edges, in insertion order.
    pub fn edges(&self) -> Vec<TransmissionEdge> {
        self.edges_with_data().map(|(edge, _)| edge).collect()
    }

    /// All distinct edges with their data, in insertion order.
    pub fn edges_with_data(&self) -> impl Iterator<Item = (TransmissionEdge, EdgeData)> + '_ {
        self.graph.edge_indices().filter_map(|e| {
            let (a, b) = self.graph.edge_endpoints(e)?;
            let edge = TransmissionEdge::new(self.graph[a].id, self.graph[b].id);
            Some((edge, self.graph[e]))
        })
    }

    /// Number of distinct edges into `id`; 0 for absent nodes.
    pub fn in_degree(&self, id: PersonId) -> usize {
        self.degree_in(id, Direction::Incoming)
    }

    /// Number of distinct edges out of `id`; 0 for absent nodes.
    pub fn out_degree(&self, id: PersonId) -> usize {
        self.degree_in(id, Direction::Outgoing)
    }

    fn degree_in(&self, id: PersonId, dir: Direction) -> usize {
        self.node_index
            .get(&id)
            .map(|&idx| self.graph.edges_directed(idx, dir).count())
            .unwrap_or(0)
    }

    /// Access the underlying petgraph.
    pub fn graph(&self) -> &DiGraph<NodeData, EdgeData> {
        &self.graph
    }

    /// NodeIndex of a person, if present.
    pub fn index_of(&self, id: PersonId) -> Option<NodeIndex> {
        self.node_index.get(&id).copied()
    }
}

impl FromIterator<TransmissionEdge> for TransmissionGraph {
    fn from_iter<I: IntoIterator<Item = TransmissionEdge>>(iter: I) -> Self {
        Self::from_edges(iter)
    }
}

impl std::fmt::Debug for TransmissionGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransmissionGraph")
            .field("nodes", &self.node_count())
            .field("edges", &self.edge_count())
            .finish()
    }
}

// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # isnad-net
//!
//! Transmission-chain network analysis. Raw isnad strings become a directed
//! teacher → student graph; degree counts and random-walk centrality are
//! computed over it and merged into a per-narrator metadata table.
//!
//! ## Architecture
//!
//! - **Chains** (`chain`): isnad parsing and edge extraction
//! - **Graph** (`graph`): petgraph-backed simple digraph, induced subgraphs, analytics
//! - **Tables** (`table`, `person`, `metadata`): CSV codec with column contracts
//! - **Pipeline** (`pipeline`): the degree and centrality stages
//!
//! ## Library usage
//!
//! ```
//! use std::collections::HashSet;
//!
//! use isnad_net::chain::{extract_edges, parse_chain};
//! use isnad_net::graph::TransmissionGraph;
//! use isnad_net::graph::analytics::{pagerank, CentralityConfig};
//! use isnad_net::person::PersonId;
//!
//! let chain = parse_chain("1, 2, 3");
//! let graph = TransmissionGraph::from_edges(extract_edges(&chain));
//! assert_eq!(graph.edge_count(), 2);
//!
//! let subset: HashSet<PersonId> = [1, 3].into_iter().filter_map(PersonId::new).collect();
//! let run = pagerank(&graph.induced_subgraph(&subset), &CentralityConfig::default()).unwrap();
//! assert!(run.scores.iter().all(|s| s.score == 0.5));
//! ```

pub mod chain;
pub mod config;
pub mod error;
pub mod export;
pub mod graph;
pub mod metadata;
pub mod person;
pub mod pipeline;
pub mod table;

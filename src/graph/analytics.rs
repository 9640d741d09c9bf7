//! Graph analytics: degree counts and random-walk centrality.
//!
//! All functions operate on a [`TransmissionGraph`] reference. Ranked results
//! are sorted by relevance (score desc, degree desc) with ties broken by id so
//! output is stable across runs.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::person::PersonId;

use super::index::{GraphResult, TransmissionGraph};

// ---------------------------------------------------------------------------
// Degree
// ---------------------------------------------------------------------------

/// In/out edge counts of one node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degree {
    /// Edges targeting the node (its teachers).
    pub in_degree: usize,
    /// Edges sourced from the node (its students).
    pub out_degree: usize,
}

/// Degree of `id` in `graph`. Absent nodes have degree zero.
pub fn degree(graph: &TransmissionGraph, id: PersonId) -> Degree {
    Degree {
        in_degree: graph.in_degree(id),
        out_degree: graph.out_degree(id),
    }
}

/// Degrees for each of `ids`, looked up in `graph`.
pub fn degrees_for(
    graph: &TransmissionGraph,
    ids: impl IntoIterator<Item = PersonId>,
) -> HashMap<PersonId, Degree> {
    ids.into_iter().map(|id| (id, degree(graph, id))).collect()
}

/// Degree centrality metrics for a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegreeCentrality {
    /// The person this measurement belongs to.
    pub id: PersonId,
    /// Number of incoming edges.
    pub in_degree: usize,
    /// Number of outgoing edges.
    pub out_degree: usize,
    /// Total degree (in + out).
    pub total: usize,
}

/// Compute degree centrality for all nodes. Returns sorted by total degree desc.
pub fn degree_centrality(graph: &TransmissionGraph) -> Vec<DegreeCentrality> {
    let mut results: Vec<DegreeCentrality> = graph
        .nodes()
        .into_iter()
        .map(|id| {
            let Degree {
                in_degree,
                out_degree,
            } = degree(graph, id);
            DegreeCentrality {
                id,
                in_degree,
                out_degree,
                total: in_degree + out_degree,
            }
        })
        .collect();
    results.sort_by(|a, b| b.total.cmp(&a.total).then(a.id.cmp(&b.id)));
    results
}

// ---------------------------------------------------------------------------
// PageRank
// ---------------------------------------------------------------------------

/// How centrality scores are scaled after convergence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Scores sum to the node count.
    #[default]
    NodeCount,
    /// Scores sum to 1.
    Probability,
}

/// Parameters of the power iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CentralityConfig {
    /// Probability of following an edge rather than restarting.
    pub damping: f64,
    /// Convergence threshold, per node, on the L1 change between iterates.
    pub tolerance: f64,
    /// Iteration budget; the last iterate is returned if it runs out.
    pub max_iterations: usize,
    /// Scale applied to the converged scores.
    pub normalization: Normalization,
}

impl Default for CentralityConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            tolerance: 1e-6,
            max_iterations: 100,
            normalization: Normalization::NodeCount,
        }
    }
}

impl CentralityConfig {
    /// Reject parameters the iteration cannot work with.
    pub fn validate(&self) -> GraphResult<()> {
        if !(0.0..1.0).contains(&self.damping) {
            return Err(GraphError::InvalidDamping {
                damping: self.damping,
            });
        }
        if !(self.tolerance > 0.0) {
            return Err(GraphError::InvalidTolerance {
                tolerance: self.tolerance,
            });
        }
        if self.max_iterations == 0 {
            return Err(GraphError::ZeroIterations);
        }
        Ok(())
    }
}

/// PageRank score for a single node.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRankScore {
    /// The person this score belongs to.
    pub id: PersonId,
    /// Computed PageRank score.
    pub score: f64,
}

/// Outcome of one centrality computation.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRankRun {
    /// Scores sorted by score desc.
    pub scores: Vec<PageRankScore>,
    /// Iterations performed.
    pub iterations: usize,
    /// Whether the tolerance was reached within the budget.
    pub converged: bool,
}

impl PageRankRun {
    fn empty() -> Self {
        Self {
            scores: Vec::new(),
            iterations: 0,
            converged: true,
        }
    }

    /// Scores keyed by person.
    pub fn to_map(&self) -> HashMap<PersonId, f64> {
        self.scores.iter().map(|s| (s.id, s.score)).collect()
    }

    /// Sum of all scores.
    pub fn total(&self) -> f64 {
        self.scores.iter().map(|s| s.score).sum()
    }
}

/// Compute PageRank scores by power iteration. Returns sorted by score desc.
///
/// Starts from the uniform vector. On every step the rank held by dangling
/// nodes is spread evenly over all nodes, so no mass leaks. Iteration stops
/// once the L1 change drops below `N * tolerance`; otherwise the last iterate
/// is returned with `converged == false`.
///
/// An empty graph gives an empty result and a graph without edges gives
/// `1/N` for every node, whatever the normalization.
pub fn pagerank(graph: &TransmissionGraph, config: &CentralityConfig) -> GraphResult<PageRankRun> {
    config.validate()?;

    let g = graph.graph();
    let n = g.node_count();
    if n == 0 {
        return Ok(PageRankRun::empty());
    }
    let nf = n as f64;

    let ids: Vec<PersonId> = g.node_weights().map(|d| d.id).collect();

    if g.edge_count() == 0 {
        let scores = ids
            .into_iter()
            .map(|id| PageRankScore { id, score: 1.0 / nf })
            .collect();
        return Ok(PageRankRun {
            scores: sorted(scores),
            iterations: 0,
            converged: true,
        });
    }

    let out_degree: Vec<usize> = g
        .node_indices()
        .map(|idx| g.edges_directed(idx, Direction::Outgoing).count())
        .collect();

    let damping = config.damping;
    let teleport = (1.0 - damping) / nf;
    let mut rank = vec![1.0 / nf; n];
    let mut next = vec![0.0; n];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;

        let dangling: f64 = out_degree
            .iter()
            .zip(&rank)
            .filter(|(deg, _)| **deg == 0)
            .map(|(_, r)| r)
            .sum();
        next.fill(teleport + damping * dangling / nf);

        for e in g.edge_references() {
            let src = e.source().index();
            next[e.target().index()] += damping * rank[src] / out_degree[src] as f64;
        }

        let delta: f64 = next.iter().zip(&rank).map(|(a, b)| (a - b).abs()).sum();
        std::mem::swap(&mut rank, &mut next);
        if delta < nf * config.tolerance {
            converged = true;
            break;
        }
    }

    if converged {
        tracing::debug!(iterations, nodes = n, "pagerank converged");
    } else {
        tracing::warn!(
            iterations,
            nodes = n,
            "pagerank did not converge; using last iterate"
        );
    }

    let scale = match config.normalization {
        Normalization::NodeCount => nf,
        Normalization::Probability => 1.0,
    };
    let scores = ids
        .into_iter()
        .zip(rank)
        .map(|(id, r)| PageRankScore { id, score: r * scale })
        .collect();

    Ok(PageRankRun {
        scores: sorted(scores),
        iterations,
        converged,
    })
}

fn sorted(mut scores: Vec<PageRankScore>) -> Vec<PageRankScore> {
    scores.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
    scores
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::chain::TransmissionEdge;

    fn pid(id: u64) -> PersonId {
        PersonId::new(id).unwrap()
    }

    fn graph(edges: &[(u64, u64)]) -> TransmissionGraph {
        edges
            .iter()
            .map(|&(s, t)| TransmissionEdge::new(pid(s), pid(t)))
            .collect()
    }

    fn build_star_graph() -> TransmissionGraph {
        // Hub (1) teaches spokes (2, 3, 4, 5)
        graph(&[(1, 2), (1, 3), (1, 4), (1, 5)])
    }

    #[test]
    fn degree_centrality_hub_highest() {
        let g = build_star_graph();
        let results = degree_centrality(&g);
        assert_eq!(results.len(), 5);
        assert_eq!(results[0].id, pid(1));
        assert_eq!(results[0].out_degree, 4);
        assert_eq!(results[0].in_degree, 0);
        // Spokes tie; broken by id.
        assert_eq!(results[1].id, pid(2));
    }

    #[test]
    fn degree_of_absent_node_is_zero() {
        let g = build_star_graph();
        assert_eq!(degree(&g, pid(77)), Degree::default());
        let empty = TransmissionGraph::new();
        assert_eq!(degree(&empty, pid(1)), Degree::default());
    }

    #[test]
    fn degrees_for_subset() {
        let g = graph(&[(2, 1), (3, 2)]);
        let d = degrees_for(&g, [pid(1), pid(2), pid(3), pid(9)]);
        assert_eq!(d[&pid(1)], Degree { in_degree: 1, out_degree: 0 });
        assert_eq!(d[&pid(2)], Degree { in_degree: 1, out_degree: 1 });
        assert_eq!(d[&pid(3)], Degree { in_degree: 0, out_degree: 1 });
        assert_eq!(d[&pid(9)], Degree::default());
    }

    #[test]
    fn pagerank_sums_to_node_count() {
        let g = graph(&[(1, 2), (2, 3), (3, 1), (3, 4), (5, 4), (4, 6), (6, 6)]);
        let run = pagerank(&g, &CentralityConfig::default()).unwrap();
        assert!(run.converged);
        assert_eq!(run.scores.len(), 6);
        assert!((run.total() - 6.0).abs() < 1e-4, "total = {}", run.total());
    }

    #[test]
    fn pagerank_star_spokes_outrank_hub() {
        let g = build_star_graph();
        let run = pagerank(&g, &CentralityConfig::default()).unwrap();
        let scores = run.to_map();
        for spoke in 2..=5 {
            assert!(scores[&pid(spoke)] > scores[&pid(1)]);
        }
        assert!((run.total() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn pagerank_cycle_is_uniform() {
        let g = graph(&[(1, 2), (2, 3), (3, 1)]);
        let run = pagerank(&g, &CentralityConfig::default()).unwrap();
        for s in &run.scores {
            assert!((s.score - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn dangling_mass_is_redistributed() {
        // 2 has no outgoing edge. Reference values solve the stationary equations
        // x1 = 0.075 + 0.425 * x2, x1 + x2 = 1.
        let g = graph(&[(1, 2)]);
        let config = CentralityConfig {
            normalization: Normalization::Probability,
            ..Default::default()
        };
        let run = pagerank(&g, &config).unwrap();
        let scores = run.to_map();
        assert!((scores[&pid(1)] - 0.350_877_19).abs() < 1e-5);
        assert!((scores[&pid(2)] - 0.649_122_81).abs() < 1e-5);
        assert!((run.total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pagerank_empty_graph() {
        let g = TransmissionGraph::new();
        let run = pagerank(&g, &CentralityConfig::default()).unwrap();
        assert!(run.scores.is_empty());
    }

    #[test]
    fn pagerank_edgeless_graph_is_one_over_n() {
        let g = graph(&[(1, 2), (2, 3)]);
        let sub = g.induced_subgraph(&HashSet::from([pid(1), pid(3)]));
        let run = pagerank(&sub, &CentralityConfig::default()).unwrap();
        assert_eq!(run.scores.len(), 2);
        for s in &run.scores {
            assert_eq!(s.score, 0.5);
        }
    }

    #[test]
    fn non_convergence_returns_last_iterate() {
        let g = graph(&[(1, 2), (1, 3), (3, 2), (2, 4)]);
        let config = CentralityConfig {
            max_iterations: 1,
            tolerance: 1e-12,
            ..Default::default()
        };
        let run = pagerank(&g, &config).unwrap();
        assert!(!run.converged);
        assert_eq!(run.iterations, 1);
        assert_eq!(run.scores.len(), 4);
        assert!((run.total() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let g = build_star_graph();
        let bad_damping = CentralityConfig {
            damping: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            pagerank(&g, &bad_damping),
            Err(GraphError::InvalidDamping { .. })
        ));
        let bad_tol = CentralityConfig {
            tolerance: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            pagerank(&g, &bad_tol),
            Err(GraphError::InvalidTolerance { .. })
        ));
        let zero_iter = CentralityConfig {
            max_iterations: 0,
            ..Default::default()
        };
        assert!(matches!(pagerank(&g, &zero_iter), Err(GraphError::ZeroIterations)));
    }
}

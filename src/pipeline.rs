//! Stage orchestration: records → graph → metrics → metadata table.
//!
//! Two stages share one graph construction:
//!
//! - **degree**: full-graph in/out degree for every row of the metadata table
//! - **centrality**: random-walk centrality over the subgraph induced by the
//!   metadata table's ids
//!
//! The scopes differ on purpose and are kept apart. Every stage checks its
//! inputs up front and computes everything before writing, so a failed run
//! leaves earlier outputs as they were.

use std::path::Path;

use crate::chain::{self, TransmissionEdge};
use crate::config::PipelineConfig;
use crate::error::{IsnadResult, PipelineError};
use crate::export::GraphExport;
use crate::graph::TransmissionGraph;
use crate::graph::analytics::{self, CentralityConfig, PageRankRun};
use crate::metadata::MetadataTable;
use crate::person::PersonTable;

/// The full transmission graph plus how it was obtained.
#[derive(Debug)]
pub struct GraphBuild {
    pub graph: TransmissionGraph,
    /// Records read.
    pub records: usize,
    /// Edges extracted before duplicates collapsed.
    pub extracted_edges: usize,
}

/// What the degree stage did.
#[derive(Debug, Clone, PartialEq)]
pub struct DegreeReport {
    pub rows: usize,
    /// Rows whose narrator appears in the graph.
    pub matched: usize,
    pub nodes: usize,
    pub edges: usize,
    /// Whether the table was seeded from the person table.
    pub seeded: bool,
}

/// What the centrality stage did.
#[derive(Debug, Clone, PartialEq)]
pub struct CentralityReport {
    pub rows: usize,
    /// Rows that received a score.
    pub scored: usize,
    pub subgraph_nodes: usize,
    pub subgraph_edges: usize,
    pub iterations: usize,
    pub converged: bool,
}

/// Fail with every missing path, before anything is read or written.
pub fn check_inputs(paths: &[&Path]) -> Result<(), PipelineError> {
    let missing: Vec<String> = paths
        .iter()
        .filter(|p| !p.exists())
        .map(|p| p.display().to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::MissingInputs { paths: missing })
    }
}

/// Build the full graph from every chain in the record table.
///
/// A record set yielding no edges is reported with a warning and produces an
/// empty graph.
pub fn build_graph(records: &Path) -> IsnadResult<GraphBuild> {
    let chains = chain::load_chains(records)?;
    let edges: Vec<TransmissionEdge> = chain::edges_from_chains(&chains);
    if edges.is_empty() {
        tracing::warn!(
            path = %records.display(),
            records = chains.len(),
            "no edges could be parsed from the record table; continuing with an empty graph"
        );
    }
    let extracted_edges = edges.len();
    let graph = TransmissionGraph::from_edges(edges);
    tracing::info!(
        records = chains.len(),
        extracted_edges,
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "transmission graph built"
    );
    Ok(GraphBuild {
        graph,
        records: chains.len(),
        extracted_edges,
    })
}

/// Merge full-graph degrees into every row of `table`. Returns rows matched.
pub fn apply_degrees(table: &mut MetadataTable, graph: &TransmissionGraph) -> usize {
    let degrees = analytics::degrees_for(graph, table.ids());
    let matched = table
        .rows()
        .iter()
        .filter(|r| graph.has_node(r.narrator_id))
        .count();
    table.merge_degrees(&degrees);
    matched
}

/// Compute centrality on the subgraph induced by `table`'s ids and merge it.
///
/// Returns the labelled subgraph and the centrality run.
pub fn apply_centrality(
    table: &mut MetadataTable,
    graph: &TransmissionGraph,
    config: &CentralityConfig,
) -> IsnadResult<(TransmissionGraph, PageRankRun)> {
    let mut subgraph = graph.induced_subgraph(&table.ids());
    subgraph.set_labels(&table.names());
    let run = analytics::pagerank(&subgraph, config)?;
    table.merge_centrality(&run.to_map());
    Ok((subgraph, run))
}

/// Seed the metadata table from the configured subset of the person table.
pub fn seed_metadata(persons: &PersonTable, config: &PipelineConfig) -> MetadataTable {
    let gender = config.subset.gender();
    let table = MetadataTable::from_persons(persons.with_gender(&gender), persons.attribute_columns());
    tracing::info!(gender = %gender, rows = table.len(), "metadata table seeded from person table");
    table
}

fn degree_stage(config: &PipelineConfig, rebuild: bool, graph: &TransmissionGraph) -> IsnadResult<DegreeReport> {
    let metadata_path = &config.outputs.metadata;
    let seeded = rebuild || !metadata_path.exists();
    let mut table = if seeded {
        seed_metadata(&PersonTable::load(&config.inputs.persons)?, config)
    } else {
        MetadataTable::load(metadata_path)?
    };

    let matched = apply_degrees(&mut table, graph);
    table.save(metadata_path)?;

    Ok(DegreeReport {
        rows: table.len(),
        matched,
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        seeded,
    })
}

fn centrality_stage(config: &PipelineConfig, graph: &TransmissionGraph) -> IsnadResult<CentralityReport> {
    config.centrality.validate()?;
    let mut table = MetadataTable::load(&config.outputs.metadata)?;
    let (subgraph, run) = apply_centrality(&mut table, graph, &config.centrality)?;
    let export = GraphExport::from_graph(&subgraph);

    table.save(&config.outputs.metadata)?;
    export.save(&config.outputs.graph)?;

    let scored = table.rows().iter().filter(|r| r.centrality.is_some()).count();
    Ok(CentralityReport {
        rows: table.len(),
        scored,
        subgraph_nodes: subgraph.node_count(),
        subgraph_edges: subgraph.edge_count(),
        iterations: run.iterations,
        converged: run.converged,
    })
}

/// Degree stage: seed (when `rebuild` or absent) or reload the metadata table,
/// merge full-graph degrees, write it back.
pub fn run_degree_stage(config: &PipelineConfig, rebuild: bool) -> IsnadResult<DegreeReport> {
    check_inputs(&[&config.inputs.persons, &config.inputs.records])?;
    let build = build_graph(&config.inputs.records)?;
    degree_stage(config, rebuild, &build.graph)
}

/// Centrality stage: merge subgraph centrality into the existing metadata
/// table and write the graph export.
pub fn run_centrality_stage(config: &PipelineConfig) -> IsnadResult<CentralityReport> {
    check_inputs(&[&config.inputs.records, &config.outputs.metadata])?;
    let build = build_graph(&config.inputs.records)?;
    centrality_stage(config, &build.graph)
}

/// Both stages in order over a single graph construction.
pub fn run_all(config: &PipelineConfig, rebuild: bool) -> IsnadResult<(DegreeReport, CentralityReport)> {
    check_inputs(&[&config.inputs.persons, &config.inputs.records])?;
    config.centrality.validate()?;
    let build = build_graph(&config.inputs.records)?;
    let degrees = degree_stage(config, rebuild, &build.graph)?;
    let centrality = centrality_stage(config, &build.graph)?;
    Ok((degrees, centrality))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::person::{Attributes, Gender, Person, PersonId};

    fn pid(id: u64) -> PersonId {
        PersonId::new(id).unwrap()
    }

    fn person(id: u64, gender: Gender) -> Person {
        Person {
            id: pid(id),
            name: format!("P{id}"),
            gender,
            attributes: Attributes::new(),
        }
    }

    #[test]
    fn degree_and_centrality_scopes_differ() {
        let persons = PersonTable::from_persons(vec![
            person(1, Gender::Female),
            person(2, Gender::Male),
            person(3, Gender::Female),
        ]);
        let config = PipelineConfig::default();
        let mut table = seed_metadata(&persons, &config);
        assert_eq!(table.ids().len(), 2);

        let graph = TransmissionGraph::from_edges(chain::extract_edges(&chain::parse_chain("1,2,3")));
        assert_eq!(apply_degrees(&mut table, &graph), 2);
        let p1 = table.get(pid(1)).unwrap();
        assert_eq!((p1.teacher_count, p1.student_count), (1, 0));
        let p3 = table.get(pid(3)).unwrap();
        assert_eq!((p3.teacher_count, p3.student_count), (0, 1));

        let (sub, run) = apply_centrality(&mut table, &graph, &config.centrality).unwrap();
        assert_eq!(sub.edge_count(), 0);
        assert_eq!(sub.label(pid(1)), Some("P1"));
        assert_eq!(run.scores.len(), 2);
        assert_eq!(table.get(pid(1)).unwrap().centrality, Some(0.5));
        assert_eq!(table.get(pid(3)).unwrap().centrality, Some(0.5));
    }

    #[test]
    fn narrator_outside_graph_gets_zero_degree_and_no_centrality() {
        let persons = PersonTable::from_persons(vec![person(1, Gender::Female), person(9, Gender::Female)]);
        let config = PipelineConfig::default();
        let mut table = seed_metadata(&persons, &config);
        let graph = TransmissionGraph::from_edges([TransmissionEdge::new(pid(1), pid(1))]);

        assert_eq!(apply_degrees(&mut table, &graph), 1);
        apply_centrality(&mut table, &graph, &config.centrality).unwrap();

        let absent = table.get(pid(9)).unwrap();
        assert_eq!((absent.teacher_count, absent.student_count), (0, 0));
        assert_eq!(absent.centrality, None);
        assert!(table.get(pid(1)).unwrap().centrality.is_some());
    }

    #[test]
    fn check_inputs_lists_all_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let present = dir.path().join("present.csv");
        std::fs::write(&present, "isnad\n").unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");

        assert!(check_inputs(&[&present]).is_ok());
        let err = check_inputs(&[&a, &present, &b]).unwrap_err();
        match err {
            PipelineError::MissingInputs { paths } => assert_eq!(paths.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn record_table_without_edges_builds_empty_graph() {
        let dir = tempfile::TempDir::new().unwrap();
        let records = dir.path().join("hadiths.csv");
        std::fs::write(&records, "id,isnad\n1,\"7\"\n2,none\n").unwrap();

        let build = build_graph(&records).unwrap();
        assert_eq!(build.records, 2);
        assert_eq!(build.extracted_edges, 0);
        assert!(build.graph.is_empty());
    }
}

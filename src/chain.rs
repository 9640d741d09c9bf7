//! Transmission chains (isnads) and the edges they imply.
//!
//! A raw chain field lists narrator ids nearest-transmitter first, original
//! source last. Each adjacent pair becomes a teacher → student edge pointing
//! from the origin side towards the report side.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::person::PersonId;
use crate::table::{Table, TableResult, TableSchema};

/// Delimiter between ids in a raw chain field.
pub const CHAIN_DELIMITER: char = ',';

/// Ordered narrator ids of one report, report-to-origin.
pub type TransmissionChain = Vec<PersonId>;

/// A directed teacher → student relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransmissionEdge {
    /// The transmitter (closer to the origin).
    pub source: PersonId,
    /// The receiver (closer to the report).
    pub target: PersonId,
}

impl TransmissionEdge {
    pub fn new(source: PersonId, target: PersonId) -> Self {
        Self { source, target }
    }
}

impl std::fmt::Display for TransmissionEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// Parse a raw chain field into narrator ids.
///
/// Tokens are trimmed; anything that is not a positive integer literal is
/// dropped without error. Surviving ids keep their relative order.
pub fn parse_chain(raw: &str) -> TransmissionChain {
    raw.split(CHAIN_DELIMITER)
        .filter_map(|token| PersonId::parse(token.trim()))
        .collect()
}

/// Turn a chain into edges: `chain[i + 1] -> chain[i]` for each adjacent pair.
pub fn extract_edges(chain: &[PersonId]) -> Vec<TransmissionEdge> {
    chain
        .windows(2)
        .map(|pair| TransmissionEdge::new(pair[1], pair[0]))
        .collect()
}

/// Columns the record table must carry.
pub const RECORD_SCHEMA: TableSchema = TableSchema {
    table: "record",
    required: &["isnad"],
};

/// Load the record table and parse every chain field, in file order.
pub fn load_chains(path: &Path) -> TableResult<Vec<TransmissionChain>> {
    let table = Table::load(path, &RECORD_SCHEMA)?;
    Ok(chains_from_table(&table))
}

/// Parse the `isnad` column of an already loaded table.
pub fn chains_from_table(table: &Table) -> Vec<TransmissionChain> {
    let Some(col) = table.column("isnad") else {
        return Vec::new();
    };
    table.rows().map(|row| parse_chain(row.get(col))).collect()
}

/// All edges of all chains, in record order.
pub fn edges_from_chains(chains: &[TransmissionChain]) -> Vec<TransmissionEdge> {
    chains.iter().flat_map(|c| extract_edges(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: u64) -> PersonId {
        PersonId::new(id).unwrap()
    }

    fn ids(raw: &[u64]) -> Vec<PersonId> {
        raw.iter().map(|&i| pid(i)).collect()
    }

    #[test]
    fn parse_drops_noise_and_keeps_order() {
        assert_eq!(parse_chain("5, abc, 7"), ids(&[5, 7]));
        assert_eq!(parse_chain(" 12 ,3,, 0, -4, 8x, 9 "), ids(&[12, 3, 9]));
    }

    #[test]
    fn parse_empty_and_garbage() {
        assert!(parse_chain("").is_empty());
        assert!(parse_chain("nan").is_empty());
        assert!(parse_chain(",,,").is_empty());
    }

    #[test]
    fn edges_reverse_chain_direction() {
        let edges = extract_edges(&ids(&[5, 3, 7]));
        assert_eq!(
            edges,
            vec![
                TransmissionEdge::new(pid(3), pid(5)),
                TransmissionEdge::new(pid(7), pid(3)),
            ]
        );
    }

    #[test]
    fn short_chains_yield_no_edges() {
        assert!(extract_edges(&[]).is_empty());
        assert!(extract_edges(&ids(&[4])).is_empty());
    }

    #[test]
    fn repeated_adjacent_id_is_a_self_loop() {
        let edges = extract_edges(&ids(&[2, 2]));
        assert_eq!(edges, vec![TransmissionEdge::new(pid(2), pid(2))]);
    }

    #[test]
    fn chains_from_record_table() {
        let csv = "id,isnad,book\n1,\"1,2,3\",x\n2,,y\n3,\"9, n/a, 8\",z\n";
        let table = Table::parse("record", csv).unwrap();
        let chains = chains_from_table(&table);
        assert_eq!(chains, vec![ids(&[1, 2, 3]), vec![], ids(&[9, 8])]);

        let edges = edges_from_chains(&chains);
        assert_eq!(edges.len(), 3);
        assert_eq!(edges[2], TransmissionEdge::new(pid(8), pid(9)));
    }
}

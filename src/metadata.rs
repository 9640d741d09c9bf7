//! Per-narrator metadata table and the metric merge.
//!
//! The table has a fixed core (`narrator_id, name, teacher_count,
//! student_count, hadith_count`), an ordered bag of pass-through columns, and
//! an optional centrality column. Merging only ever touches metric columns;
//! every other column keeps its value and its position.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::TableError;
use crate::graph::analytics::Degree;
use crate::person::{Attributes, Person, PersonId};
use crate::table::{self, Table, TableResult, TableSchema, csv};

/// Columns the metadata table must carry when it is read back.
pub const METADATA_SCHEMA: TableSchema = TableSchema {
    table: "metadata",
    required: &["narrator_id", "name"],
};

/// Column holding the random-walk centrality score.
pub const CENTRALITY_COLUMN: &str = "pagerank";

const NARRATOR_ID: &str = "narrator_id";
const NAME: &str = "name";
const TEACHER_COUNT: &str = "teacher_count";
const STUDENT_COUNT: &str = "student_count";
const HADITH_COUNT: &str = "hadith_count";

const CORE_COLUMNS: [&str; 5] = [NARRATOR_ID, NAME, TEACHER_COUNT, STUDENT_COUNT, HADITH_COUNT];

/// One narrator's row.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRow {
    pub narrator_id: PersonId,
    pub name: String,
    /// In-degree in the full graph.
    pub teacher_count: usize,
    /// Out-degree in the full graph.
    pub student_count: usize,
    /// Placeholder, always written as 0. Edge multiplicities are available on
    /// the graph but no per-narrator report count is derived from them yet.
    pub hadith_count: usize,
    /// Pass-through columns.
    pub attributes: Attributes,
    /// Centrality in the filtered subgraph; `None` for narrators outside it or
    /// before the centrality pass has run.
    pub centrality: Option<f64>,
}

impl MetadataRow {
    fn cell(&self, column: &str) -> Cow<'_, str> {
        match column {
            NARRATOR_ID => Cow::Owned(self.narrator_id.to_string()),
            NAME => Cow::Borrowed(&self.name),
            TEACHER_COUNT => Cow::Owned(self.teacher_count.to_string()),
            STUDENT_COUNT => Cow::Owned(self.student_count.to_string()),
            HADITH_COUNT => Cow::Owned(self.hadith_count.to_string()),
            CENTRALITY_COLUMN => match self.centrality {
                Some(score) => Cow::Owned(format!("{score:?}")),
                None => Cow::Borrowed(""),
            },
            other => Cow::Borrowed(self.attributes.get(other).unwrap_or("")),
        }
    }
}

/// The persisted metadata table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetadataTable {
    /// Full column layout, in output order.
    columns: Vec<String>,
    rows: Vec<MetadataRow>,
}

impl MetadataTable {
    /// Seed a table from persons, with zeroed metrics.
    ///
    /// `attribute_columns` become pass-through columns after the core ones,
    /// in the order given.
    pub fn from_persons<'a>(
        persons: impl IntoIterator<Item = &'a Person>,
        attribute_columns: &[String],
    ) -> Self {
        let mut columns: Vec<String> = CORE_COLUMNS.iter().map(|c| c.to_string()).collect();
        for c in attribute_columns {
            if !columns.contains(c) && c != CENTRALITY_COLUMN {
                columns.push(c.clone());
            }
        }

        let rows = persons
            .into_iter()
            .map(|p| {
                let mut attributes = Attributes::new();
                for column in &columns[CORE_COLUMNS.len()..] {
                    attributes.insert(column.clone(), p.attributes.get(column).unwrap_or(""));
                }
                MetadataRow {
                    narrator_id: p.id,
                    name: p.name.clone(),
                    teacher_count: 0,
                    student_count: 0,
                    hadith_count: 0,
                    attributes,
                    centrality: None,
                }
            })
            .collect();

        Self { columns, rows }
    }

    /// Load and validate a persisted table.
    pub fn load(path: &Path) -> TableResult<Self> {
        let table = Table::load(path, &METADATA_SCHEMA)?;
        Self::from_table(&table)
    }

    /// Build from an already parsed table.
    ///
    /// Missing count columns read as 0 and are added to the layout; an absent
    /// or empty centrality cell reads as `None`.
    pub fn from_table(table: &Table) -> TableResult<Self> {
        METADATA_SCHEMA.check(table.headers())?;

        let mut columns: Vec<String> = Vec::with_capacity(table.headers().len());
        for h in table.headers() {
            if !columns.contains(h) {
                columns.push(h.clone());
            }
        }
        // A missing core column goes right after the last core column placed so far.
        let mut after: Option<usize> = None;
        for core in CORE_COLUMNS {
            let pos = match columns.iter().position(|c| c == core) {
                Some(pos) => pos,
                None => {
                    let pos = after.map_or(0, |p| p + 1);
                    columns.insert(pos, core.to_string());
                    pos
                }
            };
            after = Some(after.map_or(pos, |a| a.max(pos)));
        }

        let col = |name: &str| table.column(name);
        let (id_col, name_col) = (col(NARRATOR_ID), col(NAME));
        let attribute_columns: Vec<(usize, &String)> = table
            .headers()
            .iter()
            .enumerate()
            .filter(|(i, h)| {
                table.column(h) == Some(*i)
                    && !CORE_COLUMNS.contains(&h.as_str())
                    && h.as_str() != CENTRALITY_COLUMN
            })
            .collect();

        let mut rows = Vec::with_capacity(table.len());
        let mut seen = HashSet::with_capacity(table.len());

        for row in table.rows() {
            let raw_id = id_col.map(|c| row.get(c)).unwrap_or("");
            let narrator_id = PersonId::parse(raw_id.trim()).ok_or_else(|| TableError::InvalidValue {
                column: NARRATOR_ID.into(),
                value: raw_id.into(),
                line: row.line(),
                expected: "a positive integer narrator id".into(),
            })?;
            if !seen.insert(narrator_id) {
                tracing::warn!(line = row.line(), id = %narrator_id, "skipping duplicate metadata row");
                continue;
            }

            let count = |name: &str| -> TableResult<usize> {
                let Some(c) = col(name) else { return Ok(0) };
                let raw = row.get(c).trim();
                if raw.is_empty() {
                    return Ok(0);
                }
                raw.parse().map_err(|_| TableError::InvalidValue {
                    column: name.into(),
                    value: raw.into(),
                    line: row.line(),
                    expected: "a non-negative integer count".into(),
                })
            };

            let centrality = match col(CENTRALITY_COLUMN).map(|c| row.get(c).trim()) {
                None | Some("") => None,
                Some(raw) => Some(raw.parse::<f64>().map_err(|_| TableError::InvalidValue {
                    column: CENTRALITY_COLUMN.into(),
                    value: raw.into(),
                    line: row.line(),
                    expected: "a floating-point score or an empty cell".into(),
                })?),
            };

            let mut attributes = Attributes::new();
            for (c, name) in &attribute_columns {
                attributes.insert((*name).clone(), row.get(*c));
            }

            rows.push(MetadataRow {
                narrator_id,
                name: name_col.map(|c| row.get(c)).unwrap_or("").to_string(),
                teacher_count: count(TEACHER_COUNT)?,
                student_count: count(STUDENT_COUNT)?,
                hadith_count: count(HADITH_COUNT)?,
                attributes,
                centrality,
            });
        }

        Ok(Self { columns, rows })
    }

    /// Overwrite the degree columns. Rows missing from `degrees` get 0.
    ///
    /// Returns how many rows had a computed degree.
    pub fn merge_degrees(&mut self, degrees: &HashMap<PersonId, Degree>) -> usize {
        let mut matched = 0;
        for row in &mut self.rows {
            let d = degrees.get(&row.narrator_id).copied();
            matched += usize::from(d.is_some());
            let d = d.unwrap_or_default();
            row.teacher_count = d.in_degree;
            row.student_count = d.out_degree;
            row.hadith_count = 0;
        }
        matched
    }

    /// Add or overwrite the centrality column. Rows missing from `scores`
    /// get an empty cell.
    ///
    /// Returns how many rows received a score.
    pub fn merge_centrality(&mut self, scores: &HashMap<PersonId, f64>) -> usize {
        if !self.columns.iter().any(|c| c == CENTRALITY_COLUMN) {
            self.columns.push(CENTRALITY_COLUMN.to_string());
        }
        let mut matched = 0;
        for row in &mut self.rows {
            row.centrality = scores.get(&row.narrator_id).copied();
            matched += usize::from(row.centrality.is_some());
        }
        matched
    }

    /// Ids of every row: the demographic subset this table describes.
    pub fn ids(&self) -> HashSet<PersonId> {
        self.rows.iter().map(|r| r.narrator_id).collect()
    }

    /// Display names keyed by id.
    pub fn names(&self) -> HashMap<PersonId, String> {
        self.rows
            .iter()
            .map(|r| (r.narrator_id, r.name.clone()))
            .collect()
    }

    /// Distinct non-empty names in first-seen order.
    pub fn distinct_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .map(|r| r.name.as_str())
            .filter(|n| !n.is_empty() && seen.insert(*n))
            .collect()
    }

    pub fn rows(&self) -> &[MetadataRow] {
        &self.rows
    }

    pub fn get(&self, id: PersonId) -> Option<&MetadataRow> {
        self.rows.iter().find(|r| r.narrator_id == id)
    }

    /// Column layout in output order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_centrality(&self) -> bool {
        self.columns.iter().any(|c| c == CENTRALITY_COLUMN)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as CSV text.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        csv::write_record(&mut out, self.columns.iter().map(String::as_str));
        for row in &self.rows {
            let cells: Vec<Cow<'_, str>> = self.columns.iter().map(|c| row.cell(c)).collect();
            csv::write_record(&mut out, cells.iter().map(|c| c.as_ref()));
        }
        out
    }

    /// Write the table to `path`, replacing it atomically.
    pub fn save(&self, path: &Path) -> TableResult<()> {
        table::write_atomic(path, &self.to_csv())?;
        tracing::info!(path = %path.display(), rows = self.len(), "metadata table written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::person::Gender;

    fn pid(id: u64) -> PersonId {
        PersonId::new(id).unwrap()
    }

    fn person(id: u64, name: &str, death: &str) -> Person {
        let mut attributes = Attributes::new();
        attributes.insert("gender", "female");
        attributes.insert("death", death);
        Person {
            id: pid(id),
            name: name.into(),
            gender: Gender::Female,
            attributes,
        }
    }

    fn seeded() -> MetadataTable {
        let persons = [person(1, "Aisha", "58"), person(3, "Hafsa, bint Umar", "45")];
        MetadataTable::from_persons(&persons, &["gender".into(), "death".into()])
    }

    #[test]
    fn seeded_layout_and_zero_metrics() {
        let t = seeded();
        assert_eq!(
            t.columns(),
            [
                "narrator_id",
                "name",
                "teacher_count",
                "student_count",
                "hadith_count",
                "gender",
                "death"
            ]
        );
        assert_eq!(
            t.to_csv(),
            "narrator_id,name,teacher_count,student_count,hadith_count,gender,death\n\
             1,Aisha,0,0,0,female,58\n\
             3,\"Hafsa, bint Umar\",0,0,0,female,45\n"
        );
    }

    #[test]
    fn degree_merge_defaults_absent_rows_to_zero() {
        let mut t = seeded();
        let degrees = HashMap::from([(pid(1), Degree { in_degree: 2, out_degree: 5 })]);
        assert_eq!(t.merge_degrees(&degrees), 1);

        let aisha = t.get(pid(1)).unwrap();
        assert_eq!((aisha.teacher_count, aisha.student_count, aisha.hadith_count), (2, 5, 0));
        let hafsa = t.get(pid(3)).unwrap();
        assert_eq!((hafsa.teacher_count, hafsa.student_count), (0, 0));
        assert_eq!(hafsa.attributes.get("death"), Some("45"));
    }

    #[test]
    fn centrality_merge_appends_column_and_leaves_gaps_empty() {
        let mut t = seeded();
        assert!(!t.has_centrality());
        assert_eq!(t.merge_centrality(&HashMap::from([(pid(3), 1.25)])), 1);

        assert_eq!(t.columns().last().map(String::as_str), Some(CENTRALITY_COLUMN));
        let csv = t.to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[1].ends_with(",58,"));
        assert!(lines[2].ends_with(",45,1.25"));
    }

    #[test]
    fn merge_is_idempotent() {
        let degrees = HashMap::from([(pid(1), Degree { in_degree: 1, out_degree: 0 })]);
        let scores = HashMap::from([(pid(1), 0.5), (pid(3), 0.5)]);

        let mut t = seeded();
        t.merge_degrees(&degrees);
        t.merge_centrality(&scores);
        let first = t.to_csv();

        let mut reloaded = MetadataTable::from_table(&Table::parse("metadata", &first).unwrap()).unwrap();
        reloaded.merge_degrees(&degrees);
        reloaded.merge_centrality(&scores);
        assert_eq!(reloaded.to_csv(), first);
        assert_eq!(reloaded, t);
    }

    #[test]
    fn load_preserves_unknown_columns_and_their_position() {
        let csv = "narrator_id,notes,name,pagerank,teacher_count,student_count,hadith_count\n\
                   7,\"keep, me\",Umm Salama,,1,2,0\n";
        let mut t = MetadataTable::from_table(&Table::parse("metadata", csv).unwrap()).unwrap();
        assert_eq!(t.get(pid(7)).unwrap().centrality, None);

        t.merge_centrality(&HashMap::from([(pid(7), 0.75)]));
        assert_eq!(
            t.to_csv(),
            "narrator_id,notes,name,pagerank,teacher_count,student_count,hadith_count\n\
             7,\"keep, me\",Umm Salama,0.75,1,2,0\n"
        );
    }

    #[test]
    fn load_fills_missing_count_columns() {
        let csv = "narrator_id,name\n4,Zaynab\n";
        let t = MetadataTable::from_table(&Table::parse("metadata", csv).unwrap()).unwrap();
        assert_eq!(&t.columns()[..5], CORE_COLUMNS);
        assert_eq!(t.get(pid(4)).unwrap().teacher_count, 0);
    }

    #[test]
    fn missing_core_columns_follow_their_predecessor() {
        let csv = "narrator_id,notes,name,death\n4,x,Zaynab,20\n";
        let t = MetadataTable::from_table(&Table::parse("metadata", csv).unwrap()).unwrap();
        assert_eq!(
            t.columns(),
            [
                "narrator_id",
                "notes",
                "name",
                "teacher_count",
                "student_count",
                "hadith_count",
                "death"
            ]
        );

        let csv = "name,narrator_id,student_count\nZaynab,4,0\n";
        let t = MetadataTable::from_table(&Table::parse("metadata", csv).unwrap()).unwrap();
        assert_eq!(
            t.columns(),
            ["name", "narrator_id", "teacher_count", "student_count", "hadith_count"]
        );
    }

    #[test]
    fn load_rejects_bad_values() {
        let bad_id = "narrator_id,name\nabc,X\n";
        let err = MetadataTable::from_table(&Table::parse("metadata", bad_id).unwrap()).unwrap_err();
        assert!(matches!(err, TableError::InvalidValue { line: 2, .. }));

        let bad_count = "narrator_id,name,teacher_count\n1,X,many\n";
        let err = MetadataTable::from_table(&Table::parse("metadata", bad_count).unwrap()).unwrap_err();
        assert!(matches!(err, TableError::InvalidValue { ref column, .. } if column == "teacher_count"));
    }

    #[test]
    fn distinct_names_keep_first_seen_order() {
        let persons = [person(1, "Aisha", "58"), person(2, "Hafsa", "45"), person(5, "Aisha", "")];
        let t = MetadataTable::from_persons(&persons, &[]);
        assert_eq!(t.distinct_names(), vec!["Aisha", "Hafsa"]);
        assert_eq!(t.ids(), HashSet::from([pid(1), pid(2), pid(5)]));
    }
}

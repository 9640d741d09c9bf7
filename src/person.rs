//! Person identities and the person table.
//!
//! Persons are the nodes of the transmission graph. Every narrator is identified
//! by a [`PersonId`]; the rest of the person-table row is kept as a fixed core
//! (name, gender) plus an ordered bag of pass-through [`Attributes`].

use std::collections::{HashMap, HashSet};
use std::num::NonZeroU64;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TableError;
use crate::table::{Table, TableResult, TableSchema};

/// Unique, niche-optimized identifier for a person.
///
/// Uses `NonZeroU64` so that `Option<PersonId>` is the same size as `PersonId`;
/// zero is never a valid narrator id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PersonId(NonZeroU64);

impl PersonId {
    /// Create a `PersonId` from a raw `u64`.
    ///
    /// Returns `None` if `raw` is zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(PersonId)
    }

    /// Parse a token made only of ASCII digits into a positive id.
    ///
    /// Signs, decimal points, embedded spaces, zero and values overflowing
    /// `u64` all yield `None`.
    pub fn parse(token: &str) -> Option<Self> {
        if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        token.parse::<u64>().ok().and_then(Self::new)
    }

    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for PersonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Categorical gender as recorded in the person table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
    /// Any other recorded value, kept verbatim (trimmed).
    Other(String),
}

impl Gender {
    /// Classify a raw table value. Matching is case-insensitive.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "female" => Gender::Female,
            "male" => Gender::Male,
            _ => Gender::Other(trimmed.to_string()),
        }
    }

    /// Canonical string form.
    pub fn as_str(&self) -> &str {
        match self {
            Gender::Female => "female",
            Gender::Male => "male",
            Gender::Other(s) => s,
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered column → value bag for columns the core schema does not model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `column`, if present.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v.as_str())
    }

    /// Set `column`, replacing an existing value in place or appending.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == column) {
            Some(slot) => slot.1 = value,
            None => self.0.push((column, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One narrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub gender: Gender,
    /// Every person-table column except `id`, `displayname` and `name`.
    pub attributes: Attributes,
}

/// Columns the person table must carry. The display name comes from
/// `displayname`, falling back to `name`.
pub const PERSON_SCHEMA: TableSchema = TableSchema {
    table: "person",
    required: &["id", "gender"],
};

const NAME_COLUMNS: [&str; 2] = ["displayname", "name"];

/// All persons loaded from the person table, in file order.
#[derive(Debug, Clone, Default)]
pub struct PersonTable {
    persons: Vec<Person>,
    attribute_columns: Vec<String>,
    index: HashMap<PersonId, usize>,
}

impl PersonTable {
    /// Load and validate the person table at `path`.
    pub fn load(path: &Path) -> TableResult<Self> {
        let table = Table::load(path, &PERSON_SCHEMA)?;
        Self::from_table(&table)
    }

    /// Build from an already parsed table.
    ///
    /// Rows whose id is not a positive integer are skipped with a warning, as
    /// are repeated ids after their first occurrence.
    pub fn from_table(table: &Table) -> TableResult<Self> {
        PERSON_SCHEMA.check(table.headers())?;
        let id_col = require_column(table, &["id"])?;
        let gender_col = require_column(table, &["gender"])?;
        let name_col = require_column(table, &NAME_COLUMNS)?;

        let attribute_columns: Vec<(usize, String)> = table
            .headers()
            .iter()
            .enumerate()
            .filter(|(i, h)| {
                table.column(h) == Some(*i) && h.as_str() != "id" && !NAME_COLUMNS.contains(&h.as_str())
            })
            .map(|(i, h)| (i, h.clone()))
            .collect();

        let mut persons = Vec::with_capacity(table.len());
        let mut index = HashMap::with_capacity(table.len());
        let mut skipped = 0usize;

        for row in table.rows() {
            let Some(id) = PersonId::parse(row.get(id_col).trim()) else {
                tracing::warn!(line = row.line(), value = row.get(id_col), "skipping person row with invalid id");
                skipped += 1;
                continue;
            };
            if index.contains_key(&id) {
                tracing::warn!(line = row.line(), %id, "skipping duplicate person id");
                skipped += 1;
                continue;
            }

            let mut attributes = Attributes::new();
            for (col, name) in &attribute_columns {
                attributes.insert(name.clone(), row.get(*col));
            }

            index.insert(id, persons.len());
            persons.push(Person {
                id,
                name: row.get(name_col).to_string(),
                gender: Gender::parse(row.get(gender_col)),
                attributes,
            });
        }

        tracing::info!(persons = persons.len(), skipped, "person table loaded");
        Ok(Self {
            persons,
            attribute_columns: attribute_columns.into_iter().map(|(_, h)| h).collect(),
            index,
        })
    }

    /// Build directly from persons (used by tests and library callers).
    pub fn from_persons(persons: Vec<Person>) -> Self {
        let mut attribute_columns: Vec<String> = Vec::new();
        for p in &persons {
            for (k, _) in p.attributes.iter() {
                if !attribute_columns.iter().any(|c| c == k) {
                    attribute_columns.push(k.to_string());
                }
            }
        }
        let index = persons.iter().enumerate().map(|(i, p)| (p.id, i)).collect();
        Self {
            persons,
            attribute_columns,
            index,
        }
    }

    pub fn persons(&self) -> &[Person] {
        &self.persons
    }

    pub fn get(&self, id: PersonId) -> Option<&Person> {
        self.index.get(&id).map(|&i| &self.persons[i])
    }

    /// Pass-through column names in person-table order.
    pub fn attribute_columns(&self) -> &[String] {
        &self.attribute_columns
    }

    /// Persons with the given gender, in file order.
    pub fn with_gender<'a>(&'a self, gender: &'a Gender) -> impl Iterator<Item = &'a Person> + 'a {
        self.persons.iter().filter(move |p| &p.gender == gender)
    }

    /// Ids of persons with the given gender.
    pub fn ids_with_gender(&self, gender: &Gender) -> HashSet<PersonId> {
        self.with_gender(gender).map(|p| p.id).collect()
    }

    /// Display names keyed by id.
    pub fn names(&self) -> HashMap<PersonId, String> {
        self.persons.iter().map(|p| (p.id, p.name.clone())).collect()
    }

    pub fn len(&self) -> usize {
        self.persons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }
}

/// Index of the first of `candidates` present in the table.
fn require_column(table: &Table, candidates: &[&str]) -> TableResult<usize> {
    candidates
        .iter()
        .find_map(|c| table.column(c))
        .ok_or_else(|| TableError::MissingColumn {
            table: PERSON_SCHEMA.table.into(),
            column: candidates[0].into(),
            expected: "id, displayname (or name), gender".into(),
        })
}

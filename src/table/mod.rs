//! Tabular interchange: CSV tables with explicit column contracts.
//!
//! Every stage declares the columns it consumes as a [`TableSchema`]; the schema
//! is checked when the table is loaded rather than assumed from a shared path.

pub mod csv;

use std::collections::HashMap;
use std::path::Path;

use crate::error::TableError;

use self::csv::RawRecord;

/// Result type for table operations.
pub type TableResult<T> = std::result::Result<T, TableError>;

/// The columns a stage requires from a table.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    /// Human-readable table name, used in diagnostics.
    pub table: &'static str,
    /// Columns that must be present in the header.
    pub required: &'static [&'static str],
}

impl TableSchema {
    /// Check that every required column appears in `headers`.
    pub fn check(&self, headers: &[String]) -> TableResult<()> {
        for column in self.required {
            if !headers.iter().any(|h| h == column) {
                return Err(TableError::MissingColumn {
                    table: self.table.into(),
                    column: (*column).into(),
                    expected: self.required.join(", "),
                });
            }
        }
        Ok(())
    }
}

/// A parsed CSV table: a header row plus data records.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    columns: HashMap<String, usize>,
    records: Vec<RawRecord>,
}

impl Table {
    /// Parse CSV text. The first record is the header.
    pub fn parse(table: &str, content: &str) -> TableResult<Self> {
        let mut records = csv::parse(content)?.into_iter();
        let header = records.next().ok_or_else(|| TableError::Empty {
            table: table.into(),
        })?;
        let headers: Vec<String> = header.fields.into_iter().map(|h| h.trim().to_string()).collect();
        let mut columns = HashMap::with_capacity(headers.len());
        for (i, h) in headers.iter().enumerate() {
            columns.entry(h.clone()).or_insert(i);
        }
        Ok(Self {
            headers,
            columns,
            records: records.collect(),
        })
    }

    /// Read and parse a table from disk, checking it against `schema`.
    pub fn load(path: &Path, schema: &TableSchema) -> TableResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| TableError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::parse(schema.table, &content)?;
        schema.check(&table.headers)?;
        tracing::debug!(
            path = %path.display(),
            rows = table.len(),
            "loaded {} table",
            schema.table
        );
        Ok(table)
    }

    /// Column names in header order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Index of a column by name (first occurrence).
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over data rows.
    pub fn rows(&self) -> impl Iterator<Item = TableRow<'_>> {
        self.records.iter().map(|record| TableRow { record })
    }
}

/// Borrowed view of one data row.
#[derive(Debug, Clone, Copy)]
pub struct TableRow<'a> {
    record: &'a RawRecord,
}

impl<'a> TableRow<'a> {
    /// Field at `column`; short rows read as empty.
    pub fn get(&self, column: usize) -> &'a str {
        self.record
            .fields
            .get(column)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Line in the source file where this row starts.
    pub fn line(&self) -> usize {
        self.record.line
    }
}

/// Write `content` to `path` via a sibling temp file and rename.
///
/// Either the whole new content lands or the old file is left as it was.
pub fn write_atomic(path: &Path, content: &str) -> TableResult<()> {
    replace_file(path, content.as_bytes()).map_err(|source| TableError::Write {
        path: path.display().to_string(),
        source,
    })
}

/// Replace `path` with `content` through `.<name>.tmp` in the same directory,
/// creating parent directories. The temp file never outlives a failure.
pub fn replace_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".into());
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    let result = std::fs::write(&tmp, content).and_then(|()| std::fs::rename(&tmp, path));
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: TableSchema = TableSchema {
        table: "record",
        required: &["isnad"],
    };

    #[test]
    fn header_and_rows() {
        let table = Table::parse("record", "id, isnad\n1,\"5,3\"\n2\n").unwrap();
        assert_eq!(table.headers(), ["id", "isnad"]);
        assert_eq!(table.len(), 2);
        let col = table.column("isnad").unwrap();
        let values: Vec<&str> = table.rows().map(|r| r.get(col)).collect();
        assert_eq!(values, vec!["5,3", ""]);
    }

    #[test]
    fn empty_content_has_no_header() {
        let err = Table::parse("record", "").unwrap_err();
        assert!(matches!(err, TableError::Empty { .. }));
    }

    #[test]
    fn schema_rejects_missing_column() {
        let table = Table::parse("record", "id,chain\n1,2\n").unwrap();
        let err = SCHEMA.check(table.headers()).unwrap_err();
        assert!(matches!(err, TableError::MissingColumn { ref column, .. } if column == "isnad"));
    }

    #[test]
    fn load_missing_file_reports_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nope.csv");
        let err = Table::load(&path, &SCHEMA).unwrap_err();
        assert!(matches!(err, TableError::Read { .. }));
    }

    #[test]
    fn write_atomic_creates_parent_and_replaces() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("processed").join("meta.csv");
        write_atomic(&path, "a\n1\n").unwrap();
        write_atomic(&path, "a\n2\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\n2\n");
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn write_atomic_failure_keeps_old_content() {
        let dir = tempfile::TempDir::new().unwrap();
        // A directory in place of the target makes the rename fail.
        let path = dir.path().join("meta.csv");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();
        let err = write_atomic(&path, "a\n").unwrap_err();
        assert!(matches!(err, TableError::Write { .. }));
        assert!(path.join("keep").exists());
        assert!(!dir.path().join(".meta.csv.tmp").exists());
    }
}

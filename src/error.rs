//! Rich diagnostic error types for isnad-net.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for isnad-net.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum IsnadError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Pipeline(#[from] PipelineError),
}

// ---------------------------------------------------------------------------
// Table errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TableError {
    #[error("failed to read table: {path}")]
    #[diagnostic(
        code(isnad::table::read),
        help("Check that the file exists, is readable, and is UTF-8 encoded CSV.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write table: {path}")]
    #[diagnostic(
        code(isnad::table::write),
        help(
            "Check that the output directory exists, has write permissions, \
             and that the disk is not full. The previous table was left untouched."
        )
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{table} table is missing required column \"{column}\"")]
    #[diagnostic(
        code(isnad::table::missing_column),
        help("The {table} table must have a header row containing: {expected}.")
    )]
    MissingColumn {
        table: String,
        column: String,
        expected: String,
    },

    #[error("{table} table has no header row")]
    #[diagnostic(
        code(isnad::table::empty),
        help("The first line of a CSV table must name its columns.")
    )]
    Empty { table: String },

    #[error("unterminated quoted field starting on line {line}")]
    #[diagnostic(
        code(isnad::table::unterminated_quote),
        help("A field opened with '\"' is never closed. Check the file for a stray quote.")
    )]
    UnterminatedQuote { line: usize },

    #[error("invalid value \"{value}\" in column \"{column}\" on line {line}")]
    #[diagnostic(
        code(isnad::table::invalid_value),
        help("Expected {expected}.")
    )]
    InvalidValue {
        column: String,
        value: String,
        line: usize,
        expected: String,
    },
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("invalid damping factor {damping}: must be in [0, 1)")]
    #[diagnostic(
        code(isnad::graph::invalid_damping),
        help("The usual damping factor for random-walk centrality is 0.85.")
    )]
    InvalidDamping { damping: f64 },

    #[error("invalid convergence tolerance {tolerance}: must be positive")]
    #[diagnostic(
        code(isnad::graph::invalid_tolerance),
        help("Use a small positive value such as 1e-6.")
    )]
    InvalidTolerance { tolerance: f64 },

    #[error("max_iterations must be at least 1")]
    #[diagnostic(
        code(isnad::graph::zero_iterations),
        help("Set `max_iterations` in the [centrality] section, e.g. 100.")
    )]
    ZeroIterations,
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(isnad::config::read),
        help("Ensure the config file exists, or run `isnad init` to create one.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(isnad::config::parse),
        help("Check the TOML syntax in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to serialize config: {message}")]
    #[diagnostic(code(isnad::config::serialize))]
    Serialize { message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(isnad::config::write),
        help("Ensure you have write permissions to the target directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Pipeline errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    #[error("required input not found: {}", .paths.join(", "))]
    #[diagnostic(
        code(isnad::pipeline::missing_inputs),
        help(
            "Fetch the isnad dataset first, or point [inputs] in the config at it. \
             The centrality stage also needs the metadata table from `isnad metadata`. \
             Nothing was written."
        )
    )]
    MissingInputs { paths: Vec<String> },

    #[error("failed to write graph export: {path}")]
    #[diagnostic(
        code(isnad::pipeline::export),
        help("Ensure the output directory is writable.")
    )]
    Export {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize graph export: {message}")]
    #[diagnostic(code(isnad::pipeline::serialize))]
    Serialize { message: String },
}

/// Convenience alias for functions returning isnad-net results.
pub type IsnadResult<T> = std::result::Result<T, IsnadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_error_converts_to_isnad_error() {
        let err = TableError::Empty {
            table: "person".into(),
        };
        let top: IsnadError = err.into();
        assert!(matches!(top, IsnadError::Table(TableError::Empty { .. })));
    }

    #[test]
    fn graph_error_converts_to_isnad_error() {
        let top: IsnadError = GraphError::ZeroIterations.into();
        assert!(matches!(top, IsnadError::Graph(GraphError::ZeroIterations)));
    }

    #[test]
    fn missing_inputs_lists_every_path() {
        let err = PipelineError::MissingInputs {
            paths: vec!["a.csv".into(), "b.csv".into()],
        };
        let msg = format!("{err}");
        assert!(msg.contains("a.csv"));
        assert!(msg.contains("b.csv"));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = TableError::MissingColumn {
            table: "record".into(),
            column: "isnad".into(),
            expected: "isnad".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("record"));
        assert!(msg.contains("isnad"));
    }
}

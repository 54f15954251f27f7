//! Error types for flatsql.

use thiserror::Error;

/// The main error type for flatsql operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad configuration (config file, driver name, option values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The delimiter literal could not be decoded into a single character.
    #[error("Invalid delimiter: \"{literal}\" ({message})")]
    InvalidDelimiter { literal: String, message: String },

    /// A glob pattern matched no files.
    #[error("No match found: {0}")]
    NoMatchFound(String),

    /// A key/value line without the `key:value` shape.
    #[error("Invalid column at line {line}: '{column}'")]
    InvalidColumn { line: usize, column: String },

    /// An undecodable JSON document.
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// An undecodable YAML document.
    #[error("Invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    /// A malformed TBLN line or definition.
    #[error("Invalid TBLN at line {line}: {message}")]
    InvalidTbln { line: usize, message: String },

    /// CSV decode failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The input produced no rows, so no schema could be inferred.
    #[error("No rows")]
    NoRows,

    /// A table cannot be created without columns.
    #[error("No columns for table {0}")]
    NoColumns(String),

    /// Column names and column types differ in length.
    #[error("Column mismatch: {names} names, {types} types")]
    ColumnMismatch { names: usize, types: usize },

    /// In-memory data whose shape cannot be turned into a table.
    #[error("Unsupported input shape: {0}")]
    UnsupportedShape(String),

    /// Unknown input or output format name.
    #[error("Unknown format: '{0}'")]
    UnknownFormat(String),

    /// Empty SQL statement.
    #[error("No SQL statement")]
    NoStatement,

    /// Connection or transaction failure.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Backing engine failure, tagged with the SQL that caused it.
    #[error("Engine error: {source} [{sql}]")]
    Engine {
        sql: String,
        #[source]
        source: sqlx::Error,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap an engine error with the statement that produced it.
    pub fn engine(sql: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Engine {
            sql: sql.into(),
            source,
        }
    }

    /// Create an invalid delimiter error.
    pub fn delimiter(literal: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDelimiter {
            literal: literal.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for flatsql operations.
pub type Result<T> = std::result::Result<T, Error>;

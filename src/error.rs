//! Error type shared by the loader, encoder, writer and pipeline.

use std::path::PathBuf;

use random_forest::ForestError;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can stop a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input file is missing or is not well-formed delimited text.
    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: csv::Error },
    /// The output file could not be written.
    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: csv::Error },
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid config: {0}")]
    Config(String),
    #[error("{table}: missing column `{column}`")]
    MissingColumn { table: String, column: String },
    #[error("{table}: no data rows")]
    EmptyTable { table: String },
    /// `row` counts data rows from 1, not counting the header.
    #[error("{table}: row {row}, column `{column}` is empty")]
    MissingValue {
        table: String,
        row: usize,
        column: String,
    },
    #[error("{table}: row {row}, column `{column}`: expected a number, got `{value}`")]
    InvalidNumber {
        table: String,
        row: usize,
        column: String,
        value: String,
    },
    #[error("{table}: column `{column}` has category `{value}` that was not seen while fitting")]
    UnseenCategory {
        table: String,
        column: String,
        value: String,
    },
    #[error("Label column `{column}` must hold at most two distinct values, found {found:?}")]
    LabelNotBinary { column: String, found: Vec<String> },
    #[error("Got {ids} identifiers but {labels} predicted labels")]
    LengthMismatch { ids: usize, labels: usize },
    #[error(transparent)]
    Forest(#[from] ForestError),
}

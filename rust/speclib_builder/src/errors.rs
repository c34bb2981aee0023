use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("No RT calibrator available for run {run}")]
    MissingCalibrator { run: String },

    #[error("Malformed fragment list for precursor {transition_group_id}: {reason}")]
    MalformedFragmentList {
        transition_group_id: String,
        reason: String,
    },

    #[error("Invalid reference index: {0}")]
    InvalidReferenceIndex(String),

    #[error("Column {column} not found in {context}")]
    MissingColumn { column: String, context: String },

    #[error("Unable to parse {field} value {value:?} (line {line})")]
    ParseField {
        field: String,
        value: String,
        line: u64,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl BuildError {
    pub(crate) fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        BuildError::Io {
            source,
            path: path.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;

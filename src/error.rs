use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for labelprep operations.
#[derive(Debug, Error)]
pub enum LabelPrepError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse annotation line {line} of {path}: {source}")]
    JsonlParse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write annotations to {path}: {source}")]
    JsonlWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to render report as JSON: {0}")]
    ReportJson(#[source] serde_json::Error),

    #[error("Failed to parse MLTable descriptor {path}: {source}")]
    MltableParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(
        "The length of `file_names` and `labels` don't match: \
         `file_names` got {file_names} elements and `labels` got {labels}"
    )]
    LengthMismatch { file_names: usize, labels: usize },

    #[error("Overlapped mandatory file set: {files:?}")]
    MandatoryOverlap { files: BTreeSet<String> },

    #[error("Invalid split parameters: {message}")]
    InvalidSplitParams { message: String },

    #[error("Boolean value expected, got '{value}'")]
    InvalidFlag { value: String },
}

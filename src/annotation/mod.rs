//! Annotation records and the on-disk corpus layout.
//!
//! A corpus directory holds an `annotations.jsonl` file (one
//! [`AnnotationRecord`] per line) and an `MLTable` descriptor pointing at it.
//!
//! # Example
//!
//! ```
//! use labelprep::annotation::{flatten_rows, AnnotationRecord, BoundingBoxLabel};
//!
//! let records = vec![AnnotationRecord::new(
//!     "/data/images/0.jpg",
//!     vec![
//!         BoundingBoxLabel::new("valve", 0.1, 0.1, 0.2, 0.2),
//!         BoundingBoxLabel::new("pump", 0.5, 0.5, 0.6, 0.6),
//!     ],
//! )];
//!
//! let rows = flatten_rows(&records);
//! assert_eq!(rows.len(), 2);
//! assert!(rows.iter().all(|row| row.file_name == "/data/images/0.jpg"));
//! ```

pub mod io_jsonl;
pub mod mltable;
mod model;

pub use io_jsonl::ANNOTATIONS_FILE_NAME;
pub use mltable::MLTABLE_FILE_NAME;
pub use model::{flatten_rows, unzip_rows, AnnotationRecord, AnnotationRow, BoundingBoxLabel};

use std::fs;
use std::path::Path;

use crate::error::LabelPrepError;

/// Writes a complete corpus directory: `annotations.jsonl` plus `MLTable`.
///
/// The directory is created if it does not exist.
pub fn write_corpus_dir(dir: &Path, records: &[AnnotationRecord]) -> Result<(), LabelPrepError> {
    fs::create_dir_all(dir).map_err(LabelPrepError::Io)?;
    io_jsonl::write_jsonl(&dir.join(ANNOTATIONS_FILE_NAME), records)?;
    mltable::write_mltable(dir, ANNOTATIONS_FILE_NAME)
}

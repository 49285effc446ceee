//! `MLTable` schema descriptor.
//!
//! Every corpus directory carries an `MLTable` file next to its
//! `annotations.jsonl`. Downstream tooling reads it verbatim, so the rendered
//! text must not drift.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::LabelPrepError;

/// File name of the descriptor inside a corpus directory.
pub const MLTABLE_FILE_NAME: &str = "MLTable";

const MLTABLE_TEMPLATE: &str = "paths:\n  - file: ./{file}\ntransformations:\n  - read_json_lines:\n        encoding: utf8\n        invalid_lines: error\n        include_path_column: false\n  - convert_column_types:\n      - columns: image_url\n        column_type: stream_info";

#[derive(Debug, Deserialize)]
struct MlTableDoc {
    #[serde(default)]
    paths: Vec<MlTablePath>,
}

#[derive(Debug, Deserialize)]
struct MlTablePath {
    file: String,
}

/// Renders the descriptor for an annotation file name (no trailing newline).
pub fn render_mltable(file_name: &str) -> String {
    MLTABLE_TEMPLATE.replace("{file}", file_name)
}

/// Writes `<dir>/MLTable` referencing `file_name`.
pub fn write_mltable(dir: &Path, file_name: &str) -> Result<(), LabelPrepError> {
    fs::write(dir.join(MLTABLE_FILE_NAME), render_mltable(file_name)).map_err(LabelPrepError::Io)
}

/// Reads `<dir>/MLTable` and resolves the files it references against `dir`.
pub fn read_mltable_paths(dir: &Path) -> Result<Vec<PathBuf>, LabelPrepError> {
    let path = dir.join(MLTABLE_FILE_NAME);
    let text = fs::read_to_string(&path).map_err(LabelPrepError::Io)?;
    let doc: MlTableDoc =
        serde_yaml::from_str(&text).map_err(|source| LabelPrepError::MltableParse {
            path: path.clone(),
            source,
        })?;

    Ok(doc
        .paths
        .into_iter()
        .map(|entry| dir.join(entry.file.trim_start_matches("./")))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_is_byte_exact() {
        let expected = "paths:\n\
                        \x20 - file: ./annotations.jsonl\n\
                        transformations:\n\
                        \x20 - read_json_lines:\n\
                        \x20       encoding: utf8\n\
                        \x20       invalid_lines: error\n\
                        \x20       include_path_column: false\n\
                        \x20 - convert_column_types:\n\
                        \x20     - columns: image_url\n\
                        \x20       column_type: stream_info";
        assert_eq!(render_mltable("annotations.jsonl"), expected);
        assert!(!render_mltable("annotations.jsonl").ends_with('\n'));
    }

    #[test]
    fn written_descriptor_resolves_back_to_its_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_mltable(temp.path(), "annotations.jsonl").expect("write");

        let paths = read_mltable_paths(temp.path()).expect("read");
        assert_eq!(paths, vec![temp.path().join("annotations.jsonl")]);
    }

    #[test]
    fn malformed_descriptor_is_reported() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join(MLTABLE_FILE_NAME), "paths: [\n").expect("write");

        assert!(matches!(
            read_mltable_paths(temp.path()),
            Err(LabelPrepError::MltableParse { .. })
        ));
    }
}

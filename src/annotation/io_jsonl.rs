//! JSON-lines reading and writing for annotation records.
//!
//! A corpus file holds one [`AnnotationRecord`] per line. Writers always
//! terminate every record with `\n`, including the last one.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::model::AnnotationRecord;
use crate::error::LabelPrepError;

/// File name of the annotation corpus inside a dataset directory.
pub const ANNOTATIONS_FILE_NAME: &str = "annotations.jsonl";

/// Parses a single JSON-lines entry.
pub fn parse_record_line(line: &str) -> Result<AnnotationRecord, serde_json::Error> {
    serde_json::from_str(line)
}

/// Parses a single JSON-lines entry from raw bytes.
///
/// Invalid UTF-8 is reported as a JSON error, like any other malformed input.
pub fn parse_record_bytes(line: &[u8]) -> Result<AnnotationRecord, serde_json::Error> {
    serde_json::from_slice(line)
}

/// Parses every non-blank line of a byte buffer.
///
/// Stops at the first malformed line. Useful for fuzzing and in-memory tests.
pub fn from_jsonl_slice(bytes: &[u8]) -> Result<Vec<AnnotationRecord>, serde_json::Error> {
    serde_json::Deserializer::from_slice(bytes)
        .into_iter::<AnnotationRecord>()
        .collect()
}

/// Renders records as JSON lines, each terminated by `\n`.
pub fn to_jsonl_string(records: &[AnnotationRecord]) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    Ok(out)
}

/// Reads every record of a JSON-lines file.
///
/// Blank lines are ignored. Any malformed line is an error naming the file and
/// the 1-based line number.
pub fn read_jsonl(path: &Path) -> Result<Vec<AnnotationRecord>, LabelPrepError> {
    let file = File::open(path).map_err(LabelPrepError::Io)?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (line_idx, line_res) in reader.lines().enumerate() {
        let line = line_res.map_err(LabelPrepError::Io)?;
        if line.trim().is_empty() {
            continue;
        }

        let record = parse_record_line(&line).map_err(|source| LabelPrepError::JsonlParse {
            path: path.to_path_buf(),
            line: line_idx + 1,
            source,
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Writes records to `path` as JSON lines, replacing any existing file.
pub fn write_jsonl(path: &Path, records: &[AnnotationRecord]) -> Result<(), LabelPrepError> {
    let file = File::create(path).map_err(LabelPrepError::Io)?;
    let mut writer = BufWriter::new(file);

    for record in records {
        serde_json::to_writer(&mut writer, record).map_err(|source| {
            LabelPrepError::JsonlWrite {
                path: path.to_path_buf(),
                source,
            }
        })?;
        writeln!(&mut writer).map_err(LabelPrepError::Io)?;
    }

    writer.flush().map_err(LabelPrepError::Io)?;
    Ok(())
}

/// Lists the `*.jsonl` files directly inside `dir`, sorted by path.
///
/// Subdirectories are not searched. A missing or unreadable `dir` is an I/O
/// error.
pub fn list_jsonl_files(dir: &Path) -> Result<Vec<PathBuf>, LabelPrepError> {
    // Surface a missing root as the plain io::Error rather than a walk error.
    fs::read_dir(dir).map_err(LabelPrepError::Io)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.map_err(|source| LabelPrepError::Io(source.into()))?;
        if entry.file_type().is_file() && has_jsonl_extension(entry.path()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

/// Reads and concatenates every `*.jsonl` file directly inside `dir`.
pub fn read_jsonl_dir(dir: &Path) -> Result<Vec<AnnotationRecord>, LabelPrepError> {
    let mut records = Vec::new();
    for path in list_jsonl_files(dir)? {
        records.extend(read_jsonl(&path)?);
    }
    Ok(records)
}

fn has_jsonl_extension(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("jsonl")
}

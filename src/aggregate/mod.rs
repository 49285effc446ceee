//! Annotation aggregation.
//!
//! Merges the per-source `*.jsonl` label files of a directory into one
//! corpus, pointing every `image_url` at `<absolute_prefix>/<basename>`, and
//! writes it out as `annotations.jsonl` plus an `MLTable` descriptor.
//!
//! A malformed line is logged and skipped; the rest of the file still counts.
//! Missing directories and permission problems are returned as I/O errors.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;

use crate::annotation::io_jsonl::{list_jsonl_files, parse_record_bytes};
use crate::annotation::{write_corpus_dir, AnnotationRecord, ANNOTATIONS_FILE_NAME};
use crate::error::LabelPrepError;
use crate::paths::{basename, join_reference};

/// Number of records kept when fast training is enabled.
pub const FAST_TRAINING_RECORD_LIMIT: usize = 20;

/// Aggregation settings.
#[derive(Clone, Debug)]
pub struct AggregateOptions {
    /// Directory holding the images. Recorded for provenance; never read.
    pub image_dir: PathBuf,
    /// Directory holding the per-source `*.jsonl` label files.
    pub label_dir: PathBuf,
    /// Prefix substituted in front of every image basename.
    pub absolute_prefix: String,
    /// Directory receiving `annotations.jsonl` and `MLTable`.
    pub output_dir: PathBuf,
    /// Keep only the first [`FAST_TRAINING_RECORD_LIMIT`] records.
    pub is_fast_training: bool,
}

/// Counts from an aggregation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AggregateReport {
    /// Label files opened.
    pub files_read: usize,
    /// Records kept in the corpus.
    pub records: usize,
    /// Lines that failed to parse and were dropped.
    pub lines_skipped: usize,
}

/// Builds one annotation corpus out of many label files.
#[derive(Debug)]
pub struct Aggregator {
    opts: AggregateOptions,
    records: Vec<AnnotationRecord>,
    report: AggregateReport,
}

impl Aggregator {
    pub fn new(opts: AggregateOptions) -> Self {
        Self {
            opts,
            records: Vec::new(),
            report: AggregateReport::default(),
        }
    }

    /// Records collected by the last [`Aggregator::aggregate`] call.
    pub fn records(&self) -> &[AnnotationRecord] {
        &self.records
    }

    /// Reads every label file and collects the rewritten records.
    ///
    /// Calling this again starts over from an empty corpus.
    pub fn aggregate(&mut self) -> Result<&AggregateReport, LabelPrepError> {
        self.records.clear();
        self.report = AggregateReport::default();
        info!(
            "aggregating label files from {}",
            self.opts.label_dir.display()
        );

        for path in list_jsonl_files(&self.opts.label_dir)? {
            self.report.files_read += 1;
            if self.read_label_file(&path)? {
                info!(
                    "fast training: stopping after {} records",
                    FAST_TRAINING_RECORD_LIMIT
                );
                break;
            }
        }

        self.report.records = self.records.len();
        Ok(&self.report)
    }

    /// Reads one file; returns `true` once the fast-training limit is hit.
    ///
    /// Lines are split on raw bytes so that a line with invalid UTF-8 is
    /// skipped like any other malformed line. Read failures stay fatal.
    fn read_label_file(&mut self, path: &Path) -> Result<bool, LabelPrepError> {
        let file = File::open(path).map_err(LabelPrepError::Io)?;
        let reader = BufReader::new(file);

        for (line_idx, line_res) in reader.split(b'\n').enumerate() {
            let raw = line_res.map_err(LabelPrepError::Io)?;
            let line = raw.strip_suffix(b"\r").unwrap_or(&raw[..]);
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            match self.rewrite_line(line) {
                Ok(record) => self.records.push(record),
                Err(err) => {
                    warn!(
                        "skipping line {} of {}: {}",
                        line_idx + 1,
                        path.display(),
                        err
                    );
                    self.report.lines_skipped += 1;
                    continue;
                }
            }

            if self.opts.is_fast_training && self.records.len() == FAST_TRAINING_RECORD_LIMIT {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Parses one label line and points its image at the absolute prefix.
    pub fn rewrite_line(&self, line: &[u8]) -> Result<AnnotationRecord, serde_json::Error> {
        let mut record = parse_record_bytes(line)?;
        rewrite_image_reference(&mut record, &self.opts.absolute_prefix);
        Ok(record)
    }

    /// Writes `annotations.jsonl` and `MLTable` into the output directory.
    ///
    /// Returns the path of the written annotation file.
    pub fn write(&self) -> Result<PathBuf, LabelPrepError> {
        write_corpus_dir(&self.opts.output_dir, &self.records)?;
        let path = self.opts.output_dir.join(ANNOTATIONS_FILE_NAME);
        info!("wrote {} records to {}", self.records.len(), path.display());
        Ok(path)
    }

    /// Aggregates and writes in one go.
    pub fn run(mut self) -> Result<AggregateReport, LabelPrepError> {
        self.aggregate()?;
        self.write()?;
        Ok(self.report)
    }
}

/// Replaces a record's image reference with `<prefix>/<basename>`.
pub fn rewrite_image_reference(record: &mut AnnotationRecord, prefix: &str) {
    let rewritten = join_reference(prefix, basename(&record.image_reference));
    record.image_reference = rewritten;
}

/// Fuzz-only entrypoint for the per-line aggregation path.
#[cfg(feature = "fuzzing")]
pub fn fuzz_rewrite_label_line(input: &[u8]) -> Result<(), LabelPrepError> {
    let mut record = parse_record_bytes(input).map_err(|source| LabelPrepError::JsonlParse {
        path: PathBuf::from("<fuzz>"),
        line: 1,
        source,
    })?;
    let original = record.image_reference.clone();
    rewrite_image_reference(&mut record, "/mnt/images");
    let _ = crate::paths::get_file_paths(
        &[original],
        &[record.image_reference],
        &crate::paths::MatchOptions::default(),
    );
    Ok(())
}

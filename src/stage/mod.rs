//! The train/validation split stage.
//!
//! Reads an aggregated corpus directory and writes two corpus directories,
//! each with its own `annotations.jsonl` and `MLTable`. With stratified
//! splitting disabled, the whole input goes to training and validation gets an
//! empty corpus.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::Serialize;

use crate::annotation::io_jsonl::{read_jsonl_dir, write_jsonl};
use crate::annotation::mltable::write_mltable;
use crate::annotation::{
    flatten_rows, unzip_rows, write_corpus_dir, AnnotationRecord, ANNOTATIONS_FILE_NAME,
};
use crate::error::LabelPrepError;
use crate::split::{stratified_group_split, SplitOptions, SplitResult};
use crate::stats::{class_distribution, ClassDistribution};

/// Split stage settings.
#[derive(Clone, Debug)]
pub struct StageOptions {
    /// Use the stratified group splitter; otherwise copy everything to train.
    pub use_stratified_split: bool,
    pub split: SplitOptions,
}

impl Default for StageOptions {
    fn default() -> Self {
        Self {
            use_stratified_split: true,
            split: SplitOptions::default(),
        }
    }
}

/// What the stage produced.
#[derive(Clone, Debug, Default, Serialize)]
pub struct StageOutcome {
    pub stratified: bool,
    /// Files copied verbatim into the training directory (fallback mode).
    pub copied_files: usize,
    pub train_records: usize,
    pub val_records: usize,
    /// Records dropped because they carry no boxes to stratify on.
    pub unlabeled_records: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split: Option<SplitResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<ClassDistribution>,
}

/// Parses a `;`-separated list of file names such as `"32.jpg;33.jpg"`.
///
/// Whitespace around entries is trimmed and empty entries are dropped.
pub fn parse_mandatory_list(list: &str) -> Vec<String> {
    list.split(';')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Runs the split stage from `input_dir` into `train_dir` and `val_dir`.
pub fn split_corpus_dir(
    input_dir: &Path,
    train_dir: &Path,
    val_dir: &Path,
    opts: &StageOptions,
) -> Result<StageOutcome, LabelPrepError> {
    info!("use_stratified_split={}", opts.use_stratified_split);
    if opts.use_stratified_split {
        split_stratified(input_dir, train_dir, val_dir, &opts.split)
    } else {
        copy_all_to_train(input_dir, train_dir, val_dir)
    }
}

fn split_stratified(
    input_dir: &Path,
    train_dir: &Path,
    val_dir: &Path,
    opts: &SplitOptions,
) -> Result<StageOutcome, LabelPrepError> {
    let records = read_jsonl_dir(input_dir)?;
    let (file_names, labels) = unzip_rows(flatten_rows(&records));
    let result = stratified_group_split(&file_names, &labels, opts)?;

    let unlabeled_records = records.iter().filter(|r| r.labels.is_empty()).count();
    if unlabeled_records > 0 {
        warn!("{unlabeled_records} record(s) without boxes are left out of both splits");
    }

    let train = select_records(&records, &result.train_files);
    let val = select_records(&records, &result.val_files);

    write_corpus_dir(train_dir, &train)?;
    write_corpus_dir(val_dir, &val)?;

    let distribution = class_distribution(&train, &val);
    info!("{distribution}");

    Ok(StageOutcome {
        stratified: true,
        copied_files: 0,
        train_records: train.len(),
        val_records: val.len(),
        unlabeled_records,
        split: Some(result),
        distribution: Some(distribution),
    })
}

/// Records whose image is listed, in corpus order.
fn select_records(records: &[AnnotationRecord], files: &[String]) -> Vec<AnnotationRecord> {
    let wanted: HashSet<&str> = files.iter().map(String::as_str).collect();
    records
        .iter()
        .filter(|record| wanted.contains(record.image_reference.as_str()))
        .cloned()
        .collect()
}

fn copy_all_to_train(
    input_dir: &Path,
    train_dir: &Path,
    val_dir: &Path,
) -> Result<StageOutcome, LabelPrepError> {
    fs::create_dir_all(train_dir).map_err(LabelPrepError::Io)?;

    let mut copied_files = 0;
    for entry in fs::read_dir(input_dir).map_err(LabelPrepError::Io)? {
        let entry = entry.map_err(LabelPrepError::Io)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        fs::copy(&path, train_dir.join(entry.file_name())).map_err(LabelPrepError::Io)?;
        copied_files += 1;
    }

    fs::create_dir_all(val_dir).map_err(LabelPrepError::Io)?;
    write_jsonl(&val_dir.join(ANNOTATIONS_FILE_NAME), &[])?;
    write_mltable(val_dir, ANNOTATIONS_FILE_NAME)?;

    Ok(StageOutcome {
        stratified: false,
        copied_files,
        ..Default::default()
    })
}

//! Stratified, grouped train/validation splitting.
//!
//! The splitter works on box-level rows: `file_names[i]` is the image that
//! box `i` was drawn on and `labels[i]` is its class. Images are assigned
//! whole to one side, class proportions are kept as even as possible, caller
//! supplied "must train" / "must validate" lists are honored, and classes that
//! end up on only one side are corrected:
//!
//! 1. Fold 0 of a [`StratifiedGroupKFold`] over the rows becomes the initial
//!    validation side; every other fold is training.
//! 2. Mandatory files are forced onto their side.
//! 3. Classes seen on only one side are the *rare classes*.
//! 4. Classes seen only in validation are moved, with every file carrying
//!    them, into training.
//! 5. With `add_rare_to_val`, every file carrying a rare class is also copied
//!    into validation, so such a file is listed on both sides.

pub mod kfold;

pub use kfold::StratifiedGroupKFold;

use std::collections::{BTreeSet, HashSet};

use log::{info, warn};
use serde::Serialize;

use crate::error::LabelPrepError;
use crate::paths::{basename, get_file_paths, MatchOptions};

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 33;

/// Default number of folds; the nominal validation fraction is `1 / n_splits`.
pub const DEFAULT_N_SPLITS: usize = 5;

/// Splitting options.
#[derive(Clone, Debug)]
pub struct SplitOptions {
    /// Number of folds. Fold 0 seeds the validation side.
    pub n_splits: usize,
    /// Copy files carrying a rare class into validation as well.
    pub add_rare_to_val: bool,
    /// Files that must be in training and not in validation.
    pub mandatory_train_filenames: Vec<String>,
    /// Files that must be in validation and not in training.
    pub mandatory_val_filenames: Vec<String>,
    /// Shuffle seed for the fold assignment.
    pub seed: u64,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            n_splits: DEFAULT_N_SPLITS,
            add_rare_to_val: true,
            mandatory_train_filenames: Vec::new(),
            mandatory_val_filenames: Vec::new(),
            seed: DEFAULT_SEED,
        }
    }
}

/// Outcome of a split.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SplitResult {
    /// Unique training file names, sorted.
    pub train_files: Vec<String>,
    /// Unique validation file names, sorted.
    pub val_files: Vec<String>,
    /// Classes that were present on only one side before correction.
    pub rare_classes: BTreeSet<String>,
}

impl SplitResult {
    /// File names listed on both sides (rare-class promotion).
    pub fn overlap(&self) -> Vec<String> {
        let val: HashSet<&str> = self.val_files.iter().map(String::as_str).collect();
        self.train_files
            .iter()
            .filter(|name| val.contains(name.as_str()))
            .cloned()
            .collect()
    }
}

/// Validates split inputs before any work is done.
pub fn validate_split_inputs<F, L>(
    file_names: &[F],
    labels: &[L],
    opts: &SplitOptions,
) -> Result<(), LabelPrepError>
where
    F: AsRef<str>,
    L: AsRef<str>,
{
    if file_names.len() != labels.len() {
        return Err(LabelPrepError::LengthMismatch {
            file_names: file_names.len(),
            labels: labels.len(),
        });
    }

    // Mandatory names are matched by basename, so overlap is too.
    let mandatory_train: BTreeSet<&str> = opts
        .mandatory_train_filenames
        .iter()
        .map(|name| basename(name))
        .collect();
    let overlapped: BTreeSet<String> = opts
        .mandatory_val_filenames
        .iter()
        .map(|name| basename(name))
        .filter(|name| mandatory_train.contains(name))
        .map(str::to_string)
        .collect();
    if !overlapped.is_empty() {
        return Err(LabelPrepError::MandatoryOverlap { files: overlapped });
    }

    if opts.n_splits < 2 {
        return Err(LabelPrepError::InvalidSplitParams {
            message: format!("n_splits must be at least 2, got {}", opts.n_splits),
        });
    }

    Ok(())
}

/// Splits box-level rows into training and validation file names.
///
/// # Errors
/// Fails before doing any work when `file_names` and `labels` differ in
/// length, when the mandatory lists intersect, or when `n_splits < 2`.
pub fn stratified_group_split<F, L>(
    file_names: &[F],
    labels: &[L],
    opts: &SplitOptions,
) -> Result<SplitResult, LabelPrepError>
where
    F: AsRef<str>,
    L: AsRef<str>,
{
    validate_split_inputs(file_names, labels, opts)?;

    let names: Vec<&str> = file_names.iter().map(AsRef::as_ref).collect();
    let classes: Vec<&str> = labels.iter().map(AsRef::as_ref).collect();

    let kfold = StratifiedGroupKFold::new(opts.n_splits, opts.seed)?;
    let folds = kfold.assign_folds(&names, &classes);
    let mut in_val: Vec<bool> = folds.iter().map(|&fold| fold == 0).collect();
    let mut in_train: Vec<bool> = in_val.iter().map(|v| !v).collect();

    let file_name_set: Vec<&str> = names
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if !opts.mandatory_train_filenames.is_empty() {
        let matched = get_file_paths(
            &opts.mandatory_train_filenames,
            &file_name_set,
            &MatchOptions::exact(),
        );
        info!("mandatory training files matched: {matched:?}");
        let matched: HashSet<&str> = matched.iter().map(String::as_str).collect();
        for (idx, name) in names.iter().enumerate() {
            if matched.contains(name) {
                in_train[idx] = true;
                in_val[idx] = false;
            }
        }
    }

    if !opts.mandatory_val_filenames.is_empty() {
        let matched = get_file_paths(
            &opts.mandatory_val_filenames,
            &file_name_set,
            &MatchOptions::exact(),
        );
        info!("mandatory validation files matched: {matched:?}");
        let matched: HashSet<&str> = matched.iter().map(String::as_str).collect();
        for (idx, name) in names.iter().enumerate() {
            if matched.contains(name) {
                in_val[idx] = true;
                in_train[idx] = false;
            }
        }
    }

    let train_classes = classes_where(&classes, &in_train);
    let val_classes = classes_where(&classes, &in_val);
    let rare_in_train: BTreeSet<&str> = train_classes.difference(&val_classes).copied().collect();
    let rare_in_val: BTreeSet<&str> = val_classes.difference(&train_classes).copied().collect();
    let rare_classes: BTreeSet<&str> = rare_in_train.union(&rare_in_val).copied().collect();

    if !rare_in_train.is_empty() {
        warn!("rare classes in training: {rare_in_train:?}");
    }

    // Rare, but the fold assignment can leave a class with validation rows only.
    if !rare_in_val.is_empty() {
        warn!(
            "validation has classes missing from training: {rare_in_val:?}; shifting their files to training"
        );
        let shifted = files_carrying(&names, &classes, &rare_in_val);
        for (idx, name) in names.iter().enumerate() {
            if shifted.contains(name) {
                in_val[idx] = false;
                in_train[idx] = true;
            }
        }
    }

    if opts.add_rare_to_val && !rare_classes.is_empty() {
        let promoted = files_carrying(&names, &classes, &rare_classes);
        for (idx, name) in names.iter().enumerate() {
            if promoted.contains(name) {
                in_val[idx] = true;
            }
        }
    }

    Ok(SplitResult {
        train_files: files_where(&names, &in_train),
        val_files: files_where(&names, &in_val),
        rare_classes: rare_classes.into_iter().map(str::to_string).collect(),
    })
}

fn classes_where<'a>(classes: &[&'a str], mask: &[bool]) -> BTreeSet<&'a str> {
    classes
        .iter()
        .zip(mask)
        .filter(|(_, keep)| **keep)
        .map(|(class, _)| *class)
        .collect()
}

fn files_where(names: &[&str], mask: &[bool]) -> Vec<String> {
    names
        .iter()
        .zip(mask)
        .filter(|(_, keep)| **keep)
        .map(|(name, _)| *name)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Every file that has at least one box of a class in `wanted`.
fn files_carrying<'a>(
    names: &[&'a str],
    classes: &[&str],
    wanted: &BTreeSet<&str>,
) -> HashSet<&'a str> {
    names
        .iter()
        .zip(classes)
        .filter(|(_, class)| wanted.contains(*class))
        .map(|(name, _)| *name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels_of(files: &[String], file_names: &[&str], labels: &[&str]) -> BTreeSet<String> {
        let wanted: HashSet<&str> = files.iter().map(String::as_str).collect();
        file_names
            .iter()
            .zip(labels)
            .filter(|(name, _)| wanted.contains(*name))
            .map(|(_, label)| label.to_string())
            .collect()
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let err = stratified_group_split(&["0.jpg", "1.jpg"], &["A"], &SplitOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            LabelPrepError::LengthMismatch {
                file_names: 2,
                labels: 1
            }
        ));
    }

    #[test]
    fn overlapping_mandatory_lists_are_rejected() {
        let opts = SplitOptions {
            mandatory_train_filenames: vec!["0.jpg".into(), "1.jpg".into()],
            mandatory_val_filenames: vec!["1.jpg".into()],
            ..Default::default()
        };
        match stratified_group_split(&["0.jpg", "1.jpg"], &["A", "A"], &opts) {
            Err(LabelPrepError::MandatoryOverlap { files }) => {
                assert_eq!(files.into_iter().collect::<Vec<_>>(), vec!["1.jpg"]);
            }
            other => panic!("expected overlap error, got {other:?}"),
        }
    }

    #[test]
    fn mandatory_overlap_is_checked_by_basename() {
        let opts = SplitOptions {
            mandatory_train_filenames: vec!["x/1.jpg".into()],
            mandatory_val_filenames: vec!["1.jpg".into(), "2.jpg".into()],
            ..Default::default()
        };
        let file_names = ["/d/0.jpg", "/d/1.jpg", "/d/2.jpg"];
        match stratified_group_split(&file_names, &["A", "A", "A"], &opts) {
            Err(LabelPrepError::MandatoryOverlap { files }) => {
                assert_eq!(files.into_iter().collect::<Vec<_>>(), vec!["1.jpg"]);
            }
            other => panic!("expected overlap error, got {other:?}"),
        }
    }

    #[test]
    fn single_fold_is_rejected() {
        let opts = SplitOptions {
            n_splits: 1,
            ..Default::default()
        };
        assert!(matches!(
            stratified_group_split(&["0.jpg"], &["A"], &opts),
            Err(LabelPrepError::InvalidSplitParams { .. })
        ));
    }

    #[test]
    fn class_only_on_one_image_is_evaluable_on_both_sides() {
        let file_names = ["0.jpg", "0.jpg", "1.jpg", "2.jpg"];
        let labels = ["A", "B", "A", "A"];
        let result = stratified_group_split(&file_names, &labels, &SplitOptions::default())
            .expect("split");

        assert!(result.train_files.contains(&"0.jpg".to_string()));
        assert!(labels_of(&result.train_files, &file_names, &labels).contains("B"));
        assert!(labels_of(&result.val_files, &file_names, &labels).contains("B"));

        let covered: BTreeSet<&str> = result
            .train_files
            .iter()
            .chain(&result.val_files)
            .map(String::as_str)
            .collect();
        assert_eq!(covered, ["0.jpg", "1.jpg", "2.jpg"].into_iter().collect());
    }

    #[test]
    fn without_promotion_sides_are_disjoint() {
        let file_names = ["0.jpg", "0.jpg", "1.jpg", "2.jpg"];
        let labels = ["A", "B", "A", "A"];
        let opts = SplitOptions {
            add_rare_to_val: false,
            ..Default::default()
        };
        let result = stratified_group_split(&file_names, &labels, &opts).expect("split");

        assert!(result.overlap().is_empty());
        assert!(result.train_files.contains(&"0.jpg".to_string()));
        assert!(!result.val_files.contains(&"0.jpg".to_string()));
    }

    #[test]
    fn mandatory_files_land_on_their_side() {
        let file_names = ["0.jpg", "1.jpg", "2.jpg", "3.jpg", "4.jpg", "5.jpg"];
        let labels = ["A", "A", "A", "A", "A", "A"];
        let opts = SplitOptions {
            mandatory_train_filenames: vec!["0.jpg".into(), "1.jpg".into()],
            mandatory_val_filenames: vec!["5.jpg".into()],
            ..Default::default()
        };
        let result = stratified_group_split(&file_names, &labels, &opts).expect("split");

        assert!(result.train_files.contains(&"0.jpg".to_string()));
        assert!(result.train_files.contains(&"1.jpg".to_string()));
        assert!(!result.val_files.contains(&"0.jpg".to_string()));
        assert!(result.val_files.contains(&"5.jpg".to_string()));
        assert!(!result.train_files.contains(&"5.jpg".to_string()));
    }

    #[test]
    fn mandatory_names_match_by_basename() {
        let file_names = ["/abs/0.jpg", "/abs/1.jpg", "/abs/2.jpg"];
        let labels = ["A", "A", "A"];
        let opts = SplitOptions {
            mandatory_val_filenames: vec!["1.jpg".into()],
            ..Default::default()
        };
        let result = stratified_group_split(&file_names, &labels, &opts).expect("split");
        assert!(result.val_files.contains(&"/abs/1.jpg".to_string()));
        assert!(!result.train_files.contains(&"/abs/1.jpg".to_string()));
    }

    #[test]
    fn unknown_mandatory_names_have_no_effect() {
        let file_names = ["0.jpg", "1.jpg", "2.jpg"];
        let labels = ["A", "A", "A"];
        let baseline =
            stratified_group_split(&file_names, &labels, &SplitOptions::default()).expect("split");
        let opts = SplitOptions {
            mandatory_train_filenames: vec!["missing.jpg".into()],
            ..Default::default()
        };
        let result = stratified_group_split(&file_names, &labels, &opts).expect("split");
        assert_eq!(baseline, result);
    }

    #[test]
    fn validation_only_class_is_shifted_into_training() {
        // Forcing the only "B" image into validation makes "B" validation-only.
        let file_names = ["0.jpg", "1.jpg", "2.jpg", "3.jpg"];
        let labels = ["A", "A", "A", "B"];
        let opts = SplitOptions {
            mandatory_val_filenames: vec!["3.jpg".into()],
            add_rare_to_val: false,
            ..Default::default()
        };
        let result = stratified_group_split(&file_names, &labels, &opts).expect("split");

        assert!(result.rare_classes.contains("B"));
        assert!(result.train_files.contains(&"3.jpg".to_string()));
        assert!(!result.val_files.contains(&"3.jpg".to_string()));
    }

    #[test]
    fn empty_input_gives_empty_result() {
        let empty: Vec<String> = Vec::new();
        let result = stratified_group_split(&empty, &empty, &SplitOptions::default()).expect("split");
        assert_eq!(result, SplitResult::default());
    }

    #[test]
    fn overlap_lists_promoted_files() {
        let result = SplitResult {
            train_files: vec!["a".into(), "b".into()],
            val_files: vec!["b".into(), "c".into()],
            rare_classes: BTreeSet::new(),
        };
        assert_eq!(result.overlap(), vec!["b".to_string()]);
    }
}

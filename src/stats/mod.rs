//! Split statistics.
//!
//! Summarizes how bounding boxes of each class ended up distributed between
//! the training and validation corpora.

mod report;

pub use report::{ClassCount, ClassDistribution};

use std::collections::BTreeMap;

use crate::annotation::AnnotationRecord;

/// Counts boxes per class on both sides of a split.
///
/// Classes absent from one side get a zero count there.
pub fn class_distribution(
    train: &[AnnotationRecord],
    val: &[AnnotationRecord],
) -> ClassDistribution {
    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();

    for bbox in train.iter().flat_map(|record| &record.labels) {
        counts.entry(bbox.label.as_str()).or_default().0 += 1;
    }
    for bbox in val.iter().flat_map(|record| &record.labels) {
        counts.entry(bbox.label.as_str()).or_default().1 += 1;
    }

    ClassDistribution {
        classes: counts
            .into_iter()
            .map(|(class, (train, val))| ClassCount {
                class: class.to_string(),
                train,
                val,
            })
            .collect(),
    }
}

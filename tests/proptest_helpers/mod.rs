#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub const CLASS_POOL: [&str; 5] = ["A", "B", "C", "D", "E"];

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Box-level rows: one `(file, class)` pair per box.
#[derive(Clone, Debug)]
pub struct Rows {
    pub file_names: Vec<String>,
    pub labels: Vec<String>,
}

impl Rows {
    pub fn unique_files(&self) -> BTreeSet<String> {
        self.file_names.iter().cloned().collect()
    }

    /// Classes carried by each file.
    pub fn classes_by_file(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut out: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (file, label) in self.file_names.iter().zip(&self.labels) {
            out.entry(file.clone()).or_default().insert(label.clone());
        }
        out
    }

    /// Union of the classes carried by `files`.
    pub fn classes_of<'a>(&self, files: impl IntoIterator<Item = &'a String>) -> BTreeSet<String> {
        let by_file = self.classes_by_file();
        files
            .into_iter()
            .filter_map(|file| by_file.get(file))
            .flatten()
            .cloned()
            .collect()
    }
}

/// A corpus of 1..=`max_images` images, each with 1..=`max_boxes` boxes
/// drawn from [`CLASS_POOL`]. Rows are interleaved so one image's boxes are
/// not always contiguous.
pub fn arb_rows(max_images: usize, max_boxes: usize) -> BoxedStrategy<Rows> {
    assert!(max_images > 0, "max_images must be > 0");
    assert!(max_boxes > 0, "max_boxes must be > 0");

    proptest::collection::vec(
        proptest::collection::vec(0usize..CLASS_POOL.len(), 1..=max_boxes),
        1..=max_images,
    )
    .prop_flat_map(|images| (Just(images), any::<u64>()))
    .prop_map(|(images, mix)| build_rows(&images, mix))
    .boxed()
}

/// Per-image role: 0 = none, 1 = mandatory train, 2 = mandatory validation.
pub fn arb_roles(len: usize) -> BoxedStrategy<Vec<u8>> {
    proptest::collection::vec(0u8..3, len..=len).boxed()
}

fn build_rows(images: &[Vec<usize>], mix: u64) -> Rows {
    let mut rows: Vec<(String, String)> = images
        .iter()
        .enumerate()
        .flat_map(|(idx, classes)| {
            classes
                .iter()
                .map(move |&class| (format!("img_{idx}.jpg"), CLASS_POOL[class].to_string()))
        })
        .collect();

    // Deterministic rotation keyed on `mix` so row order is not image order.
    if !rows.is_empty() {
        let shift = (mix % rows.len() as u64) as usize;
        rows.rotate_left(shift);
    }

    let (file_names, labels) = rows.into_iter().unzip();
    Rows { file_names, labels }
}

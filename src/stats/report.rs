//! Class distribution report types and terminal formatting.

use serde::Serialize;
use std::fmt;

/// Box counts per class on each side of a split.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ClassDistribution {
    /// One row per class, sorted by class name.
    pub classes: Vec<ClassCount>,
}

/// Box counts of a single class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassCount {
    pub class: String,
    pub train: usize,
    pub val: usize,
}

impl ClassDistribution {
    /// Total boxes on the training side.
    pub fn train_total(&self) -> usize {
        self.classes.iter().map(|c| c.train).sum()
    }

    /// Total boxes on the validation side.
    pub fn val_total(&self) -> usize {
        self.classes.iter().map(|c| c.val).sum()
    }

    /// Classes with no boxes on the validation side.
    pub fn missing_from_val(&self) -> Vec<&str> {
        self.classes
            .iter()
            .filter(|c| c.val == 0)
            .map(|c| c.class.as_str())
            .collect()
    }

    /// Classes with no boxes on the training side.
    pub fn missing_from_train(&self) -> Vec<&str> {
        self.classes
            .iter()
            .filter(|c| c.train == 0)
            .map(|c| c.class.as_str())
            .collect()
    }
}

impl fmt::Display for ClassDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.class.chars().count())
            .chain(std::iter::once("class".len()))
            .max()
            .unwrap_or(5);

        writeln!(f, "Class distribution across train and val:")?;
        writeln!(f, "  {:<width$}  {:>8}  {:>8}", "class", "train", "val")?;
        for row in &self.classes {
            writeln!(f, "  {:<width$}  {:>8}  {:>8}", row.class, row.train, row.val)?;
        }
        writeln!(
            f,
            "  {:<width$}  {:>8}  {:>8}",
            "total",
            self.train_total(),
            self.val_total()
        )
    }
}

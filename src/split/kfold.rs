//! Grouped, class-stratified fold assignment.
//!
//! Every sample belongs to a group (an image) and carries a class label.
//! Groups are assigned whole to folds, greedily, so that each class is spread
//! across the folds in proportion to its size.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};

use crate::error::LabelPrepError;

const ISCLOSE_RTOL: f64 = 1e-5;
const ISCLOSE_ATOL: f64 = 1e-8;

/// Stratified K-fold generator with non-overlapping groups.
#[derive(Clone, Debug)]
pub struct StratifiedGroupKFold {
    n_splits: usize,
    seed: u64,
}

impl StratifiedGroupKFold {
    /// Creates a generator with `n_splits` folds and a fixed shuffle seed.
    pub fn new(n_splits: usize, seed: u64) -> Result<Self, LabelPrepError> {
        if n_splits < 2 {
            return Err(LabelPrepError::InvalidSplitParams {
                message: format!("n_splits must be at least 2, got {n_splits}"),
            });
        }
        Ok(Self { n_splits, seed })
    }

    /// Assigns every sample to a fold.
    ///
    /// `groups` and `labels` are parallel; the caller checks their lengths.
    /// Samples of the same group always share a fold. Folds may be empty when
    /// there are fewer groups than folds.
    pub fn assign_folds<G, Y>(&self, groups: &[G], labels: &[Y]) -> Vec<usize>
    where
        G: AsRef<str>,
        Y: AsRef<str>,
    {
        debug_assert_eq!(groups.len(), labels.len());

        let class_index = sorted_index(labels);
        let group_index = sorted_index(groups);
        let n_classes = class_index.len();
        let n_groups = group_index.len();

        let mut class_totals = vec![0.0_f64; n_classes];
        let mut counts_per_group = vec![vec![0.0_f64; n_classes]; n_groups];
        let mut sample_groups = Vec::with_capacity(groups.len());
        for (group, label) in groups.iter().zip(labels) {
            let g = group_index[group.as_ref()];
            let c = class_index[label.as_ref()];
            counts_per_group[g][c] += 1.0;
            class_totals[c] += 1.0;
            sample_groups.push(g);
        }

        // Shuffle first so that the stable sort below breaks ties randomly.
        let mut order: Vec<usize> = (0..n_groups).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        order.shuffle(&mut rng);

        let spread: Vec<f64> = counts_per_group.iter().map(|c| std_dev(c)).collect();
        order.sort_by(|a, b| spread[*b].total_cmp(&spread[*a]));

        let mut counts_per_fold = vec![vec![0.0_f64; n_classes]; self.n_splits];
        let mut fold_of_group = vec![0usize; n_groups];
        for group in order {
            let group_counts = &counts_per_group[group];
            let best = self.find_best_fold(&mut counts_per_fold, &class_totals, group_counts);
            for (slot, count) in counts_per_fold[best].iter_mut().zip(group_counts) {
                *slot += count;
            }
            fold_of_group[group] = best;
        }

        sample_groups.into_iter().map(|g| fold_of_group[g]).collect()
    }

    /// Returns the sample indices of every fold, in ascending order.
    pub fn fold_indices<G, Y>(&self, groups: &[G], labels: &[Y]) -> Vec<Vec<usize>>
    where
        G: AsRef<str>,
        Y: AsRef<str>,
    {
        let mut folds = vec![Vec::new(); self.n_splits];
        for (idx, fold) in self.assign_folds(groups, labels).into_iter().enumerate() {
            folds[fold].push(idx);
        }
        folds
    }

    /// Picks the fold whose class proportions stay most even once the group
    /// is added. Ties go to the fold holding fewer samples, then the lowest
    /// index.
    fn find_best_fold(
        &self,
        counts_per_fold: &mut [Vec<f64>],
        class_totals: &[f64],
        group_counts: &[f64],
    ) -> usize {
        let mut best_fold = 0;
        let mut min_eval = f64::INFINITY;
        let mut min_samples = f64::INFINITY;

        for fold in 0..self.n_splits {
            add_assign(&mut counts_per_fold[fold], group_counts, 1.0);
            let fold_eval = mean_class_spread(counts_per_fold, class_totals);
            add_assign(&mut counts_per_fold[fold], group_counts, -1.0);

            let samples_in_fold: f64 = counts_per_fold[fold].iter().sum();
            let better = fold_eval < min_eval
                || (is_close(fold_eval, min_eval) && samples_in_fold < min_samples);
            if better {
                min_eval = fold_eval;
                min_samples = samples_in_fold;
                best_fold = fold;
            }
        }

        best_fold
    }
}

fn sorted_index<S: AsRef<str>>(values: &[S]) -> BTreeMap<&str, usize> {
    let mut index: BTreeMap<&str, usize> = values.iter().map(|v| (v.as_ref(), 0)).collect();
    for (position, slot) in index.values_mut().enumerate() {
        *slot = position;
    }
    index
}

fn add_assign(target: &mut [f64], delta: &[f64], sign: f64) {
    for (t, d) in target.iter_mut().zip(delta) {
        *t += sign * d;
    }
}

/// Mean over classes of the across-fold spread of each class's share.
fn mean_class_spread(counts_per_fold: &[Vec<f64>], class_totals: &[f64]) -> f64 {
    if class_totals.is_empty() {
        return 0.0;
    }

    let mut shares = Vec::with_capacity(counts_per_fold.len());
    let mut total = 0.0;
    for (class, class_total) in class_totals.iter().enumerate() {
        shares.clear();
        shares.extend(counts_per_fold.iter().map(|fold| fold[class] / class_total));
        total += std_dev(&shares);
    }
    total / class_totals.len() as f64
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}

fn is_close(a: f64, b: f64) -> bool {
    if a.is_infinite() || b.is_infinite() {
        return a == b;
    }
    (a - b).abs() <= ISCLOSE_ATOL + ISCLOSE_RTOL * b.abs()
}

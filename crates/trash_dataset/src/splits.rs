//! Deterministic stratified train/val splitting.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

pub const DEFAULT_VAL_RATIO: f32 = 0.2;
pub const DEFAULT_SPLIT_SEED: u64 = 42;

/// Split sample indices into `(train, val)` keeping class proportions.
///
/// Each class contributes `round(count * val_ratio)` samples to validation, capped so
/// at least one sample of every class stays in training. Both outputs are sorted.
pub fn split_stratified(labels: &[i64], val_ratio: f32, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let val_ratio = val_ratio.clamp(0.0, 1.0);
    let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(i);
    }

    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut val = Vec::new();
    for (_, mut idx) in by_class {
        idx.shuffle(&mut rng);
        let n_val = ((idx.len() as f32 * val_ratio).round() as usize).min(idx.len() - 1);
        val.extend_from_slice(&idx[..n_val]);
        train.extend_from_slice(&idx[n_val..]);
    }
    train.sort_unstable();
    val.sort_unstable();
    (train, val)
}

/// Count samples per label for a subset of indices.
pub fn count_labels(labels: &[i64], indices: &[usize]) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for &i in indices {
        *counts.entry(labels[i]).or_insert(0) += 1;
    }
    counts
}

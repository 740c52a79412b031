//! K-fold splitting and cross-validated scoring.
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::{DesignMatrix, Label};
use crate::error::{FairnessError, Result};
use crate::metrics::Scorer;
use crate::models::classifier_trait::Classifier;

/// Train/test row indices of one fold.
pub type Fold = (Vec<usize>, Vec<usize>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KFold {
    pub n_splits: usize,
    pub shuffle: bool,
    /// Seed of the shuffle; ignored without `shuffle`.
    pub seed: u64,
}

impl Default for KFold {
    fn default() -> Self {
        Self {
            n_splits: 5,
            shuffle: false,
            seed: 0,
        }
    }
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            ..Default::default()
        }
    }

    pub fn shuffled(mut self, seed: u64) -> Self {
        self.shuffle = true;
        self.seed = seed;
        self
    }

    /// Contiguous folds over `0..n_samples` (after an optional seeded
    /// shuffle); the first `n_samples % n_splits` folds get one extra row.
    pub fn split(&self, n_samples: usize) -> Result<Vec<Fold>> {
        if self.n_splits < 2 {
            return Err(FairnessError::configuration(format!(
                "k-fold cross-validation requires at least 2 splits, got {}",
                self.n_splits
            )));
        }
        if self.n_splits > n_samples {
            return Err(FairnessError::validation(format!(
                "Cannot have number of splits n_splits={} greater than the number of samples: n_samples={}",
                self.n_splits, n_samples
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            let mut rng = StdRng::seed_from_u64(self.seed);
            indices.shuffle(&mut rng);
        }

        let base = n_samples / self.n_splits;
        let extra = n_samples % self.n_splits;
        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for k in 0..self.n_splits {
            let size = base + usize::from(k < extra);
            let test = indices[start..start + size].to_vec();
            let train = indices[..start]
                .iter()
                .chain(&indices[start + size..])
                .copied()
                .collect();
            folds.push((train, test));
            start += size;
        }
        Ok(folds)
    }
}

/// Fit a fresh model from `build` on each training fold and score it on the
/// held-out rows.
pub fn cross_val_score<L, C, B>(
    build: B,
    x: &DesignMatrix,
    y: &[L],
    scorer: &Scorer<L>,
    kfold: &KFold,
) -> Result<Vec<f64>>
where
    L: Label,
    C: Classifier<L>,
    B: Fn() -> C,
{
    if x.nrows() != y.len() {
        return Err(FairnessError::validation(format!(
            "Found input variables with inconsistent numbers of samples: [{}, {}]",
            x.nrows(),
            y.len()
        )));
    }
    let mut scores = Vec::with_capacity(kfold.n_splits);
    for (fold, (train, test)) in kfold.split(x.nrows())?.into_iter().enumerate() {
        let mut model = build();
        let y_train: Vec<L> = train.iter().map(|&i| y[i].clone()).collect();
        model.fit(&x.select_rows(&train), &y_train)?;

        let y_test: Vec<L> = test.iter().map(|&i| y[i].clone()).collect();
        let fitted: &dyn Classifier<L> = &model;
        let score = scorer(fitted, &x.select_rows(&test), Some(y_test.as_slice()))?;
        debug!("Fold {}: score {:.4}", fold + 1, score);
        scores.push(score);
    }
    Ok(scores)
}

//! One-vs-rest and one-vs-one composition of the binary fair classifier.
use log::{debug, info};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::function::logistic::logistic;

use crate::config::ClassifierParams;
use crate::data::{check_x_y, DesignMatrix, Label, LabelEncoder};
use crate::error::{FairnessError, Result};
use crate::models::classifier_trait::Classifier;
use crate::models::constraints::FairnessConstraint;
use crate::models::fair_classifier::FairClassifier;

/// Binary sub-models trained on `bool` targets.
pub type BinaryEstimator = FairClassifier<bool, FairnessConstraint<bool>>;

/// Run `fit_one` over `jobs`: sequentially for `n_jobs == 1`, otherwise on a
/// rayon pool of `n_jobs` threads (0 = one per core).
fn fit_all<T, R, F>(n_jobs: usize, jobs: Vec<T>, fit_one: F) -> Result<Vec<R>>
where
    T: Send,
    R: Send,
    F: Fn(T) -> Result<R> + Send + Sync,
{
    if n_jobs == 1 || jobs.len() <= 1 {
        return jobs.into_iter().map(fit_one).collect();
    }
    let pool = rayon::ThreadPoolBuilder::new().num_threads(n_jobs).build()?;
    debug!(
        "Fitting {} sub-problems on {} threads",
        jobs.len(),
        pool.current_num_threads()
    );
    pool.install(|| jobs.into_par_iter().map(fit_one).collect())
}

fn sorted_classes<L: Label>(x: &DesignMatrix, y: &[L], wrapper: &str) -> Result<Vec<L>> {
    check_x_y(x, y)?;
    let classes = LabelEncoder::fit(y).into_classes();
    if classes.len() < 2 {
        return Err(FairnessError::validation(format!(
            "{} needs at least 2 classes in the data, but the data contains {}",
            wrapper,
            classes.len()
        )));
    }
    Ok(classes)
}

fn argmax_labels<L: Clone>(scores: &Array2<f64>, classes: &[L]) -> Vec<L> {
    scores
        .rows()
        .into_iter()
        .map(|row| {
            let best = row
                .iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (idx, &v)| {
                    if v > best.1 {
                        (idx, v)
                    } else {
                        best
                    }
                })
                .0;
            classes[best].clone()
        })
        .collect()
}

/// One binary fair classifier per class against all the others.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneVsRestClassifier<L> {
    params: ClassifierParams,
    fairness: FairnessConstraint<L>,
    n_jobs: usize,
    classes: Vec<L>,
    estimators: Vec<BinaryEstimator>,
}

impl<L: Label> OneVsRestClassifier<L> {
    pub fn new(params: ClassifierParams, fairness: FairnessConstraint<L>, n_jobs: usize) -> Self {
        Self {
            params,
            fairness,
            n_jobs,
            classes: Vec::new(),
            estimators: Vec::new(),
        }
    }

    pub fn estimators(&self) -> &[BinaryEstimator] {
        &self.estimators
    }

    /// Fit one `class` vs rest problem per class. An equal-opportunity target
    /// maps to `true` in its own sub-problem and to `false` elsewhere, so the
    /// other sub-problems constrain the "rest" samples, target class included.
    pub fn fit(&mut self, x: &DesignMatrix, y: &[L]) -> Result<&mut Self> {
        let classes = sorted_classes(x, y, "OneVsRestClassifier")?;
        // two classes share a single sub-problem
        let targets: Vec<&L> = if classes.len() == 2 {
            vec![&classes[1]]
        } else {
            classes.iter().collect()
        };
        info!(
            "One-vs-rest over {} classes ({} sub-problems)",
            classes.len(),
            targets.len()
        );

        let jobs: Vec<(Vec<bool>, FairnessConstraint<bool>)> = targets
            .into_iter()
            .map(|class| {
                let sub_y = y.iter().map(|label| label == class).collect();
                let policy = self.fairness.map_target(|target| target == class);
                (sub_y, policy)
            })
            .collect();

        let params = &self.params;
        let estimators = fit_all(self.n_jobs, jobs, |(sub_y, policy)| {
            let mut estimator = FairClassifier::new(params.clone(), policy);
            estimator.fit(x, &sub_y)?;
            Ok(estimator)
        })?;

        self.classes = classes;
        self.estimators = estimators;
        Ok(self)
    }

    /// Per-class scores, shape `(n_samples, n_estimators)`.
    pub fn decision_function(&self, x: &DesignMatrix) -> Result<Array2<f64>> {
        if self.estimators.is_empty() {
            return Err(FairnessError::NotFitted("OneVsRestClassifier".to_string()));
        }
        let mut scores = Array2::zeros((x.nrows(), self.estimators.len()));
        for (mut column, estimator) in scores.axis_iter_mut(Axis(1)).zip(&self.estimators) {
            column.assign(&estimator.decision_function(x)?);
        }
        Ok(scores)
    }
}

impl<L: Label> Classifier<L> for OneVsRestClassifier<L> {
    fn fit(&mut self, x: &DesignMatrix, y: &[L]) -> Result<()> {
        OneVsRestClassifier::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &DesignMatrix) -> Result<Vec<L>> {
        let scores = self.decision_function(x)?;
        if self.classes.len() == 2 {
            return Ok(scores
                .column(0)
                .iter()
                .map(|&s| self.classes[usize::from(s > 0.0)].clone())
                .collect());
        }
        Ok(argmax_labels(&scores, &self.classes))
    }

    fn predict_proba(&self, x: &DesignMatrix) -> Result<Array2<f64>> {
        let scores = self.decision_function(x)?;
        if self.classes.len() == 2 {
            let positive: Array1<f64> = scores.column(0).mapv(logistic);
            let mut proba = Array2::zeros((x.nrows(), 2));
            proba.column_mut(0).assign(&positive.mapv(|p| 1.0 - p));
            proba.column_mut(1).assign(&positive);
            return Ok(proba);
        }
        let mut proba = scores.mapv(logistic);
        let k = proba.ncols() as f64;
        for mut row in proba.rows_mut() {
            let total = row.sum();
            if total > 0.0 {
                row /= total;
            } else {
                row.fill(1.0 / k);
            }
        }
        Ok(proba)
    }

    fn classes(&self) -> &[L] {
        &self.classes
    }

    fn name(&self) -> &str {
        "one_vs_rest"
    }
}

/// One binary fair classifier per pair of classes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneVsOneClassifier<L> {
    params: ClassifierParams,
    fairness: FairnessConstraint<L>,
    n_jobs: usize,
    classes: Vec<L>,
    /// `(i, j)` class positions of each estimator, `i < j`.
    pairs: Vec<(usize, usize)>,
    estimators: Vec<BinaryEstimator>,
}

impl<L: Label> OneVsOneClassifier<L> {
    pub fn new(params: ClassifierParams, fairness: FairnessConstraint<L>, n_jobs: usize) -> Self {
        Self {
            params,
            fairness,
            n_jobs,
            classes: Vec::new(),
            pairs: Vec::new(),
            estimators: Vec::new(),
        }
    }

    pub fn estimators(&self) -> &[BinaryEstimator] {
        &self.estimators
    }

    pub fn fit(&mut self, x: &DesignMatrix, y: &[L]) -> Result<&mut Self> {
        let classes = sorted_classes(x, y, "OneVsOneClassifier")?;
        let k = classes.len();
        let pairs: Vec<(usize, usize)> = (0..k)
            .flat_map(|i| ((i + 1)..k).map(move |j| (i, j)))
            .collect();
        info!(
            "One-vs-one over {} classes ({} sub-problems)",
            k,
            pairs.len()
        );

        let jobs: Vec<(Vec<usize>, Vec<bool>, FairnessConstraint<bool>)> = pairs
            .iter()
            .map(|&(i, j)| {
                let (negative, positive) = (&classes[i], &classes[j]);
                let rows: Vec<usize> = y
                    .iter()
                    .enumerate()
                    .filter(|(_, label)| *label == negative || *label == positive)
                    .map(|(idx, _)| idx)
                    .collect();
                let sub_y = rows.iter().map(|&idx| y[idx] == *positive).collect();
                (rows, sub_y, self.fairness.for_pair(negative, positive))
            })
            .collect();

        let params = &self.params;
        let estimators = fit_all(self.n_jobs, jobs, |(rows, sub_y, policy)| {
            let mut estimator = FairClassifier::new(params.clone(), policy);
            estimator.fit(&x.select_rows(&rows), &sub_y)?;
            Ok(estimator)
        })?;

        self.classes = classes;
        self.pairs = pairs;
        self.estimators = estimators;
        Ok(self)
    }

    /// Votes plus normalized summed confidences, shape `(n_samples, n_classes)`.
    pub fn decision_function(&self, x: &DesignMatrix) -> Result<Array2<f64>> {
        if self.estimators.is_empty() {
            return Err(FairnessError::NotFitted("OneVsOneClassifier".to_string()));
        }
        let k = self.classes.len();
        let mut votes = Array2::<f64>::zeros((x.nrows(), k));
        let mut confidences = Array2::<f64>::zeros((x.nrows(), k));
        for (&(i, j), estimator) in self.pairs.iter().zip(&self.estimators) {
            let scores = estimator.decision_function(x)?;
            for (row, &s) in scores.iter().enumerate() {
                if s > 0.0 {
                    votes[[row, j]] += 1.0;
                } else {
                    votes[[row, i]] += 1.0;
                }
                confidences[[row, i]] -= s;
                confidences[[row, j]] += s;
            }
        }
        let transformed = confidences.mapv(|c| c / (3.0 * (c.abs() + 1.0)));
        Ok(votes + transformed)
    }
}

impl<L: Label> Classifier<L> for OneVsOneClassifier<L> {
    fn fit(&mut self, x: &DesignMatrix, y: &[L]) -> Result<()> {
        OneVsOneClassifier::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &DesignMatrix) -> Result<Vec<L>> {
        let scores = self.decision_function(x)?;
        Ok(argmax_labels(&scores, &self.classes))
    }

    fn predict_proba(&self, _x: &DesignMatrix) -> Result<Array2<f64>> {
        Err(FairnessError::NotImplemented(
            "predict_proba for one-vs-one classification".to_string(),
        ))
    }

    fn classes(&self) -> &[L] {
        &self.classes
    }

    fn name(&self) -> &str {
        "one_vs_one"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SensitiveColumns;
    use ndarray::array;

    #[test]
    fn argmax_takes_first_maximum() {
        let scores = array![[0.1, 0.9, 0.9], [2.0, -1.0, 0.0]];
        assert_eq!(argmax_labels(&scores, &["a", "b", "c"]), vec!["b", "a"]);
    }

    #[test]
    fn fit_all_runs_on_a_pool() {
        let out = fit_all(2, vec![1, 2, 3], |v| Ok(v * 10)).unwrap();
        assert_eq!(out, vec![10, 20, 30]);
        let out = fit_all(1, vec![4], |v| Ok(v + 1)).unwrap();
        assert_eq!(out, vec![5]);
    }

    #[test]
    fn single_class_target_is_rejected() {
        let x = DesignMatrix::new(array![[1.0, 0.0], [2.0, 1.0]]);
        let mut ovr = OneVsRestClassifier::new(
            ClassifierParams::new(SensitiveColumns::indices([1])),
            FairnessConstraint::demographic_parity(None),
            1,
        );
        assert!(matches!(
            ovr.fit(&x, &["a", "a"]),
            Err(FairnessError::Validation(_))
        ));
    }

    #[test]
    fn unfitted_wrappers_report_not_fitted() {
        let x = DesignMatrix::new(array![[1.0, 0.0]]);
        let ovo: OneVsOneClassifier<i32> = OneVsOneClassifier::new(
            ClassifierParams::default(),
            FairnessConstraint::default(),
            1,
        );
        assert!(matches!(
            ovo.decision_function(&x),
            Err(FairnessError::NotFitted(_))
        ));
    }
}

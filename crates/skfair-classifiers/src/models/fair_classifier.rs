use log::{info, warn};
use ndarray::{s, Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use statrs::function::logistic::logistic;

use crate::config::{ClassifierParams, Penalty};
use crate::data::{add_intercept, check_array, check_x_y, delete_columns, DesignMatrix, Label, LabelEncoder};
use crate::error::{FairnessError, Result};
use crate::models::classifier_trait::Classifier;
use crate::models::constraints::{ConstraintContext, ConstraintPolicy, FairnessConstraint};
use crate::solver::{LogLikelihood, Problem, SolverSettings, SolverStatus};

/// Parameters learned by a binary fair fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearFit<L> {
    /// One weight per trained feature (sensitive columns excluded unless trained on).
    pub coef: Array1<f64>,
    pub intercept: f64,
    /// The two original labels; `classes[1]` is the positive class.
    pub classes: Vec<L>,
    pub sensitive_col_idx: Vec<usize>,
    pub train_sensitive_cols: bool,
    /// Column count of the matrix given to `fit`.
    pub n_features_in: usize,
    pub n_iter: usize,
    pub n_inner_iter: usize,
    pub status: SolverStatus,
    pub log_likelihood: f64,
}

impl<L: Label> LinearFit<L> {
    /// Raw scores `X theta + b` for `x` in the training layout.
    pub fn decision_function(&self, x: &DesignMatrix) -> Result<Array1<f64>> {
        if x.ncols() != self.n_features_in {
            return Err(FairnessError::validation(format!(
                "X has {} features, but the classifier was fitted with {} features",
                x.ncols(),
                self.n_features_in
            )));
        }
        check_array(x)?;
        let scores = if self.train_sensitive_cols || self.sensitive_col_idx.is_empty() {
            x.values().dot(&self.coef)
        } else {
            delete_columns(x.values(), &self.sensitive_col_idx).dot(&self.coef)
        };
        Ok(scores + self.intercept)
    }

    /// `[sigmoid(-s), sigmoid(s)]` per row.
    pub fn predict_proba(&self, x: &DesignMatrix) -> Result<Array2<f64>> {
        let scores = self.decision_function(x)?;
        let mut proba = Array2::zeros((scores.len(), 2));
        for (mut row, &s) in proba.axis_iter_mut(Axis(0)).zip(scores.iter()) {
            row[0] = logistic(-s);
            row[1] = logistic(s);
        }
        Ok(proba)
    }

    pub fn predict(&self, x: &DesignMatrix) -> Result<Vec<L>> {
        let scores = self.decision_function(x)?;
        Ok(scores
            .iter()
            .map(|&s| {
                if s > 0.0 {
                    self.classes[1].clone()
                } else {
                    self.classes[0].clone()
                }
            })
            .collect())
    }
}

/// Solve the constrained maximum-likelihood problem for one binary target.
pub(crate) fn fit_linear<L, P>(
    params: &ClassifierParams,
    policy: &P,
    x: &DesignMatrix,
    y: &[L],
) -> Result<LinearFit<L>>
where
    L: Label,
    P: ConstraintPolicy<L> + ?Sized,
{
    params.validate()?;
    let sensitive_col_idx = params.sensitive_cols.resolve(x)?;
    check_x_y(x, y)?;

    let sensitive = x.values().select(Axis(1), &sensitive_col_idx);
    let features = if params.train_sensitive_cols {
        x.values().to_owned()
    } else {
        delete_columns(x.values(), &sensitive_col_idx)
    };
    let design = if params.fit_intercept {
        add_intercept(&features)
    } else {
        features
    };

    let encoder = LabelEncoder::fit(y);
    if encoder.classes().len() != 2 {
        return Err(FairnessError::validation(format!(
            "This solver needs samples of exactly 2 classes in the data, but the data contains {} classes",
            encoder.classes().len()
        )));
    }
    let target = encoder.transform(y)?;

    let constraints = policy.constraints(&ConstraintContext {
        y_true: y,
        sensitive: sensitive.view(),
        n_obs: x.nrows(),
    })?;

    info!(
        "Fitting {} on {} samples, {} features, {} fairness constraint(s)",
        policy.name(),
        design.nrows(),
        design.ncols(),
        constraints.len()
    );

    let mut problem = Problem::maximize(LogLikelihood::new(design.view(), target.view()));
    if params.penalty == Penalty::L1 {
        problem = problem.with_l1_penalty(1.0 / params.c, usize::from(params.fit_intercept));
    }
    for constraint in &constraints {
        problem.subject_to(constraint)?;
    }

    let settings = SolverSettings {
        max_iter: params.max_iter,
        tol: params.tol,
        ..SolverSettings::default()
    };
    let solution = problem.solve(&settings);
    let (status, n_iter, n_inner_iter, log_likelihood) = (
        solution.status,
        solution.iterations,
        solution.inner_iterations,
        solution.objective_value,
    );
    if status == SolverStatus::OptimalInaccurate {
        warn!(
            "Solver did not converge within max_iter={} iterations; increase max_iter or tol",
            params.max_iter
        );
    }
    let theta = solution.into_values()?;

    let (intercept, coef) = if params.fit_intercept {
        (theta[0], theta.slice(s![1..]).to_owned())
    } else {
        (0.0, theta)
    };

    info!(
        "Fit finished with status {} after {} iterations ({} inner)",
        status, n_iter, n_inner_iter
    );

    Ok(LinearFit {
        coef,
        intercept,
        classes: encoder.into_classes(),
        sensitive_col_idx,
        train_sensitive_cols: params.train_sensitive_cols,
        n_features_in: x.ncols(),
        n_iter,
        n_inner_iter,
        status,
        log_likelihood,
    })
}

/// A logistic-regression style classifier whose fit is bounded by a
/// fairness policy.
///
/// The policy parameter defaults to the serializable [`FairnessConstraint`];
/// any [`ConstraintPolicy`] can be plugged in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FairClassifier<L, P = FairnessConstraint<L>> {
    params: ClassifierParams,
    policy: P,
    fitted: Option<LinearFit<L>>,
}

impl<L, P> FairClassifier<L, P> {
    pub fn new(params: ClassifierParams, policy: P) -> Self {
        Self {
            params,
            policy,
            fitted: None,
        }
    }

    pub fn params(&self) -> &ClassifierParams {
        &self.params
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }
}

impl<L: Label, P: ConstraintPolicy<L>> FairClassifier<L, P> {
    /// Fit on `x` (with sensitive columns) and `y`; any previous fit is replaced.
    pub fn fit(&mut self, x: &DesignMatrix, y: &[L]) -> Result<&mut Self> {
        self.fitted = None;
        self.fitted = Some(fit_linear(&self.params, &self.policy, x, y)?);
        Ok(self)
    }

    pub fn fitted(&self) -> Result<&LinearFit<L>> {
        self.fitted
            .as_ref()
            .ok_or_else(|| FairnessError::NotFitted(self.policy.name().to_string()))
    }

    pub fn coef(&self) -> Result<ArrayView1<'_, f64>> {
        Ok(self.fitted()?.coef.view())
    }

    pub fn intercept(&self) -> Result<f64> {
        Ok(self.fitted()?.intercept)
    }

    pub fn n_iter(&self) -> Result<usize> {
        Ok(self.fitted()?.n_iter)
    }

    pub fn decision_function(&self, x: &DesignMatrix) -> Result<Array1<f64>> {
        self.fitted()?.decision_function(x)
    }

    pub fn predict_proba(&self, x: &DesignMatrix) -> Result<Array2<f64>> {
        self.fitted()?.predict_proba(x)
    }

    pub fn predict(&self, x: &DesignMatrix) -> Result<Vec<L>> {
        self.fitted()?.predict(x)
    }
}

impl<L: Label, P: ConstraintPolicy<L>> Classifier<L> for FairClassifier<L, P> {
    fn fit(&mut self, x: &DesignMatrix, y: &[L]) -> Result<()> {
        FairClassifier::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &DesignMatrix) -> Result<Vec<L>> {
        FairClassifier::predict(self, x)
    }

    fn predict_proba(&self, x: &DesignMatrix) -> Result<Array2<f64>> {
        FairClassifier::predict_proba(self, x)
    }

    fn classes(&self) -> &[L] {
        self.fitted
            .as_ref()
            .map(|fit| fit.classes.as_slice())
            .unwrap_or(&[])
    }

    fn name(&self) -> &str {
        self.policy.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SensitiveColumns;
    use crate::models::constraints::{BasePolicy, DemographicParity};
    use ndarray::array;

    fn data() -> (DesignMatrix, Vec<i32>) {
        let x = DesignMatrix::with_column_names(
            array![
                [0.2, 1.0],
                [1.4, 1.0],
                [-0.3, 0.0],
                [0.9, 0.0],
                [-1.1, 1.0],
                [0.4, 0.0],
                [1.8, 1.0],
                [-0.7, 0.0],
            ],
            vec!["x".to_string(), "z".to_string()],
        )
        .unwrap();
        (x, vec![1, 1, 0, 1, 0, 0, 1, 0])
    }

    fn params() -> ClassifierParams {
        ClassifierParams::new(SensitiveColumns::names(["z"]))
    }

    #[test]
    fn fitted_model_drops_sensitive_column() {
        let (x, y) = data();
        let mut clf: FairClassifier<i32> =
            FairClassifier::new(params(), FairnessConstraint::demographic_parity(Some(0.1)));
        clf.fit(&x, &y).unwrap();
        assert_eq!(clf.coef().unwrap().len(), 1);
        assert_eq!(clf.fitted().unwrap().sensitive_col_idx, vec![1]);
        assert_eq!(Classifier::classes(&clf), &[0, 1]);

        let proba = clf.predict_proba(&x).unwrap();
        assert_eq!(proba.dim(), (8, 2));
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
            assert!(row.iter().all(|&p| p > 0.0 && p < 1.0));
        }
    }

    #[test]
    fn unfitted_accessors_fail() {
        let clf: FairClassifier<i32, DemographicParity> =
            FairClassifier::new(params(), DemographicParity::new(None));
        assert!(matches!(clf.coef(), Err(FairnessError::NotFitted(_))));
        assert!(matches!(clf.n_iter(), Err(FairnessError::NotFitted(_))));
        let (x, _) = data();
        assert!(clf.predict(&x).is_err());
    }

    #[test]
    fn base_policy_cannot_fit() {
        let (x, y) = data();
        let mut clf = FairClassifier::new(params(), BasePolicy);
        let err = clf.fit(&x, &y).unwrap_err();
        assert!(matches!(err, FairnessError::NotImplemented(_)));
        assert!(!clf.is_fitted());
    }

    #[test]
    fn three_classes_are_rejected() {
        let (x, mut y) = data();
        y[0] = 2;
        let mut clf: FairClassifier<i32> =
            FairClassifier::new(params(), FairnessConstraint::default());
        assert!(matches!(
            clf.fit(&x, &y),
            Err(FairnessError::Validation(_))
        ));
    }

    #[test]
    fn decision_function_checks_width() {
        let (x, y) = data();
        let mut clf: FairClassifier<i32> =
            FairClassifier::new(params(), FairnessConstraint::default());
        clf.fit(&x, &y).unwrap();
        let narrow = DesignMatrix::new(array![[0.5]]);
        assert!(matches!(
            clf.decision_function(&narrow),
            Err(FairnessError::Validation(_))
        ));
    }

    #[test]
    fn without_intercept_theta_is_all_coef() {
        let (x, y) = data();
        let mut clf: FairClassifier<i32> = FairClassifier::new(
            params().with_fit_intercept(false).with_penalty(Penalty::None),
            FairnessConstraint::default(),
        );
        clf.fit(&x, &y).unwrap();
        assert_eq!(clf.intercept().unwrap(), 0.0);
        assert_eq!(clf.coef().unwrap().len(), 1);
    }
}

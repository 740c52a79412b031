//! Fairness policies: the hook that turns a covariance threshold into
//! bounds on the decision scores of a fit.
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::data::Label;
use crate::error::{FairnessError, Result};
use crate::solver::ScoreConstraint;

/// What a policy gets to see when a fit asks it for constraints.
#[derive(Debug, Clone, Copy)]
pub struct ConstraintContext<'a, L> {
    /// Training labels as given to `fit` (not encoded).
    pub y_true: &'a [L],
    /// Sensitive columns, one row per training sample.
    pub sensitive: ArrayView2<'a, f64>,
    pub n_obs: usize,
}

/// Policy-specific constraints of a fair fit.
///
/// Each returned [`ScoreConstraint`] bounds `|w . y_hat|` where `y_hat` is
/// the vector of training decision scores. Implementors override
/// [`ConstraintPolicy::constraints`]; the default body is the abstract base
/// and fails with a not-implemented error.
pub trait ConstraintPolicy<L: Label>: Send + Sync {
    fn constraints(&self, ctx: &ConstraintContext<'_, L>) -> Result<Vec<ScoreConstraint>> {
        let _ = ctx;
        Err(FairnessError::NotImplemented(
            "constraints of the base fair classifier".to_string(),
        ))
    }

    fn name(&self) -> &str {
        "fair_classifier"
    }
}

/// The abstract base classifier's policy. Fitting with it fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasePolicy;

impl<L: Label> ConstraintPolicy<L> for BasePolicy {}

/// Weights `mask_i (z_i - mean) / denominator` for one sensitive column.
fn covariance_weights(
    column: ArrayView1<'_, f64>,
    mask: Option<&[bool]>,
    denominator: f64,
) -> Array1<f64> {
    let mean = column.mean().unwrap_or(0.0);
    let mut weights = column.mapv(|z| (z - mean) / denominator);
    if let Some(mask) = mask {
        weights
            .iter_mut()
            .zip(mask)
            .filter(|(_, keep)| !**keep)
            .for_each(|(w, _)| *w = 0.0);
    }
    weights
}

/// Bound the covariance between every sensitive column and the decision
/// score over the whole population.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DemographicParity {
    /// `None` leaves the fit unconstrained.
    pub covariance_threshold: Option<f64>,
}

impl DemographicParity {
    pub fn new(covariance_threshold: Option<f64>) -> Self {
        Self {
            covariance_threshold,
        }
    }
}

impl<L: Label> ConstraintPolicy<L> for DemographicParity {
    fn constraints(&self, ctx: &ConstraintContext<'_, L>) -> Result<Vec<ScoreConstraint>> {
        let Some(threshold) = self.covariance_threshold else {
            return Ok(Vec::new());
        };
        let n_obs = ctx.n_obs as f64;
        Ok(ctx
            .sensitive
            .columns()
            .into_iter()
            .map(|column| ScoreConstraint::new(covariance_weights(column, None, n_obs), threshold))
            .collect())
    }

    fn name(&self) -> &str {
        "demographic_parity_classifier"
    }
}

/// Like [`DemographicParity`], restricted to samples whose true label is
/// `positive_target`.
///
/// Only the sum runs over the positive subset and only `n_obs` is replaced
/// by the subset size; the sensitive mean is still the full-population mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualOpportunity<L> {
    pub covariance_threshold: Option<f64>,
    pub positive_target: L,
}

impl<L> EqualOpportunity<L> {
    pub fn new(covariance_threshold: Option<f64>, positive_target: L) -> Self {
        Self {
            covariance_threshold,
            positive_target,
        }
    }
}

impl<L: Label> ConstraintPolicy<L> for EqualOpportunity<L> {
    fn constraints(&self, ctx: &ConstraintContext<'_, L>) -> Result<Vec<ScoreConstraint>> {
        let Some(threshold) = self.covariance_threshold else {
            return Ok(Vec::new());
        };
        let mask: Vec<bool> = ctx
            .y_true
            .iter()
            .map(|label| *label == self.positive_target)
            .collect();
        let n_pos = mask.iter().filter(|&&m| m).count();
        if n_pos == 0 {
            return Err(FairnessError::validation(format!(
                "no sample has the positive target {:?}",
                self.positive_target
            )));
        }
        Ok(ctx
            .sensitive
            .columns()
            .into_iter()
            .map(|column| {
                ScoreConstraint::new(
                    covariance_weights(column, Some(mask.as_slice()), n_pos as f64),
                    threshold,
                )
            })
            .collect())
    }

    fn name(&self) -> &str {
        "equal_opportunity_classifier"
    }
}

/// Serializable choice of fairness policy, as found in model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum FairnessConstraint<L> {
    DemographicParity(DemographicParity),
    EqualOpportunity(EqualOpportunity<L>),
}

impl<L> Default for FairnessConstraint<L> {
    fn default() -> Self {
        FairnessConstraint::DemographicParity(DemographicParity::default())
    }
}

impl<L> FairnessConstraint<L> {
    pub fn demographic_parity(covariance_threshold: Option<f64>) -> Self {
        FairnessConstraint::DemographicParity(DemographicParity::new(covariance_threshold))
    }

    pub fn equal_opportunity(covariance_threshold: Option<f64>, positive_target: L) -> Self {
        FairnessConstraint::EqualOpportunity(EqualOpportunity::new(
            covariance_threshold,
            positive_target,
        ))
    }

    pub fn covariance_threshold(&self) -> Option<f64> {
        match self {
            FairnessConstraint::DemographicParity(p) => p.covariance_threshold,
            FairnessConstraint::EqualOpportunity(p) => p.covariance_threshold,
        }
    }

    /// Re-express the policy for a relabelled sub-problem.
    pub fn map_target<M>(&self, f: impl FnOnce(&L) -> M) -> FairnessConstraint<M> {
        match self {
            FairnessConstraint::DemographicParity(p) => FairnessConstraint::DemographicParity(*p),
            FairnessConstraint::EqualOpportunity(p) => FairnessConstraint::EqualOpportunity(
                EqualOpportunity::new(p.covariance_threshold, f(&p.positive_target)),
            ),
        }
    }
}

impl<L: Label> FairnessConstraint<L> {
    /// Policy of the `negative` vs `positive` sub-problem (label `true` for
    /// `positive`). An equal-opportunity target outside the pair marks no
    /// sample of the pair, so that sub-problem is left unconstrained.
    pub fn for_pair(&self, negative: &L, positive: &L) -> FairnessConstraint<bool> {
        match self {
            FairnessConstraint::EqualOpportunity(p)
                if p.positive_target != *negative && p.positive_target != *positive =>
            {
                FairnessConstraint::demographic_parity(None)
            }
            _ => self.map_target(|target| target == positive),
        }
    }
}

impl<L: Label> ConstraintPolicy<L> for FairnessConstraint<L> {
    fn constraints(&self, ctx: &ConstraintContext<'_, L>) -> Result<Vec<ScoreConstraint>> {
        match self {
            FairnessConstraint::DemographicParity(p) => p.constraints(ctx),
            FairnessConstraint::EqualOpportunity(p) => p.constraints(ctx),
        }
    }

    fn name(&self) -> &str {
        match self {
            FairnessConstraint::DemographicParity(p) => ConstraintPolicy::<L>::name(p),
            FairnessConstraint::EqualOpportunity(p) => p.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn ctx<'a>(y: &'a [i32], z: ArrayView2<'a, f64>) -> ConstraintContext<'a, i32> {
        ConstraintContext {
            y_true: y,
            sensitive: z,
            n_obs: y.len(),
        }
    }

    #[test]
    fn base_policy_is_not_implemented() {
        let z = array![[0.0], [1.0]];
        let err = BasePolicy.constraints(&ctx(&[0, 1], z.view())).unwrap_err();
        assert!(matches!(err, FairnessError::NotImplemented(_)));
    }

    #[test]
    fn no_threshold_means_no_constraints() {
        let z = array![[0.0], [1.0]];
        let dp = DemographicParity::new(None);
        assert!(ConstraintPolicy::<i32>::constraints(&dp, &ctx(&[0, 1], z.view()))
            .unwrap()
            .is_empty());
        let eo = EqualOpportunity::new(None, 1);
        assert!(eo.constraints(&ctx(&[0, 1], z.view())).unwrap().is_empty());
    }

    #[test]
    fn demographic_parity_centres_over_everyone() {
        let z = array![[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];
        let dp = DemographicParity::new(Some(0.2));
        let cons = ConstraintPolicy::<i32>::constraints(&dp, &ctx(&[0, 1, 1, 0], z.view())).unwrap();
        assert_eq!(cons.len(), 2);
        assert_eq!(cons[0].bound, 0.2);
        assert_eq!(cons[0].weights, array![-0.125, 0.125, 0.125, -0.125]);

        // covariance of the scores with the sensitive column
        let scores = array![1.0, 2.0, 3.0, 4.0];
        assert_abs_diff_eq!(cons[0].evaluate(scores.view()), 0.0);
        assert_abs_diff_eq!(cons[1].evaluate(scores.view()), -0.5);
    }

    #[test]
    fn equal_opportunity_keeps_full_mean_but_subset_count() {
        // mean of z is 0.25 over all four samples
        let z = array![[1.0], [0.0], [0.0], [0.0]];
        let y = [1, 1, 0, 0];
        let eo = EqualOpportunity::new(Some(0.1), 1);
        let cons = eo.constraints(&ctx(&y, z.view())).unwrap();
        assert_eq!(cons.len(), 1);
        assert_eq!(cons[0].weights, array![0.375, -0.125, 0.0, 0.0]);
    }

    #[test]
    fn equal_opportunity_without_positives_fails() {
        let z = array![[1.0], [0.0]];
        let eo = EqualOpportunity::new(Some(0.1), 7);
        assert!(matches!(
            eo.constraints(&ctx(&[0, 1], z.view())),
            Err(FairnessError::Validation(_))
        ));
    }

    #[test]
    fn pair_mapping_drops_targets_outside_the_pair() {
        let eo = FairnessConstraint::equal_opportunity(Some(0.1), "b".to_string());
        let inside = eo.for_pair(&"a".to_string(), &"b".to_string());
        assert_eq!(inside, FairnessConstraint::equal_opportunity(Some(0.1), true));
        let flipped = eo.for_pair(&"b".to_string(), &"c".to_string());
        assert_eq!(flipped, FairnessConstraint::equal_opportunity(Some(0.1), false));
        let outside = eo.for_pair(&"a".to_string(), &"c".to_string());
        assert_eq!(outside.covariance_threshold(), None);
    }

    #[test]
    fn policy_reads_from_json() {
        let eo: FairnessConstraint<String> = serde_json::from_str(
            r#"{"policy": "equal_opportunity", "covariance_threshold": 0.05, "positive_target": "yes"}"#,
        )
        .unwrap();
        assert_eq!(
            eo,
            FairnessConstraint::equal_opportunity(Some(0.05), "yes".to_string())
        );
    }
}

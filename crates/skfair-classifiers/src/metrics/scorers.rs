use log::warn;
use ndarray::ArrayView1;

use crate::data::{ColumnRef, DesignMatrix, Label};
use crate::error::{FairnessError, Result};
use crate::models::classifier_trait::Classifier;

/// A reusable scoring function `(estimator, X, y_true) -> score`.
///
/// `X` is what goes *into* the estimator, sensitive columns included.
pub type Scorer<L> =
    Box<dyn Fn(&dyn Classifier<L>, &DesignMatrix, Option<&[L]>) -> Result<f64> + Send + Sync>;

fn binary_indicator<'a>(
    x: &'a DesignMatrix,
    column: &ColumnRef,
    scorer: &str,
) -> Result<ArrayView1<'a, f64>> {
    let z = x.column(column)?;
    if let Some(bad) = z.iter().find(|&&v| v != 0.0 && v != 1.0) {
        return Err(FairnessError::validation(format!(
            "{} only supports binary indicator columns for `column`. Found value {}",
            scorer, bad
        )));
    }
    Ok(z)
}

/// `min(p1 / p0, p0 / p1)` of the positive-prediction rates of the `z == 1`
/// and `z == 0` groups, restricted to rows where `keep` holds.
fn rate_ratio(
    z: ArrayView1<'_, f64>,
    predicted_positive: &[bool],
    keep: impl Fn(usize) -> bool,
    column: &ColumnRef,
    target: &dyn std::fmt::Debug,
) -> f64 {
    let mut counts = [(0usize, 0usize); 2];
    for (idx, (&zi, &positive)) in z.iter().zip(predicted_positive).enumerate() {
        if !keep(idx) {
            continue;
        }
        let group = &mut counts[usize::from(zi == 1.0)];
        group.0 += usize::from(positive);
        group.1 += 1;
    }
    // an empty group gives NaN, which ends in the NaN branch below
    let rate = |(positive, total): (usize, usize)| positive as f64 / total as f64;
    let (p_z0, p_z1) = (rate(counts[0]), rate(counts[1]));

    for (p, value) in [(p_z1, 1), (p_z0, 0)] {
        if p == 0.0 {
            warn!(
                "No samples with y_hat == {:?} for {} == {}, returning 0",
                target, column, value
            );
            return 0.0;
        }
    }

    let ratio = (p_z1 / p_z0).min(p_z0 / p_z1);
    if ratio.is_nan() {
        1.0
    } else {
        ratio
    }
}

/// Scorer for the p% rule: the ratio between the probability of a positive
/// prediction given `z = 1` and given `z = 0`, whichever way round is at
/// most one.
///
/// `sensitive_column` must hold only 0 and 1. When either group never gets a
/// positive prediction the model is maximally unfair: a warning is logged and
/// the score is 0.
pub fn p_percent_score<L: Label + 'static>(
    sensitive_column: impl Into<ColumnRef>,
    positive_target: L,
) -> Scorer<L> {
    let column = sensitive_column.into();
    Box::new(
        move |estimator: &dyn Classifier<L>, x: &DesignMatrix, _y_true: Option<&[L]>| -> Result<f64> {
            let z = binary_indicator(x, &column, "p_percent_score")?;
            let predicted_positive: Vec<bool> = estimator
                .predict(x)?
                .iter()
                .map(|label| *label == positive_target)
                .collect();
            Ok(rate_ratio(
                z,
                &predicted_positive,
                |_| true,
                &column,
                &positive_target,
            ))
        },
    )
}

/// Like [`p_percent_score`], but only over samples whose true label is
/// `positive_target`, so it compares true positive rates. Needs `y_true`.
pub fn equal_opportunity_score<L: Label + 'static>(
    sensitive_column: impl Into<ColumnRef>,
    positive_target: L,
) -> Scorer<L> {
    let column = sensitive_column.into();
    Box::new(
        move |estimator: &dyn Classifier<L>, x: &DesignMatrix, y_true: Option<&[L]>| -> Result<f64> {
            let y_true = y_true.ok_or_else(|| {
                FairnessError::validation("equal_opportunity_score needs the true labels")
            })?;
            if y_true.len() != x.nrows() {
                return Err(FairnessError::validation(format!(
                    "Found input variables with inconsistent numbers of samples: [{}, {}]",
                    x.nrows(),
                    y_true.len()
                )));
            }
            let z = binary_indicator(x, &column, "equal_opportunity_score")?;
            let predicted_positive: Vec<bool> = estimator
                .predict(x)?
                .iter()
                .map(|label| *label == positive_target)
                .collect();
            Ok(rate_ratio(
                z,
                &predicted_positive,
                |idx| y_true[idx] == positive_target,
                &column,
                &positive_target,
            ))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn ratio_is_symmetric() {
        let z = array![1.0, 1.0, 0.0, 0.0];
        let column = ColumnRef::Index(0);
        // rates: z1 -> 1/2, z0 -> 2/2
        let ratio = rate_ratio(z.view(), &[true, false, true, true], |_| true, &column, &1);
        assert_relative_eq!(ratio, 0.5);
    }

    #[test]
    fn zero_rate_group_scores_zero() {
        let z = array![1.0, 0.0];
        let ratio = rate_ratio(z.view(), &[false, true], |_| true, &ColumnRef::Index(0), &1);
        assert_eq!(ratio, 0.0);
    }

    #[test]
    fn empty_group_scores_one() {
        let z = array![1.0, 1.0];
        let ratio = rate_ratio(z.view(), &[true, true], |_| true, &ColumnRef::Index(0), &1);
        assert_eq!(ratio, 1.0);
    }
}

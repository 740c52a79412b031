use std::collections::BTreeSet;

use ndarray::Array2;

use crate::data::Label;
use crate::error::{FairnessError, Result};

/// Guard against division by zero in the rate metrics.
pub const EPSILON: f64 = 1e-10;

/// Aggregate binary counts of a confusion matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counts {
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
    pub tp: usize,
}

impl Counts {
    pub fn total(&self) -> usize {
        self.tn + self.fp + self.fn_ + self.tp
    }
}

/// Count matrix with true labels along rows and predictions along columns.
///
/// `labels` fixes the row/column order; by default it is the sorted union of
/// both label sets. Pairs whose labels are not listed are ignored.
pub fn confusion_matrix<L: Label>(
    y_true: &[L],
    y_pred: &[L],
    labels: Option<&[L]>,
) -> Result<Array2<usize>> {
    if y_true.len() != y_pred.len() {
        return Err(FairnessError::validation(format!(
            "Found input variables with inconsistent numbers of samples: [{}, {}]",
            y_true.len(),
            y_pred.len()
        )));
    }
    let labels: Vec<L> = match labels {
        Some(labels) => labels.to_vec(),
        None => y_true
            .iter()
            .chain(y_pred)
            .cloned()
            .collect::<BTreeSet<L>>()
            .into_iter()
            .collect(),
    };
    let position = |label: &L| labels.iter().position(|l| l == label);

    let mut cm = Array2::zeros((labels.len(), labels.len()));
    for (t, p) in y_true.iter().zip(y_pred) {
        if let (Some(i), Some(j)) = (position(t), position(p)) {
            cm[[i, j]] += 1;
        }
    }
    Ok(cm)
}

/// Aggregate `(TN, FP, FN, TP)` over a confusion matrix.
///
/// A 2x2 matrix is read directly as `[[TN, FP], [FN, TP]]`. Larger matrices
/// sum the per-class one-vs-rest counts.
pub fn true_false_positive_negative(cm: &Array2<usize>) -> Result<Counts> {
    let (rows, cols) = cm.dim();
    if rows != cols {
        return Err(FairnessError::validation(format!(
            "confusion matrix must be square, got {}x{}",
            rows, cols
        )));
    }
    if rows == 2 {
        return Ok(Counts {
            tn: cm[[0, 0]],
            fp: cm[[0, 1]],
            fn_: cm[[1, 0]],
            tp: cm[[1, 1]],
        });
    }

    let total = cm.sum();
    let row_sums = cm.sum_axis(ndarray::Axis(1));
    let col_sums = cm.sum_axis(ndarray::Axis(0));
    let diagonal = cm.diag();

    let tp = diagonal.sum();
    let fn_ = row_sums.sum() - tp;
    let fp = col_sums.sum() - tp;
    let tn = (0..rows)
        .map(|i| total + diagonal[i] - row_sums[i] - col_sums[i])
        .sum();
    Ok(Counts { tn, fp, fn_, tp })
}

/// `FP / (FP + TN + eps)` of the predictions.
pub fn false_positive_score<L: Label>(y_true: &[L], y_pred: &[L]) -> Result<f64> {
    let counts = true_false_positive_negative(&confusion_matrix(y_true, y_pred, None)?)?;
    Ok(counts.fp as f64 / (counts.fp as f64 + counts.tn as f64 + EPSILON))
}

/// `FP / (TP + FP + eps)` of the predictions.
pub fn false_discovery_score<L: Label>(y_true: &[L], y_pred: &[L]) -> Result<f64> {
    let counts = true_false_positive_negative(&confusion_matrix(y_true, y_pred, None)?)?;
    Ok(counts.fp as f64 / (counts.tp as f64 + counts.fp as f64 + EPSILON))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn binary_unpacking() {
        let counts = true_false_positive_negative(&array![[0, 1], [0, 1]]).unwrap();
        assert_eq!(
            counts,
            Counts {
                tn: 0,
                fp: 1,
                fn_: 0,
                tp: 1
            }
        );
    }

    #[test]
    fn multiclass_aggregation() {
        let counts = true_false_positive_negative(&array![[1, 0, 1], [0, 1, 1], [1, 1, 1]]).unwrap();
        assert_eq!(
            counts,
            Counts {
                tn: 10,
                fp: 4,
                fn_: 4,
                tp: 3
            }
        );
    }

    #[test]
    fn non_square_is_rejected() {
        assert!(true_false_positive_negative(&Array2::zeros((2, 3))).is_err());
    }

    #[test]
    fn confusion_matrix_orders_labels() {
        let cm = confusion_matrix(&["b", "a", "a"], &["a", "a", "b"], None).unwrap();
        assert_eq!(cm, array![[1, 1], [1, 0]]);
        let cm = confusion_matrix(&["b", "a", "c"], &["a", "a", "b"], Some(&["a", "b"][..])).unwrap();
        assert_eq!(cm.sum(), 2);
        assert!(confusion_matrix(&[1], &[1, 2], None).is_err());
    }
}

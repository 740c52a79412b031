//! Column standardization for design matrices.
//!
//! Sensitive indicator columns are usually left as 0/1 so the fairness
//! scorers keep working on the transformed matrix; the scaler takes a list
//! of columns to skip.
use ndarray::Axis;
use serde::{Deserialize, Serialize};

use crate::data::{check_array, DesignMatrix, SensitiveColumns};
use crate::error::{FairnessError, Result};

/// Simple standard scaler (per-column mean/std).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
    /// Columns passed through unchanged.
    pub skip: Vec<usize>,
}

impl Scaler {
    /// Minimum stddev to avoid division by zero when transforming.
    const MIN_STD: f64 = 1e-6;

    /// Fit on `x`, leaving the `skip` columns untouched.
    pub fn fit(x: &DesignMatrix, skip: &SensitiveColumns) -> Result<Scaler> {
        check_array(x)?;
        let skip = skip.resolve(x)?;
        let values = x.values();
        let mean = values
            .mean_axis(Axis(0))
            .ok_or_else(|| FairnessError::validation("cannot scale an empty matrix"))?;
        let std = values.std_axis(Axis(0), 0.0).mapv(|s| s.max(Self::MIN_STD));
        Ok(Scaler {
            mean: mean.to_vec(),
            std: std.to_vec(),
            skip,
        })
    }

    pub fn transform(&self, x: &DesignMatrix) -> Result<DesignMatrix> {
        if x.ncols() != self.mean.len() {
            return Err(FairnessError::validation(format!(
                "X has {} features, but the scaler was fitted with {} features",
                x.ncols(),
                self.mean.len()
            )));
        }
        let mut out = x.clone();
        for (c, mut column) in out.values_mut().axis_iter_mut(Axis(1)).enumerate() {
            if self.skip.binary_search(&c).is_ok() {
                continue;
            }
            let (mean, std) = (self.mean[c], self.std[c]);
            column.mapv_inplace(|v| (v - mean) / std);
        }
        Ok(out)
    }

    pub fn fit_transform(x: &DesignMatrix, skip: &SensitiveColumns) -> Result<(Scaler, DesignMatrix)> {
        let scaler = Scaler::fit(x, skip)?;
        let out = scaler.transform(x)?;
        Ok((scaler, out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn standardizes_all_but_skipped_columns() {
        let x = DesignMatrix::with_column_names(
            array![[1.0, 0.0, 5.0], [3.0, 1.0, 5.0]],
            vec!["a".to_string(), "z".to_string(), "c".to_string()],
        )
        .unwrap();
        let (scaler, out) = Scaler::fit_transform(&x, &SensitiveColumns::names(["z"])).unwrap();
        assert_eq!(scaler.skip, vec![1]);
        let v = out.values();
        assert_abs_diff_eq!(v[[0, 0]], -1.0);
        assert_abs_diff_eq!(v[[1, 0]], 1.0);
        assert_eq!(v.column(1), x.values().column(1));
        // constant column: std floored, centred to zero
        assert_abs_diff_eq!(v[[0, 2]], 0.0);
        assert_eq!(out.column_names(), x.column_names());
    }
}

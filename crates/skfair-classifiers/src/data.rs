//! Data structures and helpers for design matrices, labels and sensitive columns.
//!
//! This module defines `DesignMatrix` (a numeric matrix with optional column
//! names), the selectors used to point at sensitive attributes, and the
//! validation/encoding steps every classifier runs before solving.
use std::collections::BTreeSet;
use std::fmt;

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{FairnessError, Result};

/// Discrete class label. Anything orderable and cloneable qualifies
/// (`bool`, integers, `String`, ...).
pub trait Label: Clone + Ord + fmt::Debug + Send + Sync {}

impl<T> Label for T where T: Clone + Ord + fmt::Debug + Send + Sync {}

/// A numeric design matrix, optionally carrying column names (tabular form).
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    values: Array2<f64>,
    column_names: Option<Vec<String>>,
}

impl DesignMatrix {
    pub fn new(values: Array2<f64>) -> Self {
        Self {
            values,
            column_names: None,
        }
    }

    /// Attach column names; the name count must match the column count.
    pub fn with_column_names(values: Array2<f64>, column_names: Vec<String>) -> Result<Self> {
        if column_names.len() != values.ncols() {
            return Err(FairnessError::validation(format!(
                "Got {} column names for a matrix with {} columns",
                column_names.len(),
                values.ncols()
            )));
        }
        Ok(Self {
            values,
            column_names: Some(column_names),
        })
    }

    pub fn from_shape_vec(shape: (usize, usize), data: Vec<f64>) -> Result<Self> {
        Ok(Self::new(Array2::from_shape_vec(shape, data)?))
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn into_values(self) -> Array2<f64> {
        self.values
    }

    pub fn column_names(&self) -> Option<&[String]> {
        self.column_names.as_deref()
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    pub fn is_tabular(&self) -> bool {
        self.column_names.is_some()
    }

    /// Look up a single column by name or index.
    pub fn column(&self, column: &ColumnRef) -> Result<ArrayView1<'_, f64>> {
        let idx = column.resolve(self)?;
        Ok(self.values.column(idx))
    }

    /// Rows at `indices`, in that order; column names are kept.
    pub fn select_rows(&self, indices: &[usize]) -> DesignMatrix {
        DesignMatrix {
            values: self.values.select(Axis(0), indices),
            column_names: self.column_names.clone(),
        }
    }

    pub(crate) fn values_mut(&mut self) -> &mut Array2<f64> {
        &mut self.values
    }
}

impl From<Array2<f64>> for DesignMatrix {
    fn from(values: Array2<f64>) -> Self {
        DesignMatrix::new(values)
    }
}

/// Reference to one column, by name (tabular input) or by position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

impl ColumnRef {
    pub fn resolve(&self, x: &DesignMatrix) -> Result<usize> {
        match self {
            ColumnRef::Index(idx) => {
                if *idx >= x.ncols() {
                    return Err(FairnessError::validation(format!(
                        "column index {} is out of bounds for {} columns",
                        idx,
                        x.ncols()
                    )));
                }
                Ok(*idx)
            }
            ColumnRef::Name(name) => {
                let names = x.column_names().ok_or_else(|| {
                    FairnessError::validation(format!(
                        "column '{}' was selected by name but the matrix has no column names",
                        name
                    ))
                })?;
                names.iter().position(|n| n == name).ok_or_else(|| {
                    FairnessError::validation(format!("column '{}' not found", name))
                })
            }
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Index(idx) => write!(f, "{}", idx),
            ColumnRef::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<usize> for ColumnRef {
    fn from(idx: usize) -> Self {
        ColumnRef::Index(idx)
    }
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        ColumnRef::Name(name.to_string())
    }
}

/// The sensitive attribute columns: names for tabular input, indices otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensitiveColumns {
    Indices(Vec<usize>),
    Names(Vec<String>),
}

impl Default for SensitiveColumns {
    fn default() -> Self {
        SensitiveColumns::Indices(Vec::new())
    }
}

impl SensitiveColumns {
    pub fn names<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        SensitiveColumns::Names(names.into_iter().map(Into::into).collect())
    }

    pub fn indices(indices: impl IntoIterator<Item = usize>) -> Self {
        SensitiveColumns::Indices(indices.into_iter().collect())
    }

    /// Resolve to sorted, de-duplicated column indices of `x`.
    pub fn resolve(&self, x: &DesignMatrix) -> Result<Vec<usize>> {
        let resolved = match self {
            SensitiveColumns::Indices(indices) => indices
                .iter()
                .map(|&idx| ColumnRef::Index(idx).resolve(x))
                .collect::<Result<BTreeSet<usize>>>()?,
            SensitiveColumns::Names(names) => names
                .iter()
                .map(|name| ColumnRef::Name(name.clone()).resolve(x))
                .collect::<Result<BTreeSet<usize>>>()?,
        };
        Ok(resolved.into_iter().collect())
    }
}

/// Check that `x` and `y` describe the same, non-empty, finite sample set.
pub fn check_x_y<L>(x: &DesignMatrix, y: &[L]) -> Result<()> {
    check_array(x)?;
    if x.nrows() != y.len() {
        return Err(FairnessError::validation(format!(
            "Found input variables with inconsistent numbers of samples: [{}, {}]",
            x.nrows(),
            y.len()
        )));
    }
    Ok(())
}

/// Check that `x` is non-empty and holds only finite values.
pub fn check_array(x: &DesignMatrix) -> Result<()> {
    let (n_samples, n_features) = x.values().dim();
    if n_samples == 0 {
        return Err(FairnessError::validation(
            "Found array with 0 sample(s) while a minimum of 1 is required",
        ));
    }
    if n_features == 0 {
        return Err(FairnessError::validation(
            "Found array with 0 feature(s) while a minimum of 1 is required",
        ));
    }
    if let Some(pos) = x.values().iter().position(|v| !v.is_finite()) {
        return Err(FairnessError::validation(format!(
            "Input contains NaN or infinity at row {}, column {}",
            pos / n_features,
            pos % n_features
        )));
    }
    Ok(())
}

/// Copy of `x` without the columns in `drop` (which must be sorted and unique).
pub fn delete_columns(x: ArrayView2<'_, f64>, drop: &[usize]) -> Array2<f64> {
    if drop.is_empty() {
        return x.to_owned();
    }
    let keep: Vec<usize> = (0..x.ncols())
        .filter(|idx| drop.binary_search(idx).is_err())
        .collect();
    x.select(Axis(1), &keep)
}

/// Prepend a column of ones.
pub fn add_intercept(x: &Array2<f64>) -> Array2<f64> {
    let mut out = Array2::ones((x.nrows(), x.ncols() + 1));
    out.slice_mut(s![.., 1..]).assign(x);
    out
}

/// Deterministic label encoder: classes are sorted, each maps to its rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder<L> {
    classes: Vec<L>,
}

impl<L: Label> LabelEncoder<L> {
    pub fn fit(y: &[L]) -> Self {
        let classes: BTreeSet<L> = y.iter().cloned().collect();
        LabelEncoder {
            classes: classes.into_iter().collect(),
        }
    }

    pub fn classes(&self) -> &[L] {
        &self.classes
    }

    pub fn into_classes(self) -> Vec<L> {
        self.classes
    }

    /// Position of `label` among the sorted classes.
    pub fn encode(&self, label: &L) -> Option<usize> {
        self.classes.binary_search(label).ok()
    }

    /// Encode every label as its class index, as `f64`.
    pub fn transform(&self, y: &[L]) -> Result<Array1<f64>> {
        y.iter()
            .map(|label| {
                self.encode(label).map(|idx| idx as f64).ok_or_else(|| {
                    FairnessError::validation(format!("y contains previously unseen label {:?}", label))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn tabular() -> DesignMatrix {
        DesignMatrix::with_column_names(
            array![[1.0, 0.0, 3.0], [2.0, 1.0, 4.0]],
            vec!["x1".to_string(), "race".to_string(), "x2".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn resolves_names_against_tabular_matrix() {
        let cols = SensitiveColumns::names(["x2", "race"]);
        assert_eq!(cols.resolve(&tabular()).unwrap(), vec![1, 2]);
    }

    #[test]
    fn names_require_column_names() {
        let x = DesignMatrix::new(array![[1.0, 2.0]]);
        let cols = SensitiveColumns::names(["race"]);
        assert!(matches!(cols.resolve(&x), Err(FairnessError::Validation(_))));
    }

    #[test]
    fn unknown_name_is_rejected() {
        let cols = SensitiveColumns::names(["gender"]);
        assert!(cols.resolve(&tabular()).is_err());
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let cols = SensitiveColumns::indices([3]);
        assert!(cols.resolve(&tabular()).is_err());
    }

    #[test]
    fn check_x_y_catches_length_mismatch_and_nan() {
        let x = DesignMatrix::new(array![[1.0], [2.0]]);
        assert!(check_x_y(&x, &[0, 1, 1]).is_err());
        assert!(check_x_y(&x, &[0, 1]).is_ok());

        let x = DesignMatrix::new(array![[1.0], [f64::NAN]]);
        assert!(check_x_y(&x, &[0, 1]).is_err());
    }

    #[test]
    fn delete_and_prepend_columns() {
        let x = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let kept = delete_columns(x.view(), &[1]);
        assert_eq!(kept, array![[1.0, 3.0], [4.0, 6.0]]);
        let with_bias = add_intercept(&kept);
        assert_eq!(with_bias, array![[1.0, 1.0, 3.0], [1.0, 4.0, 6.0]]);
    }

    #[test]
    fn label_encoder_sorts_classes() {
        let y = vec!["yes", "no", "yes"];
        let enc = LabelEncoder::fit(&y);
        assert_eq!(enc.classes(), &["no", "yes"]);
        assert_eq!(enc.transform(&y).unwrap(), array![1.0, 0.0, 1.0]);
        assert!(enc.transform(&["maybe"]).is_err());
    }
}

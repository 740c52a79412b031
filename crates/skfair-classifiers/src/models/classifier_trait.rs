use ndarray::Array2;

use crate::data::{DesignMatrix, Label};
use crate::error::Result;

/// Common contract of every fair classifier: the binary model, its one-vs-rest
/// and one-vs-one wrappers, and the factory-built `FairModel`.
///
/// The trait is object safe so scorers and the report can take
/// `&dyn Classifier<L>`.
pub trait Classifier<L: Label>: Send + Sync {
    /// Fit the model on `x` (full layout, sensitive columns included) and `y`.
    fn fit(&mut self, x: &DesignMatrix, y: &[L]) -> Result<()>;

    /// Predicted class label for each row of `x`.
    fn predict(&self, x: &DesignMatrix) -> Result<Vec<L>>;

    /// Class membership probabilities, one column per entry of `classes()`.
    fn predict_proba(&self, x: &DesignMatrix) -> Result<Array2<f64>>;

    /// Sorted class labels seen during `fit`; empty before fitting.
    fn classes(&self) -> &[L];

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }
}

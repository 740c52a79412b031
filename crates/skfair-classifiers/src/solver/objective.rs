use ndarray::{Array1, ArrayView1, ArrayView2, Zip};
use statrs::function::logistic::logistic;

/// `log(1 + exp(t))`, stable for large `|t|`.
pub fn log_sum_exp_zero(t: f64) -> f64 {
    t.max(0.0) + (-t.abs()).exp().ln_1p()
}

/// Bernoulli log-likelihood of a linear model: `sum_i y_i s_i - log(1 + exp(s_i))`
/// with `s = X theta`.
#[derive(Debug, Clone)]
pub struct LogLikelihood<'a> {
    x: ArrayView2<'a, f64>,
    y: ArrayView1<'a, f64>,
}

impl<'a> LogLikelihood<'a> {
    /// `y` holds 0/1 targets, one per row of `x`.
    pub fn new(x: ArrayView2<'a, f64>, y: ArrayView1<'a, f64>) -> Self {
        debug_assert_eq!(x.nrows(), y.len());
        Self { x, y }
    }

    pub fn design(&self) -> ArrayView2<'a, f64> {
        self.x
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn value(&self, theta: ArrayView1<'_, f64>) -> f64 {
        let scores = self.x.dot(&theta);
        Zip::from(&scores)
            .and(&self.y)
            .fold(0.0, |acc, &s, &y| acc + y * s - log_sum_exp_zero(s))
    }

    /// Gradient of [`LogLikelihood::value`]: `X' (y - sigmoid(X theta))`.
    pub fn gradient(&self, theta: ArrayView1<'_, f64>) -> Array1<f64> {
        let mut residual = self.x.dot(&theta);
        Zip::from(&mut residual)
            .and(&self.y)
            .for_each(|s, &y| *s = y - logistic(*s));
        self.x.t().dot(&residual)
    }

    /// Mean negative log-likelihood, the quantity the inner loop minimizes.
    pub(super) fn mean_loss(&self, theta: ArrayView1<'_, f64>) -> f64 {
        -self.value(theta) / self.n_samples() as f64
    }

    /// Mean negative log-likelihood and its gradient in one pass over `X`.
    pub(super) fn mean_loss_and_gradient(&self, theta: ArrayView1<'_, f64>) -> (f64, Array1<f64>) {
        let n = self.n_samples() as f64;
        let scores = self.x.dot(&theta);
        let mut loss = 0.0;
        let mut residual = Array1::zeros(scores.len());
        Zip::from(&mut residual)
            .and(&scores)
            .and(&self.y)
            .for_each(|r, &s, &y| {
                loss += log_sum_exp_zero(s) - y * s;
                *r = (logistic(s) - y) / n;
            });
        (loss / n, self.x.t().dot(&residual))
    }
}

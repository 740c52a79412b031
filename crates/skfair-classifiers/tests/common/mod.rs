#![allow(dead_code)]

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use skfair_classifiers::DesignMatrix;

/// Binary dataset whose first feature leaks the sensitive column `z`.
///
/// Columns: `x1`, `x2`, `z` (0/1). Labels are 0/1 with label noise, so the
/// classes are never linearly separable.
pub fn biased_binary(n: usize, seed: u64) -> (DesignMatrix, Vec<i32>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut values = Vec::with_capacity(n * 3);
    let mut y = Vec::with_capacity(n);
    for _ in 0..n {
        let z = if rng.gen::<f64>() < 0.5 { 1.0 } else { 0.0 };
        let x1 = rng.gen_range(-1.0..1.0) + 0.8 * z;
        let x2 = rng.gen_range(-1.0..1.0);
        let noise = rng.gen_range(-0.6..0.6);
        let label = i32::from(x1 + 0.5 * x2 + noise > 0.3);
        values.extend([x1, x2, z]);
        y.push(label);
    }
    let x = DesignMatrix::with_column_names(
        Array2::from_shape_vec((n, 3), values).unwrap(),
        vec!["x1".to_string(), "x2".to_string(), "z".to_string()],
    )
    .unwrap();
    (x, y)
}

/// Three well-spread classes along `x1`/`x2`, plus a sensitive column `z`.
pub fn three_classes(n_per_class: usize, seed: u64) -> (DesignMatrix, Vec<String>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let centres = [("a", -2.0, 0.0), ("b", 2.0, 0.0), ("c", 0.0, 2.5)];
    let mut values = Vec::new();
    let mut y = Vec::new();
    for (label, cx, cy) in centres {
        for _ in 0..n_per_class {
            let z = if rng.gen::<f64>() < 0.5 { 1.0 } else { 0.0 };
            values.extend([
                cx + rng.gen_range(-1.5..1.5),
                cy + rng.gen_range(-1.5..1.5),
                z,
            ]);
            y.push(label.to_string());
        }
    }
    let x = DesignMatrix::with_column_names(
        Array2::from_shape_vec((y.len(), 3), values).unwrap(),
        vec!["x1".to_string(), "x2".to_string(), "z".to_string()],
    )
    .unwrap();
    (x, y)
}

/// Empirical covariance `(1/n) sum_i s_i (z_i - mean(z))` over `rows`.
pub fn score_covariance(scores: &[f64], z: &[f64], rows: &[usize], denominator: f64) -> f64 {
    let mean = z.iter().sum::<f64>() / z.len() as f64;
    rows.iter()
        .map(|&i| scores[i] * (z[i] - mean))
        .sum::<f64>()
        / denominator
}

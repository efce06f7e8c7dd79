//! Local regression (LOWESS-style) smoothing.
//!
//! Each point is replaced by the value at that point of a weighted polynomial
//! fit over its `span` nearest neighbours, using tricube distance weights and,
//! optionally, bisquare robustness weights from previous residuals.

use crate::types::{GeoError, GeoResult};
use nalgebra::{DMatrix, DVector};

const SVD_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct LocalRegressionSmoother {
    degree: usize,
    span: usize,
    robust_iterations: usize,
}

impl LocalRegressionSmoother {
    /// Smoother with a polynomial of `degree` fitted over `span` neighbours
    pub fn new(degree: usize, span: usize, robust_iterations: usize) -> GeoResult<Self> {
        if span <= degree + 1 {
            return Err(GeoError::Processing(format!(
                "smoothing span {} too small for polynomial degree {}",
                span, degree
            )));
        }
        Ok(Self {
            degree,
            span,
            robust_iterations,
        })
    }

    pub fn smooth(&self, x: &[f64], y: &[f64]) -> GeoResult<Vec<f64>> {
        if x.len() != y.len() {
            return Err(GeoError::Processing(format!(
                "cannot smooth {} ordinates over {} abscissae",
                y.len(),
                x.len()
            )));
        }
        if x.len() < self.span {
            return Err(GeoError::Processing(format!(
                "{} samples are fewer than the smoothing span {}",
                x.len(),
                self.span
            )));
        }

        let mut robustness = vec![1.0; x.len()];
        let mut smoothed = self.smooth_pass(x, y, &robustness)?;

        for iteration in 0..self.robust_iterations {
            let residuals: Vec<f64> = y.iter().zip(&smoothed).map(|(a, b)| a - b).collect();
            let scale = 6.0 * median_abs(&residuals);
            if scale == 0.0 {
                log::debug!("Residuals vanished after {} robust iterations", iteration);
                break;
            }
            for (w, r) in robustness.iter_mut().zip(&residuals) {
                *w = bisquare(r / scale);
            }
            smoothed = self.smooth_pass(x, y, &robustness)?;
        }

        Ok(smoothed)
    }

    fn smooth_pass(&self, x: &[f64], y: &[f64], robustness: &[f64]) -> GeoResult<Vec<f64>> {
        (0..x.len())
            .map(|i| {
                let (lo, hi) = self.window(x, i);
                self.fit_at(x, y, robustness, i, lo, hi)
            })
            .collect()
    }

    /// Index range `[lo, hi)` of the `span` samples nearest to `x[i]`
    fn window(&self, x: &[f64], i: usize) -> (usize, usize) {
        let (mut lo, mut hi) = (i, i + 1);
        while hi - lo < self.span {
            if lo == 0 {
                hi += 1;
            } else if hi == x.len() {
                lo -= 1;
            } else if x[i] - x[lo - 1] <= x[hi] - x[i] {
                lo -= 1;
            } else {
                hi += 1;
            }
        }
        (lo, hi)
    }

    fn fit_at(
        &self,
        x: &[f64],
        y: &[f64],
        robustness: &[f64],
        i: usize,
        lo: usize,
        hi: usize,
    ) -> GeoResult<f64> {
        let max_distance = (lo..hi).map(|j| (x[j] - x[i]).abs()).fold(0.0, f64::max);
        let scale = if max_distance > 0.0 { max_distance } else { 1.0 };
        let terms = self.degree + 1;
        let rows = hi - lo;

        let mut design = DMatrix::<f64>::zeros(rows, terms);
        let mut weights = DVector::<f64>::zeros(rows);
        let mut values = DVector::<f64>::zeros(rows);
        for (row, j) in (lo..hi).enumerate() {
            let u = (x[j] - x[i]) / scale;
            weights[row] = tricube(if max_distance > 0.0 { u.abs() } else { 0.0 }) * robustness[j];
            values[row] = y[j];
            let mut power = 1.0;
            for k in 0..terms {
                design[(row, k)] = power;
                power *= u;
            }
        }

        if weights.iter().filter(|&&w| w > 0.0).count() < terms {
            // not enough support left for a fit, keep the observation
            return Ok(y[i]);
        }

        let weighted_design = DMatrix::from_fn(rows, terms, |r, c| design[(r, c)] * weights[r]);
        let normal = design.transpose() * &weighted_design;
        let rhs = weighted_design.transpose() * &values;

        let coefficients = match normal.clone().cholesky() {
            Some(cholesky) => cholesky.solve(&rhs),
            None => {
                log::debug!("Normal equations at sample {} not positive definite, using SVD", i);
                let root_weights = weights.map(f64::sqrt);
                let a = DMatrix::from_fn(rows, terms, |r, c| design[(r, c)] * root_weights[r]);
                let b = values.component_mul(&root_weights);
                a.svd(true, true)
                    .solve(&b, SVD_EPSILON)
                    .map_err(|e| GeoError::Processing(format!("local regression failed: {}", e)))?
            }
        };

        Ok(coefficients[0])
    }
}

fn tricube(u: f64) -> f64 {
    if u >= 1.0 {
        0.0
    } else {
        let t = 1.0 - u * u * u;
        t * t * t
    }
}

fn bisquare(u: f64) -> f64 {
    if u.abs() >= 1.0 {
        0.0
    } else {
        let t = 1.0 - u * u;
        t * t
    }
}

fn median_abs(values: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = values.iter().map(|v| v.abs()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n == 0 {
        0.0
    } else if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_linear_data_is_reproduced() {
        let x: Vec<f64> = (0..20).map(|i| i as f64 * 1.5).collect();
        let y: Vec<f64> = x.iter().map(|v| 0.25 * v + 3.0).collect();
        let smoother = LocalRegressionSmoother::new(1, 5, 0).unwrap();

        let smoothed = smoother.smooth(&x, &y).unwrap();
        for (s, v) in smoothed.iter().zip(&y) {
            assert_abs_diff_eq!(*s, *v, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_noise_is_reduced() {
        let x: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let noise = |i: usize| if i % 2 == 0 { 0.01 } else { -0.01 };
        let y: Vec<f64> = x.iter().enumerate().map(|(i, _)| 1.0 + noise(i)).collect();
        let smoother = LocalRegressionSmoother::new(1, 5, 0).unwrap();

        let smoothed = smoother.smooth(&x, &y).unwrap();
        for s in &smoothed[2..38] {
            assert!((s - 1.0).abs() < 0.01);
        }
    }

    #[test]
    fn test_robust_iterations_suppress_outlier() {
        let x: Vec<f64> = (0..15).map(|i| i as f64).collect();
        let mut y: Vec<f64> = (0..15).map(|i| if i % 2 == 0 { 2.001 } else { 1.999 }).collect();
        y[7] = 50.0;

        let plain = LocalRegressionSmoother::new(1, 7, 0).unwrap().smooth(&x, &y).unwrap();
        assert!((plain[6] - 2.0).abs() > 1.0);

        let robust = LocalRegressionSmoother::new(1, 7, 3).unwrap().smooth(&x, &y).unwrap();
        assert_abs_diff_eq!(robust[6], 2.0, epsilon = 0.01);
        assert_abs_diff_eq!(robust[8], 2.0, epsilon = 0.01);
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(LocalRegressionSmoother::new(2, 3, 0).is_err());
        let smoother = LocalRegressionSmoother::new(1, 5, 0).unwrap();
        assert!(smoother.smooth(&[0.0, 1.0], &[0.0, 1.0]).is_err());
        assert!(smoother.smooth(&[0.0, 1.0, 2.0], &[0.0, 1.0]).is_err());
    }
}
